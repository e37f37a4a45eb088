use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use dotmatrix::raster::{self, Frame};
use dotmatrix::{attach_to_viewport, configure_with_clock, teardown, FixedClock, Viewport};
use image::{ImageFormat, RgbaImage};
use tracing::info;

use crate::types::SessionRequest;

/// Renders one frame of `request` at `time` seconds on the CPU.
///
/// The frame has the session's device resolution, twice the viewport.
pub fn render_still(request: &SessionRequest, viewport: Viewport, time: f32) -> Result<Frame> {
    let clock = Box::new(FixedClock::new(time));
    let mut session = configure_with_clock(request.config.clone(), clock)
        .context("failed to configure still session")?;
    session.set_overlay(request.overlay);
    let driver = attach_to_viewport(&mut session, viewport);
    driver.on_frame(session.clock_seconds());
    let frame = raster::render_session(&session).context("failed to rasterize still frame")?;
    teardown(session);
    Ok(frame)
}

/// Writes `frame` to `path` as PNG, creating parent directories.
pub fn export_png(frame: &Frame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let image = RgbaImage::from_raw(frame.width, frame.height, frame.pixels.clone())
        .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", frame.width, frame.height))?;
    image
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(
        path = %path.display(),
        width = frame.width,
        height = frame.height,
        "still frame exported"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotmatrix::RenderConfig;

    #[test]
    fn still_has_device_resolution() {
        let frame = render_still(&SessionRequest::default(), Viewport::new(40.0, 30.0), 5.0)
            .expect("render still");
        assert_eq!((frame.width, frame.height), (80, 60));
    }

    #[test]
    fn still_is_deterministic() {
        let request = SessionRequest::new(RenderConfig::swap_backdrop());
        let viewport = Viewport::new(32.0, 24.0);
        let first = render_still(&request, viewport, 1.25).unwrap();
        let second = render_still(&request, viewport, 1.25).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn exports_png_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/still.png");
        let frame =
            render_still(&SessionRequest::default(), Viewport::new(20.0, 10.0), 3.0).unwrap();
        export_png(&frame, &path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (40, 20));
        assert_eq!(decoded.as_raw(), &frame.pixels);
    }

    #[test]
    fn rejects_mismatched_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let frame = Frame {
            width: 4,
            height: 4,
            pixels: vec![0; 8],
        };
        assert!(export_png(&frame, &dir.path().join("bad.png")).is_err());
    }
}
