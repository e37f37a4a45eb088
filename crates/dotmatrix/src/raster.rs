use crate::error::{DotMatrixError, Result};
use crate::overlay::Overlay;
use crate::program::{shade, ProgramInputs, ProgramVariant};
use crate::session::RenderSessionHandle;

/// Largest frame edge, in device pixels, the rasterizer accepts.
pub const MAX_FRAME_DIMENSION: u32 = 16_384;

/// Opaque RGBA8 image of the effect composited over black.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut out = [0; 4];
        out.copy_from_slice(&self.pixels[offset..offset + 4]);
        out
    }
}

/// Blends one program output onto the black clear.
///
/// The dot pass uses `src * src_alpha + dst` on an already premultiplied
/// color, so a dot of opacity `a` lands at `color * a * a`.
pub fn blend_dot(rgba: [f32; 4]) -> [f32; 4] {
    let [r, g, b, a] = rgba;
    [r * a, g * a, b * a, 1.0]
}

/// Evaluates the program for every pixel of a `width` × `height` image.
///
/// The image spans the whole `resolution` uniform; rendering at exactly the
/// device resolution gives one fragment per device pixel. Edges above
/// [`MAX_FRAME_DIMENSION`] are rejected.
pub fn rasterize(
    variant: ProgramVariant,
    overlay: Overlay,
    inputs: &ProgramInputs,
    width: u32,
    height: u32,
) -> Result<Frame> {
    let width = width.max(1);
    let height = height.max(1);
    if width > MAX_FRAME_DIMENSION || height > MAX_FRAME_DIMENSION {
        return Err(DotMatrixError::Configuration(format!(
            "frame {width}x{height} exceeds the {MAX_FRAME_DIMENSION} pixel limit"
        )));
    }
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| {
            DotMatrixError::Configuration(format!("frame {width}x{height} is too large"))
        })?;

    let scale_x = inputs.resolution[0] / width as f32;
    let scale_y = inputs.resolution[1] / height as f32;
    let mut pixels = Vec::with_capacity(len);
    for y in 0..height {
        for x in 0..width {
            let frag = [(x as f32 + 0.5) * scale_x, (y as f32 + 0.5) * scale_y];
            let fragment = shade(variant, inputs, frag);
            let blended = blend_dot(fragment.rgba);
            let [r, g, b, _] = overlay.composite(blended, frag, inputs.resolution);
            pixels.extend_from_slice(&[to_unorm(r), to_unorm(g), to_unorm(b), 255]);
        }
    }
    Ok(Frame {
        width,
        height,
        pixels,
    })
}

/// Renders the session's current frame at device resolution.
pub fn render_session(handle: &RenderSessionHandle) -> Result<Frame> {
    let inputs = handle
        .program_inputs()
        .ok_or_else(|| {
            DotMatrixError::Configuration("session is not attached to a viewport".to_string())
        })??;
    let [width, height] = inputs.resolution;
    rasterize(
        handle.variant(),
        handle.overlay(),
        &inputs,
        width.round() as u32,
        height.round() as u32,
    )
}

fn to_unorm(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::session::{attach_to_viewport, configure_with_clock};
    use crate::types::{RenderConfig, Viewport};
    use crate::uniforms::OPACITY_STEPS;

    fn session_at(config: RenderConfig, time: f32, viewport: Viewport) -> RenderSessionHandle {
        let mut handle = configure_with_clock(config, Box::new(FixedClock::new(time))).unwrap();
        let driver = attach_to_viewport(&mut handle, viewport);
        driver.on_frame(handle.clock_seconds());
        handle
    }

    #[test]
    fn renders_at_device_resolution() {
        let handle = session_at(RenderConfig::default(), 20.0, Viewport::new(40.0, 30.0));
        let frame = render_session(&handle).unwrap();
        assert_eq!((frame.width, frame.height), (80, 60));
        assert_eq!(frame.pixels.len(), 80 * 60 * 4);
        assert!(frame.pixels.chunks(4).all(|px| px[3] == 255));
    }

    #[test]
    fn revealed_frame_has_lit_dots_on_black() {
        let config = RenderConfig {
            show_gradient: false,
            ..RenderConfig::default()
        };
        let handle = session_at(config, 20.0, Viewport::new(80.0, 60.0));
        let frame = render_session(&handle).unwrap();
        let lit = frame
            .pixels
            .chunks(4)
            .filter(|px| px[1] > 0 || px[2] > 0)
            .count();
        assert!(lit > 0);
        assert!(lit < (frame.width * frame.height) as usize / 4);
        // Cyan dots never carry red.
        assert!(frame.pixels.chunks(4).all(|px| px[0] == 0));
    }

    #[test]
    fn start_of_reveal_is_dark() {
        let handle = session_at(
            RenderConfig::default().with_reverse(false),
            0.0,
            Viewport::new(80.0, 60.0),
        );
        let frame = render_session(&handle).unwrap();
        let lit = frame.pixels.chunks(4).filter(|px| px[1] > 0).count();
        // Only cells with a zero delay may show on the very first frame.
        assert!(lit <= 9 * 4);
    }

    #[test]
    fn bottom_fade_blackens_last_row() {
        let handle = session_at(RenderConfig::default(), 20.0, Viewport::new(80.0, 60.0));
        let frame = render_session(&handle).unwrap();
        for x in 0..frame.width {
            let [r, g, b, _] = frame.pixel(x, frame.height - 1);
            assert!(r <= 3 && g <= 3 && b <= 3);
        }
    }

    #[test]
    fn unattached_session_is_an_error() {
        let handle = configure_with_clock(RenderConfig::default(), Box::new(FixedClock::new(1.0)))
            .unwrap();
        assert!(matches!(
            render_session(&handle),
            Err(DotMatrixError::Configuration(_))
        ));
    }

    #[test]
    fn dot_blend_squares_the_opacity() {
        // Premultiplied 0.3 tier of a white dot.
        let out = blend_dot([0.3, 0.3, 0.3, 0.3]);
        for channel in &out[..3] {
            assert!((channel - 0.09).abs() < 1e-6);
        }
        assert_eq!(out[3], 1.0);
        assert_eq!(blend_dot([0.0; 4]), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn frame_pixels_follow_the_dot_blend() {
        let config = RenderConfig {
            show_gradient: false,
            opacities: vec![0.3; OPACITY_STEPS],
            ..RenderConfig::default()
        };
        let handle = session_at(config, 20.0, Viewport::new(40.0, 30.0));
        let inputs = handle.program_inputs().unwrap().unwrap();
        let frame = render_session(&handle).unwrap();

        let mut lit = 0;
        for y in 0..frame.height {
            for x in 0..frame.width {
                let frag = [x as f32 + 0.5, y as f32 + 0.5];
                let fragment = shade(handle.variant(), &inputs, frag);
                let expected = to_unorm(fragment.rgba[1] * fragment.rgba[3]);
                let [_, g, _, _] = frame.pixel(x, y);
                assert_eq!(g, expected);
                if fragment.opacity > 0.0 {
                    lit += 1;
                    // Settled 0.3 tier of cyan: 0.09, not 0.3.
                    assert!(g < to_unorm(0.3));
                }
            }
        }
        assert!(lit > 0);
    }

    #[test]
    fn oversized_viewport_is_rejected() {
        let handle = session_at(RenderConfig::default(), 1.0, Viewport::new(16_384.0, 16_384.0));
        assert!(matches!(
            render_session(&handle),
            Err(DotMatrixError::Configuration(_))
        ));
    }

    #[test]
    fn largest_edge_is_accepted_for_thin_frames() {
        let handle = session_at(RenderConfig::default(), 1.0, Viewport::new(8_192.0, 0.5));
        let frame = render_session(&handle).unwrap();
        assert_eq!((frame.width, frame.height), (MAX_FRAME_DIMENSION, 1));
    }
}
