use std::time::Duration;

use anyhow::{bail, Context, Result};
use dotmatrix::Viewport;
use renderer::{export_png, render_still, Renderer, RendererConfig, WindowRuntime};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::bindings::{self, DEFAULT_STILL_SIZE};
use crate::cli::{PresetArgs, StillArgs, WindowArgs};

pub fn run_window(args: WindowArgs) -> Result<()> {
    let preset = bindings::resolve_preset(&args.effect)?;
    if let Some(fps) = args.fps {
        if fps.is_nan() || fps < 0.0 {
            bail!("--fps must be zero or positive, got {fps}");
        }
    }
    let config = bindings::renderer_config(&preset, args.fps);

    match args.alternate.or(preset.window.alternate) {
        Some(period) => run_alternating(config, period),
        None => {
            let mut renderer = Renderer::new(config);
            renderer.run()
        }
    }
}

/// Flips the preview between reveal and collapse every `period` until the
/// window closes.
fn run_alternating(config: RendererConfig, period: Duration) -> Result<()> {
    let mut request = config.session.clone();
    let runtime = WindowRuntime::spawn(config)?;
    info!(period_ms = period.as_millis() as u64, "alternating reveal and collapse");

    while !runtime.wait_closed(period) {
        request = request.reversed();
        debug!(reverse = request.config.reverse, "swapping session");
        if let Err(err) = runtime.reconfigure(request.clone()) {
            debug!("window stopped accepting sessions: {err:#}");
            break;
        }
    }

    runtime.shutdown()
}

pub fn run_still(args: StillArgs) -> Result<()> {
    let preset = bindings::resolve_preset(&args.effect)?;
    let request = bindings::session_request(&preset);
    let (width, height) = preset.window.size.unwrap_or(DEFAULT_STILL_SIZE);
    let viewport = Viewport::new(width as f32, height as f32);

    let frame = render_still(&request, viewport, args.time)?;
    export_png(&frame, &args.out)?;
    println!("{}", args.out.display());
    Ok(())
}

pub fn print_preset(args: PresetArgs) -> Result<()> {
    let preset = bindings::resolve_preset(&args.effect)?;
    let rendered = preset
        .to_toml_string()
        .context("failed to serialise preset")?;
    print!("{rendered}");
    Ok(())
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
