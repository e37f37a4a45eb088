//! GPU host for the dot-matrix reveal effect.
//!
//! ```text
//!   revealfx CLI
//!        │ RendererConfig / SessionRequest
//!        ▼
//!   Renderer::run ─▶ WindowState ─▶ winit event loop ─▶ GpuState::render()
//!   WindowRuntime ───────┘   ▲                               │
//!        │ reconfigure()     │ FrameScheduler                └─▶ write_buffer(UBO)
//!        └─────────────────────────────────────────────────────▶ set_session()
//!
//!   render_still ─▶ dotmatrix::raster ─▶ export_png
//! ```
//!
//! `GpuState` owns the surface, device, compiled pipelines, and the active
//! dot-matrix session. Reconfiguration builds a new session and swaps it in
//! between frames. Stills bypass the GPU and use the CPU evaluator so they are
//! reproducible without an adapter.

mod compile;
mod export;
mod gpu;
mod types;
mod window;

use anyhow::Result;

pub use export::{export_png, render_still};
pub use types::{RendererConfig, SessionRequest};
pub use window::WindowRuntime;

/// Thin entry point opening the preview window on the calling thread.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Blocks until the window closes.
    ///
    /// Fails when no display server, adapter, or surface is available, or
    /// when the initial program variant does not compile.
    pub fn run(&mut self) -> Result<()> {
        tracing::info!(
            width = self.config.surface_size.0,
            height = self.config.surface_size.1,
            variant = %dotmatrix::ProgramVariant::for_config(&self.config.session.config),
            "opening preview window"
        );
        window::run(&self.config)
    }
}
