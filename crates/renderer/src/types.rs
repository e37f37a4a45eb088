use dotmatrix::{Overlay, RenderConfig};

/// Effect configuration plus the overlay layers composited above it.
///
/// This is the unit the window swaps: every request becomes a fresh
/// dot-matrix session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub config: RenderConfig,
    pub overlay: Overlay,
}

impl SessionRequest {
    /// Request with the overlay implied by `config.show_gradient`.
    pub fn new(config: RenderConfig) -> Self {
        let overlay = Overlay::for_config(&config);
        Self { config, overlay }
    }

    pub fn with_overlay(mut self, overlay: Overlay) -> Self {
        self.overlay = overlay;
        self
    }

    /// Same look, opposite animation direction.
    pub fn reversed(&self) -> Self {
        Self {
            config: self.config.clone().with_reverse(!self.config.reverse),
            overlay: self.overlay,
        }
    }
}

impl Default for SessionRequest {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Optional FPS cap; `None` renders every display callback.
    pub target_fps: Option<f32>,
    /// Session shown when the window opens.
    pub session: SessionRequest,
    pub title: String,
    pub show_window: bool,
}

impl Default for RendererConfig {
    /// A 1280x720 window showing the default reveal.
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            target_fps: None,
            session: SessionRequest::default(),
            title: "revealfx".to_string(),
            show_window: true,
        }
    }
}
