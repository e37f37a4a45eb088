use tracing::debug;

use crate::clock::{BoxedTimeSource, SystemClock};
use crate::error::Result;
use crate::frame::{FrameDriver, TimeBinding};
use crate::marshal::{marshal, BindingSet};
use crate::overlay::Overlay;
use crate::program::{ProgramInputs, ProgramVariant};
use crate::types::{RenderConfig, Viewport};
use crate::uniforms::{self, DescriptorSet, UniformValue, ELAPSED_TIME};

/// One configured instance of the effect.
///
/// Owns its descriptor set, marshalled bindings, and clock. Hosts swap whole
/// handles when the configuration changes; nothing inside a handle is
/// reconfigured in place.
pub struct RenderSessionHandle {
    config: RenderConfig,
    descriptors: DescriptorSet,
    variant: ProgramVariant,
    overlay: Overlay,
    clock: BoxedTimeSource,
    time: TimeBinding,
    attachment: Option<Attachment>,
}

struct Attachment {
    viewport: Viewport,
    bindings: BindingSet,
}

impl std::fmt::Debug for RenderSessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSessionHandle")
            .field("variant", &self.variant)
            .field("overlay", &self.overlay)
            .field("viewport", &self.viewport())
            .field("elapsed_time", &self.time.get())
            .finish_non_exhaustive()
    }
}

/// Builds a session around the system monotonic clock.
pub fn configure(config: RenderConfig) -> Result<RenderSessionHandle> {
    configure_with_clock(config, Box::new(SystemClock::new()))
}

/// Builds a session driven by an explicit time source.
pub fn configure_with_clock(
    config: RenderConfig,
    clock: BoxedTimeSource,
) -> Result<RenderSessionHandle> {
    let descriptors = uniforms::build(&config)?;
    let variant = ProgramVariant::for_config(&config);
    let overlay = Overlay::for_config(&config);
    debug!(
        %variant,
        colors = config.colors.len(),
        cell_size = config.cell_size,
        dot_size = config.dot_size,
        animation_speed = config.animation_speed,
        "configured dot-matrix session"
    );
    Ok(RenderSessionHandle {
        config,
        descriptors,
        variant,
        overlay,
        clock,
        time: TimeBinding::new(0.0),
        attachment: None,
    })
}

/// Marshals the session for `viewport` and hands out its frame driver.
///
/// Re-attaching (for example after a resize) re-marshals the bindings; the
/// session clock keeps running.
pub fn attach_to_viewport(handle: &mut RenderSessionHandle, viewport: Viewport) -> FrameDriver {
    let bindings = marshal(&handle.descriptors, viewport);
    debug!(
        width = viewport.width,
        height = viewport.height,
        bindings = bindings.len(),
        "attached session to viewport"
    );
    handle.attachment = Some(Attachment { viewport, bindings });
    FrameDriver::new(handle.time.clone())
}

/// Releases the session. GPU-side resources tied to it are dropped by the
/// renderer that owns them before this call returns.
pub fn teardown(handle: RenderSessionHandle) {
    debug!(variant = %handle.variant, "tearing down dot-matrix session");
    drop(handle);
}

impl RenderSessionHandle {
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn descriptors(&self) -> &DescriptorSet {
        &self.descriptors
    }

    pub fn variant(&self) -> ProgramVariant {
        self.variant
    }

    pub fn overlay(&self) -> Overlay {
        self.overlay
    }

    /// Replaces the overlay layers composited by the embedding layer.
    pub fn set_overlay(&mut self, overlay: Overlay) {
        self.overlay = overlay;
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.attachment.as_ref().map(|attachment| attachment.viewport)
    }

    /// Seconds on the session clock.
    pub fn clock_seconds(&mut self) -> f32 {
        self.clock.seconds()
    }

    pub fn elapsed_time(&self) -> f32 {
        self.time.get()
    }

    /// Snapshot of the marshalled bindings with the current elapsed time.
    pub fn bindings(&self) -> Option<BindingSet> {
        let attachment = self.attachment.as_ref()?;
        let mut bindings = attachment.bindings.clone();
        bindings.set(ELAPSED_TIME, UniformValue::Float(self.time.get()));
        Some(bindings)
    }

    /// Program inputs for the current frame; `None` until attached.
    pub fn program_inputs(&self) -> Option<Result<ProgramInputs>> {
        self.bindings()
            .map(|bindings| ProgramInputs::from_bindings(&bindings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::DotMatrixError;
    use crate::types::ColorRgb;
    use crate::uniforms::{COLORS, RESOLUTION};

    #[test]
    fn identical_configs_produce_identical_bindings() {
        let config = RenderConfig::swap_backdrop();
        let viewport = Viewport::new(1280.0, 720.0);
        let mut first = configure(config.clone()).unwrap();
        let mut second = configure(config).unwrap();
        let driver = attach_to_viewport(&mut first, viewport);
        attach_to_viewport(&mut second, viewport);
        driver.on_frame(3.0);

        let a = first.bindings().unwrap();
        let b = second.bindings().unwrap();
        assert_eq!(a.without_time(), b.without_time());
        assert_ne!(a, b);
    }

    #[test]
    fn bindings_require_attachment() {
        let handle = configure(RenderConfig::default()).unwrap();
        assert!(handle.bindings().is_none());
        assert!(handle.program_inputs().is_none());
        assert_eq!(handle.viewport(), None);
    }

    #[test]
    fn frame_driver_updates_session_time() {
        let mut handle = configure(RenderConfig::default()).unwrap();
        let driver = attach_to_viewport(&mut handle, Viewport::new(800.0, 600.0));
        driver.on_frame(0.75);
        let bindings = handle.bindings().unwrap();
        assert_eq!(bindings.float(ELAPSED_TIME), Some(0.75));
        assert_eq!(bindings.resolution(), Some([1600.0, 1200.0]));
        assert_eq!(handle.elapsed_time(), 0.75);
    }

    #[test]
    fn reattaching_keeps_time_and_updates_resolution() {
        let mut handle =
            configure_with_clock(RenderConfig::default(), Box::new(FixedClock::new(4.0))).unwrap();
        let driver = attach_to_viewport(&mut handle, Viewport::new(100.0, 100.0));
        driver.on_frame(handle.clock_seconds());
        let driver = attach_to_viewport(&mut handle, Viewport::new(300.0, 200.0));
        assert_eq!(driver.elapsed_time(), 4.0);
        let bindings = handle.bindings().unwrap();
        assert_eq!(
            bindings.get(RESOLUTION),
            Some(&UniformValue::Vec2([600.0, 400.0]))
        );
    }

    #[test]
    fn sessions_do_not_share_clocks() {
        let mut a = configure(RenderConfig::default()).unwrap();
        let mut b = configure(RenderConfig::default()).unwrap();
        let driver_a = attach_to_viewport(&mut a, Viewport::new(10.0, 10.0));
        let _driver_b = attach_to_viewport(&mut b, Viewport::new(10.0, 10.0));
        driver_a.on_frame(9.0);
        assert_eq!(a.elapsed_time(), 9.0);
        assert_eq!(b.elapsed_time(), 0.0);
    }

    #[test]
    fn configure_rejects_bad_opacity_curve() {
        let config = RenderConfig {
            opacities: vec![1.0; 11],
            ..RenderConfig::default()
        };
        assert!(matches!(
            configure(config),
            Err(DotMatrixError::Configuration(_))
        ));
    }

    #[test]
    fn cyan_session_exposes_normalized_palette() {
        let config = RenderConfig {
            colors: vec![ColorRgb::new(0, 255, 255)],
            ..RenderConfig::default()
        };
        let mut handle = configure(config).unwrap();
        attach_to_viewport(&mut handle, Viewport::new(800.0, 600.0));
        let bindings = handle.bindings().unwrap();
        assert_eq!(
            bindings.get(COLORS),
            Some(&UniformValue::Vec3Array(vec![[0.0, 1.0, 1.0]; 6]))
        );
        let inputs = handle.program_inputs().unwrap().unwrap();
        assert_eq!(inputs.resolution, [1600.0, 1200.0]);
        teardown(handle);
    }
}
