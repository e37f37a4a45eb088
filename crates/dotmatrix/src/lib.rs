//! Dot-matrix reveal effect: configuration model, uniform marshalling, and the
//! procedural shading program.
//!
//! ```text
//!   RenderConfig ─▶ palette::expand ─▶ uniforms::build ─▶ marshal(viewport)
//!                                                            │ BindingSet
//!   host loop ─▶ FrameDriver::on_frame(t) ─▶ elapsed_time ───┤
//!                                                            ▼
//!                              GPU program variant  /  raster::rasterize (CPU)
//! ```
//!
//! A [`RenderSessionHandle`] owns everything derived from one configuration.
//! The GPU side lives in the `renderer` crate; this crate carries no graphics
//! API dependency so the model and the CPU reference evaluator can be tested
//! headless.

pub mod clock;
pub mod error;
pub mod frame;
pub mod marshal;
pub mod overlay;
pub mod palette;
pub mod program;
pub mod raster;
pub mod session;
pub mod types;
pub mod uniforms;

pub use clock::{BoxedTimeSource, FixedClock, SystemClock, TimeSource};
pub use error::{DotMatrixError, Result};
pub use frame::{FrameDriver, FrameScheduler, TimeBinding};
pub use marshal::{marshal, BindingSet, UniformBinding};
pub use overlay::Overlay;
pub use palette::{expand, PaletteTable};
pub use program::{ProgramInputs, ProgramVariant};
pub use raster::Frame;
pub use session::{
    attach_to_viewport, configure, configure_with_clock, teardown, RenderSessionHandle,
};
pub use types::{CenterAxes, ColorRgb, RenderConfig, Viewport, DEFAULT_OPACITIES};
pub use uniforms::{DescriptorSet, UniformDescriptor, UniformKind, UniformValue};
