//! GPU side of the renderer.
//!
//! - `context` owns the wgpu instance, device, and surface and reconfigures
//!   the swapchain on resize.
//! - `pipeline` turns program variants and overlays into render pipelines
//!   sharing one uniform bind group layout.
//! - `uniforms` mirrors the std140 parameter block.
//! - `state` holds the active session, uploads its uniforms every frame, and
//!   swaps sessions on reconfiguration.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
