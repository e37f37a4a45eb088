use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use dotmatrix::{
    attach_to_viewport, configure, teardown, FrameDriver, Overlay, ProgramVariant,
    RenderSessionHandle, Viewport,
};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::types::SessionRequest;

use super::context::{AdapterProfile, GpuContext};
use super::pipeline::{create_overlay_pipeline, create_program_pipeline, PipelineLayouts};
use super::uniforms::DotMatrixUniforms;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum PipelineKey {
    Program(ProgramVariant),
    Overlay(Overlay),
}

struct ShaderPipeline {
    pipeline: wgpu::RenderPipeline,
    key: PipelineKey,
}

#[derive(Clone)]
struct PipelineHandle(Arc<ShaderPipeline>);

impl PipelineHandle {
    fn new(key: PipelineKey, pipeline: wgpu::RenderPipeline) -> Self {
        Self(Arc::new(ShaderPipeline { pipeline, key }))
    }

    fn key(&self) -> PipelineKey {
        self.0.key
    }
}

impl Deref for PipelineHandle {
    type Target = wgpu::RenderPipeline;

    fn deref(&self) -> &Self::Target {
        &self.0.pipeline
    }
}

/// Compiled pipelines keyed by variant; sessions swap without recompiling.
#[derive(Default)]
struct PipelineCache {
    entries: HashMap<PipelineKey, PipelineHandle>,
}

impl PipelineCache {
    fn get(&self, key: &PipelineKey) -> Option<PipelineHandle> {
        self.entries.get(key).cloned()
    }

    fn store(&mut self, handle: PipelineHandle) {
        self.entries.insert(handle.key(), handle);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// The session currently on screen, with the pipelines it draws with.
struct ActiveSession {
    session: RenderSessionHandle,
    driver: FrameDriver,
    program: PipelineHandle,
    overlay: Option<PipelineHandle>,
}

impl ActiveSession {
    fn teardown(self) {
        let Self {
            session,
            driver,
            program,
            overlay,
        } = self;
        drop((driver, program, overlay));
        teardown(session);
    }
}

pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    pipeline_cache: PipelineCache,
    active: Option<ActiveSession>,
    last_stats_update: Instant,
    frames_since_stats: u32,
}

impl GpuState {
    pub(crate) fn new(
        window: Arc<Window>,
        initial_size: PhysicalSize<u32>,
        request: &SessionRequest,
        viewport: Viewport,
    ) -> Result<Self> {
        let context = GpuContext::new(window, initial_size)?;
        let layouts = PipelineLayouts::new(&context.device)?;

        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("dotmatrix uniform buffer"),
            size: DotMatrixUniforms::size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("dotmatrix uniform bind group"),
                layout: &layouts.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        let mut state = Self {
            context,
            layouts,
            uniform_buffer,
            uniform_bind_group,
            pipeline_cache: PipelineCache::default(),
            active: None,
            last_stats_update: Instant::now(),
            frames_since_stats: 0,
        };
        state.set_session(request, viewport)?;
        Ok(state)
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    /// Builds a session for `request` and makes it the active one.
    ///
    /// The previous session keeps rendering if anything fails; on success it
    /// is torn down after the swap.
    pub(crate) fn set_session(
        &mut self,
        request: &SessionRequest,
        viewport: Viewport,
    ) -> Result<()> {
        let mut session = configure(request.config.clone())?;
        session.set_overlay(request.overlay);
        let program = self.program_pipeline(session.variant())?;
        let overlay = self.overlay_pipeline(session.overlay())?;
        let driver = attach_to_viewport(&mut session, viewport);
        debug!(
            variant = %session.variant(),
            overlay = ?session.overlay(),
            cached_pipelines = self.pipeline_cache.len(),
            "activating dot-matrix session"
        );

        let next = ActiveSession {
            session,
            driver,
            program,
            overlay,
        };
        if let Some(previous) = self.active.replace(next) {
            previous.teardown();
        }
        Ok(())
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>, viewport: Viewport) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        if let Some(active) = self.active.as_mut() {
            active.driver = attach_to_viewport(&mut active.session, viewport);
        }
    }

    pub(crate) fn reconfigure_surface(&mut self) {
        self.context.reconfigure();
    }

    pub(crate) fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        self.update_uniforms();

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("dotmatrix encoder"),
                });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("dotmatrix pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if let Some(active) = self.active.as_ref() {
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_pipeline(&active.program);
                render_pass.draw(0..3, 0..1);
                if let Some(overlay) = active.overlay.as_ref() {
                    render_pass.set_pipeline(overlay);
                    render_pass.draw(0..3, 0..1);
                }
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.record_stats();
        Ok(())
    }

    fn update_uniforms(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let seconds = active.session.clock_seconds();
        active.driver.on_frame(seconds);
        match active.session.program_inputs() {
            Some(Ok(inputs)) => {
                let uniforms = DotMatrixUniforms::from_inputs(&inputs);
                self.context
                    .queue
                    .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
            }
            Some(Err(err)) => warn!(error = %err, "dropping uniform update"),
            None => warn!("active session is not attached to a viewport"),
        }
    }

    fn record_stats(&mut self) {
        self.frames_since_stats += 1;
        let elapsed = self.last_stats_update.elapsed();
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames_since_stats as f32 / elapsed.as_secs_f32();
            debug!(
                fps = fps.round(),
                elapsed_time = self
                    .active
                    .as_ref()
                    .map(|active| active.driver.elapsed_time()),
                "render stats"
            );
            self.frames_since_stats = 0;
            self.last_stats_update = Instant::now();
        }
    }

    fn program_pipeline(&mut self, variant: ProgramVariant) -> Result<PipelineHandle> {
        let key = PipelineKey::Program(variant);
        if let Some(handle) = self.pipeline_cache.get(&key) {
            return Ok(handle);
        }
        let pipeline = create_program_pipeline(
            &self.context.device,
            &self.layouts,
            self.context.surface_format,
            variant,
        )?;
        debug!(%variant, "compiled program variant");
        let handle = PipelineHandle::new(key, pipeline);
        self.pipeline_cache.store(handle.clone());
        Ok(handle)
    }

    fn overlay_pipeline(&mut self, layers: Overlay) -> Result<Option<PipelineHandle>> {
        if layers.is_empty() {
            return Ok(None);
        }
        let key = PipelineKey::Overlay(layers);
        if let Some(handle) = self.pipeline_cache.get(&key) {
            return Ok(Some(handle));
        }
        let pipeline = create_overlay_pipeline(
            &self.context.device,
            &self.layouts,
            self.context.surface_format,
            layers,
        )?;
        debug!(?layers, "compiled overlay program");
        let handle = PipelineHandle::new(key, pipeline);
        self.pipeline_cache.store(handle.clone());
        Ok(Some(handle))
    }
}

impl Drop for GpuState {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.teardown();
        }
    }
}
