use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use dotmatrix::{FrameScheduler, Viewport};
use tracing::{error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy};
use winit::window::{Window, WindowBuilder};

use crate::gpu::GpuState;
use crate::types::{RendererConfig, SessionRequest};

const SOFTWARE_FPS_CAP: f32 = 15.0;

/// Aggregates GPU state for the preview window.
pub(crate) struct WindowState {
    gpu: GpuState,
    window: Arc<Window>,
}

impl WindowState {
    pub(crate) fn new(window: Arc<Window>, request: &SessionRequest) -> Result<Self> {
        let size = window.inner_size();
        let viewport = viewport_for(&window, size);
        let gpu = GpuState::new(window.clone(), size, request, viewport)?;
        Ok(Self { gpu, window })
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.gpu.size()
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let viewport = viewport_for(&self.window, new_size);
        self.gpu.resize(new_size, viewport);
    }

    pub(crate) fn reconfigure(&mut self, request: &SessionRequest) -> Result<()> {
        let viewport = viewport_for(&self.window, self.size());
        self.gpu.set_session(request, viewport)
    }

    pub(crate) fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.gpu.render()
    }
}

/// Viewport in logical pixels; the session doubles it for the device
/// resolution.
fn viewport_for(window: &Window, size: PhysicalSize<u32>) -> Viewport {
    let logical = size.to_logical::<f64>(window.scale_factor());
    Viewport::new(logical.width as f32, logical.height as f32)
}

#[derive(Debug, Clone)]
enum WindowCommand {
    Reconfigure { request: SessionRequest },
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowSignal {
    Closed,
}

/// Preview window running its event loop on a dedicated thread.
pub struct WindowRuntime {
    proxy: EventLoopProxy<WindowCommand>,
    events: Receiver<WindowSignal>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl WindowRuntime {
    pub fn spawn(config: RendererConfig) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded(1);
        let (signal_tx, signal_rx) = unbounded();
        let handle = thread::Builder::new()
            .name("revealfx-window".into())
            .spawn(move || run_window_thread(config, ready_tx, signal_tx))
            .map_err(|err| anyhow!("failed to spawn window thread: {err}"))?;

        let proxy = ready_rx
            .recv()
            .map_err(|err| anyhow!("window thread failed to initialise: {err}"))??;

        Ok(Self {
            proxy,
            events: signal_rx,
            join_handle: Some(handle),
        })
    }

    /// Queues a session swap; it takes effect between two frames.
    pub fn reconfigure(&self, request: SessionRequest) -> Result<()> {
        self.proxy
            .send_event(WindowCommand::Reconfigure { request })
            .map_err(|_| anyhow!("window event loop has already exited"))
    }

    /// Blocks for up to `timeout`; returns `true` once the window has closed.
    pub fn wait_closed(&self, timeout: Duration) -> bool {
        match self.events.recv_timeout(timeout) {
            Ok(WindowSignal::Closed) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }

    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            handle
                .join()
                .map_err(|err| anyhow!("window thread panicked: {err:?}"))??;
        }
        Ok(())
    }
}

impl Drop for WindowRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

/// Opens the preview window on the calling thread and blocks until it closes.
pub(crate) fn run(config: &RendererConfig) -> Result<()> {
    let event_loop = EventLoopBuilder::<WindowCommand>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let state = create_state(&event_loop, config)?;
    drive(event_loop, state, config.target_fps, None)
}

fn run_window_thread(
    config: RendererConfig,
    ready_tx: Sender<Result<EventLoopProxy<WindowCommand>>>,
    signal_tx: Sender<WindowSignal>,
) -> Result<()> {
    let mut builder = EventLoopBuilder::<WindowCommand>::with_user_event();
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }
    #[cfg(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    }

    let event_loop = match builder.build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            let message = format!("failed to create event loop: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };
    let state = match create_state(&event_loop, &config) {
        Ok(state) => state,
        Err(err) => {
            let message = format!("failed to initialise window renderer: {err:#}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };

    let _ = ready_tx.send(Ok(event_loop.create_proxy()));
    let result = drive(event_loop, state, config.target_fps, Some(signal_tx.clone()));
    let _ = signal_tx.send(WindowSignal::Closed);
    result
}

fn create_state(
    event_loop: &EventLoop<WindowCommand>,
    config: &RendererConfig,
) -> Result<WindowState> {
    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size)
        .with_visible(config.show_window)
        .build(event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    WindowState::new(Arc::new(window), &config.session)
}

fn drive(
    event_loop: EventLoop<WindowCommand>,
    mut state: WindowState,
    target_fps: Option<f32>,
    signal_tx: Option<Sender<WindowSignal>>,
) -> Result<()> {
    let profile = state.gpu.adapter_profile().clone();
    let mut effective_fps = target_fps;
    if profile.is_software() && target_fps.is_none() {
        effective_fps = Some(SOFTWARE_FPS_CAP);
        warn!(
            adapter = %profile.name,
            backend = ?profile.backend,
            cap = SOFTWARE_FPS_CAP,
            "software rasterizer detected; capping preview to {} FPS (override with --fps)",
            SOFTWARE_FPS_CAP
        );
    }
    let mut scheduler = FrameScheduler::new(effective_fps);
    info!(
        fps_cap = ?scheduler.interval().map(|interval| 1.0 / interval.as_secs_f32()),
        "preview window ready"
    );
    state.window().request_redraw();

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::UserEvent(command) => match command {
            WindowCommand::Reconfigure { request } => {
                if let Err(err) = state.reconfigure(&request) {
                    error!("failed to swap dot-matrix session: {err:?}");
                } else {
                    scheduler.reset();
                    state.window().request_redraw();
                }
            }
            WindowCommand::Shutdown => elwt.exit(),
        },
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    if let Some(signal_tx) = signal_tx.as_ref() {
                        let _ = signal_tx.send(WindowSignal::Closed);
                    }
                    elwt.exit();
                }
                WindowEvent::Resized(new_size) => state.resize(new_size),
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = state.window().inner_size();
                    state.resize(size);
                }
                WindowEvent::RedrawRequested => match state.render_frame() {
                    Ok(()) => scheduler.mark_rendered(),
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        state.gpu.reconfigure_surface();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        error!("surface out of memory; closing preview");
                        elwt.exit();
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        warn!("surface timeout; dropping frame");
                    }
                    Err(other) => {
                        warn!("surface error: {other:?}; dropping frame");
                    }
                },
                _ => {}
            }
        }
        Event::AboutToWait => {
            let now = Instant::now();
            if scheduler.ready_for_frame(now) {
                tracing::trace!("scheduler: issuing redraw now");
                state.window().request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = scheduler.next_deadline() {
                let ms = deadline.saturating_duration_since(now).as_millis();
                tracing::trace!(deadline_ms = ms, "scheduler: waiting until next frame");
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
