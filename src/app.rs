use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{DeviceEvent, DeviceId, ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    config::ViewerConfig,
    context::ViewerContext,
    gfx::rendering::RenderEngine,
    loader::{AssetFetcher, FileFetcher},
    render_loop::{FrameScheduler, RenderLoop},
    viewport::ViewportState,
};

/// Schedules frames through winit redraw requests
pub struct WindowScheduler {
    window: Arc<Window>,
}

impl FrameScheduler for WindowScheduler {
    fn request_frame(&mut self) {
        self.window.request_redraw();
    }
}

/// Windowed viewer application
pub struct VistaApp {
    config: ViewerConfig,
    fetcher: Arc<dyn AssetFetcher>,
}

struct AppState {
    config: ViewerConfig,
    fetcher: Arc<dyn AssetFetcher>,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    context: Option<ViewerContext>,
    render_loop: Option<RenderLoop<WindowScheduler>>,
    error: Option<anyhow::Error>,
}

impl VistaApp {
    /// Creates a viewer that reads assets from `config.asset_root`
    pub fn new(config: ViewerConfig) -> Self {
        let fetcher = Arc::new(FileFetcher::new(config.asset_root.clone()));
        Self { config, fetcher }
    }

    /// Run the application until the window is closed
    pub fn run(self) -> anyhow::Result<()> {
        let event_loop = EventLoop::new()?;
        // Frames are driven by redraw requests from the render loop
        event_loop.set_control_flow(ControlFlow::Wait);

        let mut state = AppState {
            config: self.config,
            fetcher: self.fetcher,
            window: None,
            render_engine: None,
            context: None,
            render_loop: None,
            error: None,
        };
        event_loop.run_app(&mut state)?;

        match state.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        // Minimised windows report a zero size
        if size.width == 0 || size.height == 0 {
            return;
        }
        let (Some(window), Some(render_engine), Some(context)) = (
            self.window.as_ref(),
            self.render_engine.as_mut(),
            self.context.as_mut(),
        ) else {
            return;
        };

        if context.resize_physical(render_engine, size.width, size.height, window.scale_factor()) {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.config.initial_size;
        let window = match event_loop.create_window(
            WindowAttributes::default()
                .with_title(self.config.title.clone())
                .with_inner_size(LogicalSize::new(width, height)),
        ) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        let size = window.inner_size();
        let viewport =
            ViewportState::from_physical(size.width.max(1), size.height.max(1), window.scale_factor());

        let window_clone = window.clone();
        let mut render_engine = match pollster::block_on(async move {
            RenderEngine::new(window_clone, &viewport).await
        }) {
            Ok(engine) => engine,
            Err(e) => return self.fail(event_loop, e.context("failed to initialise renderer")),
        };

        let context = ViewerContext::bootstrap(
            &self.config,
            self.fetcher.clone(),
            &mut render_engine,
            viewport,
        );

        let mut render_loop = RenderLoop::new(WindowScheduler {
            window: window.clone(),
        });
        render_loop.start();

        self.window = Some(window);
        self.render_engine = Some(render_engine);
        self.context = Some(context);
        self.render_loop = Some(render_loop);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                    && event.state == ElementState::Pressed
                {
                    event_loop.exit();
                    return;
                }
                if let Some(context) = self.context.as_mut() {
                    context.controls.process_key_event(&event);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(context) = self.context.as_mut() {
                    context.controls.process_mouse_button(button, state);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(context) = self.context.as_mut() {
                    context.controls.process_mouse_wheel(&delta);
                }
            }
            WindowEvent::Resized(size) => self.resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    self.resize(size);
                }
            }
            WindowEvent::RedrawRequested => {
                let (Some(render_engine), Some(context), Some(render_loop)) = (
                    self.render_engine.as_mut(),
                    self.context.as_mut(),
                    self.render_loop.as_mut(),
                ) else {
                    return;
                };
                if let Err(e) = render_loop.step(context, render_engine) {
                    self.fail(event_loop, e.context("frame failed"));
                }
            }
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let Some(context) = self.context.as_mut() {
            context.controls.process_device_event(&event);
        }
    }
}
