//! Per-frame control loop
//!
//! Each [`RenderLoop::step`] draws one frame and asks its [`FrameScheduler`]
//! for the next one. The window host schedules through winit redraw requests;
//! tests step by hand with a [`ManualScheduler`].

use crate::{context::ViewerContext, gfx::rendering::Renderer};

/// Requests that another frame be stepped
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

/// Counts frame requests instead of acting on them
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    requested: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame requests not yet taken
    pub fn pending(&self) -> usize {
        self.requested
    }

    /// Consumes one pending request, if any
    pub fn take(&mut self) -> bool {
        if self.requested == 0 {
            return false;
        }
        self.requested -= 1;
        true
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) {
        self.requested += 1;
    }
}

pub struct RenderLoop<S: FrameScheduler> {
    scheduler: S,
    frame: u64,
}

impl<S: FrameScheduler> RenderLoop<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            frame: 0,
        }
    }

    /// Requests the first frame
    pub fn start(&mut self) {
        self.scheduler.request_frame();
    }

    /// Runs one frame: apply loader progress, schedule the next frame, update
    /// the controls, aim the camera at the scene and draw.
    ///
    /// Renderer errors are returned as-is; nothing else in a step can fail.
    pub fn step(
        &mut self,
        context: &mut ViewerContext,
        renderer: &mut dyn Renderer,
    ) -> anyhow::Result<()> {
        context.pump_loads();
        self.scheduler.request_frame();

        context.controls.update(&mut context.camera);
        context.scene.sync_camera(context.camera.position());
        context.camera.look_at(context.scene.position());
        context.camera.update_view_proj();

        renderer.draw(&context.scene, &context.camera)?;
        self.frame += 1;
        Ok(())
    }

    /// Frames drawn so far
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ViewerConfig,
        gfx::{
            camera::{CameraRig, ControlInput, PointerButton},
            rendering::HeadlessRenderer,
            scene::SceneGraph,
        },
        loader::{LoadState, MemoryFetcher},
        viewport::ViewportState,
    };
    use cgmath::{MetricSpace, Point3};
    use std::sync::Arc;

    const TRI_MTL: &str = "newmtl grey\nKd 0.5 0.5 0.5\n";
    const TRI_OBJ: &str = "mtllib tri.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl grey\nf 1 2 3\n";

    fn setup(config: ViewerConfig) -> (ViewerContext, HeadlessRenderer) {
        let fetcher = MemoryFetcher::new()
            .with_asset("model/tri/tri.mtl", TRI_MTL)
            .with_asset("model/tri/tri.obj", TRI_OBJ);
        let mut renderer = HeadlessRenderer::new();
        let context = ViewerContext::bootstrap(
            &config,
            Arc::new(fetcher),
            &mut renderer,
            ViewportState::new(800, 600, 1.0),
        );
        (context, renderer)
    }

    #[test]
    fn each_step_draws_once_and_schedules_the_next() {
        let (mut context, mut renderer) = setup(ViewerConfig::outdoor());
        let mut render_loop = RenderLoop::new(ManualScheduler::new());
        render_loop.start();

        for _ in 0..3 {
            assert!(render_loop.scheduler_mut().take());
            render_loop.step(&mut context, &mut renderer).unwrap();
        }

        assert_eq!(render_loop.frame_count(), 3);
        assert_eq!(renderer.frames().len(), 3);
        assert_eq!(render_loop.scheduler().pending(), 1);
    }

    #[test]
    fn camera_is_aimed_at_scene_origin() {
        let (mut context, mut renderer) = setup(ViewerConfig::outdoor());
        let mut render_loop = RenderLoop::new(ManualScheduler::new());
        render_loop.step(&mut context, &mut renderer).unwrap();

        let frame = renderer.last_frame().unwrap();
        assert_eq!(frame.camera_target, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(frame.camera_position, Point3::new(0.0, 2.0, 7.0));
        assert!((frame.camera_aspect - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn steps_without_input_keep_camera_still() {
        let (mut context, mut renderer) = setup(ViewerConfig::outdoor());
        let mut render_loop = RenderLoop::new(ManualScheduler::new());

        context
            .controls
            .handle_input(ControlInput::PointerDown(PointerButton::Primary));
        context
            .controls
            .handle_input(ControlInput::PointerMove { dx: 40.0, dy: 0.0 });
        context
            .controls
            .handle_input(ControlInput::PointerUp(PointerButton::Primary));

        // let the damped rotation run out
        for _ in 0..500 {
            render_loop.step(&mut context, &mut renderer).unwrap();
        }
        let settled = context.camera.position();
        render_loop.step(&mut context, &mut renderer).unwrap();
        render_loop.step(&mut context, &mut renderer).unwrap();

        assert_eq!(context.camera.position(), settled);
        assert!(context.controls.is_at_rest());
        // orbiting keeps the distance to the target
        let start = Point3::new(0.0, 2.0, 7.0);
        let origin = Point3::new(0.0, 0.0, 0.0);
        assert!((settled.distance(origin) - start.distance(origin)).abs() < 1e-3);
    }

    #[test]
    fn loaded_model_is_drawn_on_the_next_step() {
        let (mut context, mut renderer) = setup(ViewerConfig::studio().with_model("tri"));
        let mut render_loop = RenderLoop::new(ManualScheduler::new());

        context.finish_loads();
        render_loop.step(&mut context, &mut renderer).unwrap();

        assert_eq!(context.loads()[0].state(), LoadState::Attached);
        assert_eq!(renderer.last_frame().unwrap().model_count, 1);
    }

    #[test]
    fn failed_load_does_not_stop_the_loop() {
        let (mut context, mut renderer) = setup(ViewerConfig::outdoor().with_model("absent"));
        let mut render_loop = RenderLoop::new(ManualScheduler::new());

        context.finish_loads();
        render_loop.step(&mut context, &mut renderer).unwrap();
        render_loop.step(&mut context, &mut renderer).unwrap();

        assert_eq!(context.loads()[0].state(), LoadState::Failed);
        assert_eq!(renderer.frames().len(), 2);
        assert_eq!(renderer.last_frame().unwrap().model_count, 0);
    }

    struct BrokenRenderer;

    impl Renderer for BrokenRenderer {
        fn set_surface_size(&mut self, _viewport: &ViewportState) {}

        fn surface_size(&self) -> (u32, u32) {
            (1, 1)
        }

        fn draw(&mut self, _scene: &SceneGraph, _camera: &CameraRig) -> anyhow::Result<()> {
            anyhow::bail!("device lost")
        }
    }

    #[test]
    fn renderer_errors_propagate() {
        let (mut context, _) = setup(ViewerConfig::outdoor());
        let mut render_loop = RenderLoop::new(ManualScheduler::new());

        let err = render_loop
            .step(&mut context, &mut BrokenRenderer)
            .unwrap_err();
        assert_eq!(err.to_string(), "device lost");
        assert_eq!(render_loop.frame_count(), 0);
    }
}
