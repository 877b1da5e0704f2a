//! Viewer state and the startup sequence
//!
//! A [`ViewerContext`] owns the single camera rig and scene graph of a viewer
//! together with everything that mutates them. It is handed explicitly to the
//! render loop and the event handlers.

use std::sync::Arc;

use crate::{
    config::ViewerConfig,
    gfx::{
        camera::{CameraRig, TrackballControls},
        lighting::{LightingProfile, LightingSetup},
        rendering::Renderer,
        scene::SceneGraph,
        sky::SkySetup,
    },
    loader::{AssetFetcher, LoadHandle, LoadRequest, ModelLoader},
    viewport::ViewportState,
};

pub struct ViewerContext {
    pub viewport: ViewportState,
    pub camera: CameraRig,
    pub scene: SceneGraph,
    pub controls: TrackballControls,
    lighting: LightingProfile,
    fetcher: Arc<dyn AssetFetcher>,
    loads: Vec<LoadHandle>,
}

impl ViewerContext {
    /// Builds a viewer filling `viewport`.
    ///
    /// Startup order: viewport, camera, scene, lights, controls, model load
    /// (not awaited), output surface, sky.
    pub fn bootstrap(
        config: &ViewerConfig,
        fetcher: Arc<dyn AssetFetcher>,
        renderer: &mut dyn Renderer,
        viewport: ViewportState,
    ) -> Self {
        let camera = CameraRig::from_config(&config.camera, viewport.aspect_ratio());

        let mut scene = SceneGraph::new();
        LightingSetup::apply(config.lighting, &mut scene);

        let mut controls = TrackballControls::new(config.controls);
        controls.handle_resize(viewport.width(), viewport.height());

        let mut context = Self {
            viewport,
            camera,
            scene,
            controls,
            lighting: config.lighting,
            fetcher,
            loads: Vec::new(),
        };

        if let Some(request) = &config.model {
            context.load_model(request.clone());
        }

        renderer.set_surface_size(&context.viewport);

        if let Some(sky) = config.sky {
            SkySetup::apply(sky, &mut context.scene);
        }

        log::info!(
            "Viewer ready: {}x{} @{}x, {:?} lighting, {} scene nodes",
            context.viewport.width(),
            context.viewport.height(),
            context.viewport.pixel_ratio(),
            context.lighting,
            context.scene.node_count()
        );
        context
    }

    pub fn lighting(&self) -> LightingProfile {
        self.lighting
    }

    /// Starts loading a model in the background. It is attached by a later
    /// [`pump_loads`](Self::pump_loads).
    pub fn load_model(&mut self, request: LoadRequest) -> &LoadHandle {
        log::info!("Loading model '{}' from {}", request.name, request.base_path.display());
        let handle = ModelLoader::new(request, self.fetcher.clone()).spawn();
        self.loads.push(handle);
        &self.loads[self.loads.len() - 1]
    }

    pub fn loads(&self) -> &[LoadHandle] {
        &self.loads
    }

    /// Applies loader progress received since the last call.
    pub fn pump_loads(&mut self) {
        for handle in self.loads.iter_mut().filter(|h| !h.is_finished()) {
            handle.pump(&mut self.scene);
        }
    }

    /// Blocks until every started load has attached or failed.
    pub fn finish_loads(&mut self) {
        for handle in &mut self.loads {
            handle.finish(&mut self.scene);
        }
    }

    /// Handles a resize to `width`×`height` logical pixels.
    ///
    /// Returns `false`, and touches nothing, when the size and pixel ratio are
    /// already current.
    pub fn resize(
        &mut self,
        renderer: &mut dyn Renderer,
        width: u32,
        height: u32,
        pixel_ratio: f64,
    ) -> bool {
        self.apply_viewport(renderer, ViewportState::new(width, height, pixel_ratio))
    }

    /// Handles a window resize reported as `width`×`height` physical pixels.
    ///
    /// The output surface gets exactly this size.
    pub fn resize_physical(
        &mut self,
        renderer: &mut dyn Renderer,
        width: u32,
        height: u32,
        pixel_ratio: f64,
    ) -> bool {
        self.apply_viewport(renderer, ViewportState::from_physical(width, height, pixel_ratio))
    }

    fn apply_viewport(&mut self, renderer: &mut dyn Renderer, viewport: ViewportState) -> bool {
        if !self.viewport.replace(viewport) {
            return false;
        }

        self.camera.set_aspect(self.viewport.aspect_ratio());
        self.controls
            .handle_resize(self.viewport.width(), self.viewport.height());
        renderer.set_surface_size(&self.viewport);

        log::debug!(
            "Resized to {}x{} @{}x (aspect {:.3})",
            self.viewport.width(),
            self.viewport.height(),
            self.viewport.pixel_ratio(),
            self.camera.aspect()
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gfx::{lighting::LightKind, rendering::HeadlessRenderer},
        loader::{LoadState, MemoryFetcher},
    };

    fn bootstrap(config: &ViewerConfig, renderer: &mut HeadlessRenderer) -> ViewerContext {
        ViewerContext::bootstrap(
            config,
            Arc::new(MemoryFetcher::new()),
            renderer,
            ViewportState::new(1920, 1080, 2.0),
        )
    }

    #[test]
    fn resize_updates_aspect_and_surface() {
        let mut renderer = HeadlessRenderer::new();
        let mut context = bootstrap(&ViewerConfig::outdoor(), &mut renderer);

        assert!((context.camera.aspect() - 1.778).abs() < 0.001);
        assert_eq!(renderer.surface_size(), (3840, 2160));

        assert!(context.resize(&mut renderer, 800, 600, 2.0));
        assert!((context.camera.aspect() - 1.333).abs() < 0.001);
        assert_eq!(context.camera.aspect(), 800.0 / 600.0);
        assert_eq!(renderer.surface_size(), (1600, 1200));
        assert_eq!(context.viewport.half_width(), 400.0);
    }

    #[test]
    fn repeated_resize_is_a_no_op() {
        let mut renderer = HeadlessRenderer::new();
        let mut context = bootstrap(&ViewerConfig::outdoor(), &mut renderer);

        assert!(context.resize(&mut renderer, 800, 600, 1.5));
        let resizes = renderer.resize_count();
        assert!(!context.resize(&mut renderer, 800, 600, 1.5));
        assert_eq!(renderer.resize_count(), resizes);
        assert_eq!(renderer.surface_size(), (1200, 900));
    }

    #[test]
    fn window_resize_keeps_physical_surface_size() {
        let mut renderer = HeadlessRenderer::new();
        let mut context = bootstrap(&ViewerConfig::outdoor(), &mut renderer);

        assert!(context.resize_physical(&mut renderer, 1000, 750, 1.5));
        assert_eq!(renderer.surface_size(), (1000, 750));
        assert_eq!(context.camera.aspect(), 1000.0 / 750.0);
        assert_eq!(context.viewport.width(), 667);

        let resizes = renderer.resize_count();
        assert!(!context.resize_physical(&mut renderer, 1000, 750, 1.5));
        assert_eq!(renderer.resize_count(), resizes);
    }

    #[test]
    fn outdoor_scene_has_hemisphere_and_shadowed_sun() {
        let mut renderer = HeadlessRenderer::new();
        let context = bootstrap(&ViewerConfig::outdoor(), &mut renderer);

        assert_eq!(context.scene.count_lights(LightKind::Hemisphere), 1);
        assert_eq!(context.scene.count_lights(LightKind::Directional), 1);
        let (_, sun) = context
            .scene
            .lights()
            .find(|(_, l)| l.kind == LightKind::Directional)
            .unwrap();
        assert!(sun.cast_shadow);
        let shadow = sun.shadow.unwrap();
        assert_eq!((shadow.map_width, shadow.map_height), (2048, 2048));
    }

    #[test]
    fn sky_preset_adds_dome_and_sun() {
        let mut renderer = HeadlessRenderer::new();
        let context = bootstrap(&ViewerConfig::outdoor_sky(), &mut renderer);
        assert!(context.scene.sky().is_some());
        // hemisphere, directional, dome, sun
        assert_eq!(context.scene.node_count(), 4);
    }

    #[test]
    fn startup_load_does_not_block_and_failure_leaves_scene_alone() {
        let mut renderer = HeadlessRenderer::new();
        let config = ViewerConfig::studio().with_model("missing");
        let mut context = bootstrap(&config, &mut renderer);
        let nodes = context.scene.node_count();

        context.finish_loads();

        assert_eq!(context.loads().len(), 1);
        assert_eq!(context.loads()[0].state(), LoadState::Failed);
        assert_eq!(context.scene.node_count(), nodes);
    }
}
