//! Renderer that records frames instead of drawing them

use cgmath::Point3;

use crate::{
    gfx::{camera::CameraRig, scene::SceneGraph},
    viewport::ViewportState,
};

use super::renderer::Renderer;

/// What a single `draw` call saw
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub node_count: usize,
    pub model_count: usize,
    pub light_count: usize,
    pub camera_position: Point3<f32>,
    pub camera_target: Point3<f32>,
    pub camera_aspect: f32,
}

/// Records surface changes and draw calls
///
/// Used for windowless runs and in tests in place of the GPU renderer.
#[derive(Debug, Clone)]
pub struct HeadlessRenderer {
    surface_size: (u32, u32),
    pixel_ratio: f64,
    resize_count: usize,
    frames: Vec<FrameRecord>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self {
            surface_size: (1, 1),
            pixel_ratio: 1.0,
            resize_count: 0,
            frames: Vec::new(),
        }
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Number of `set_surface_size` calls received
    pub fn resize_count(&self) -> usize {
        self.resize_count
    }

    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&FrameRecord> {
        self.frames.last()
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HeadlessRenderer {
    fn set_surface_size(&mut self, viewport: &ViewportState) {
        self.surface_size = viewport.physical_size();
        self.pixel_ratio = viewport.pixel_ratio();
        self.resize_count += 1;
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    fn draw(&mut self, scene: &SceneGraph, camera: &CameraRig) -> anyhow::Result<()> {
        self.frames.push(FrameRecord {
            node_count: scene.node_count(),
            model_count: scene.model_count(),
            light_count: scene.lights().count(),
            camera_position: camera.position(),
            camera_target: camera.target(),
            camera_aspect: camera.aspect(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_size_is_scaled_by_pixel_ratio() {
        let mut renderer = HeadlessRenderer::new();
        renderer.set_surface_size(&ViewportState::new(800, 600, 2.0));
        assert_eq!(renderer.surface_size(), (1600, 1200));
        assert_eq!(renderer.resize_count(), 1);
        assert_eq!(renderer.pixel_ratio(), 2.0);
    }

    #[test]
    fn draw_records_camera_state() {
        let mut renderer = HeadlessRenderer::new();
        let mut camera = CameraRig::create(45.0, 1.25, 1.0, 2000.0);
        camera.set_position(0.0, 2.0, 7.0);
        renderer.draw(&SceneGraph::new(), &camera).unwrap();

        let frame = renderer.last_frame().unwrap();
        assert_eq!(frame.node_count, 0);
        assert_eq!(frame.camera_position, Point3::new(0.0, 2.0, 7.0));
        assert_eq!(frame.camera_aspect, 1.25);
    }
}
