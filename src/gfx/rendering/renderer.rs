//! The drawing collaborator of the viewer
//!
//! Startup, resize handling and the render loop only talk to a [`Renderer`].
//! [`RenderEngine`](super::RenderEngine) draws with wgpu, and
//! [`HeadlessRenderer`](super::HeadlessRenderer) records what would be drawn.

use crate::{
    gfx::{camera::CameraRig, scene::SceneGraph},
    viewport::ViewportState,
};

pub trait Renderer {
    /// Resizes the output surface to the physical size of `viewport`.
    fn set_surface_size(&mut self, viewport: &ViewportState);

    /// Current output surface size in physical pixels
    fn surface_size(&self) -> (u32, u32);

    /// Draws one frame of `scene` as seen from `camera`.
    fn draw(&mut self, scene: &SceneGraph, camera: &CameraRig) -> anyhow::Result<()>;
}
