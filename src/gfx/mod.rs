//! # Graphics Module
//!
//! Camera, lights, sky, scene graph and the renderers that draw them.
//!
//! ## Architecture Overview
//!
//! - **Camera System** ([`camera`]) - Perspective camera rig and trackball controls
//! - **Lighting** ([`lighting`]) - The fixed `Simple` and `Outdoor` light rigs
//! - **Sky** ([`sky`]) - Sky dome parameters and the sun helper
//! - **Scene Management** ([`scene`]) - Append-only scene graph, models and materials
//! - **Rendering** ([`rendering`]) - The [`Renderer`] trait and its implementations
//! - **Resource Management** ([`resources`]) - Global uniforms, depth and shadow textures
//!
//! ## Usage
//!
//! ```no_run
//! use vista::gfx::{lighting::{LightingProfile, LightingSetup}, scene::SceneGraph};
//!
//! let mut scene = SceneGraph::new();
//! LightingSetup::apply(LightingProfile::Outdoor, &mut scene);
//! ```

pub mod camera;
pub mod lighting;
pub mod rendering;
pub mod resources;
pub mod scene;
pub mod sky;

// Re-export commonly used types
pub use rendering::{HeadlessRenderer, RenderEngine, Renderer};
