//! # Scene Management Module
//!
//! The scene graph owns every node the renderer sees: lights, the optional sky
//! dome and sun helper, a stand-in for the camera, and loaded models.
//!
//! - [`SceneGraph`] - Append-only node container
//! - [`Model`] / [`Mesh`] - Geometry decoded from OBJ files
//! - [`Material`] - Surface parameters decoded from MTL files, with their
//!   [`TextureImage`] diffuse maps
//! - [`Vertex3D`] - GPU vertex format

pub mod material;
pub mod object;
pub mod scene;
pub mod vertex;

// Re-export main types
pub use material::{Material, TextureImage};
pub use object::{Mesh, Model};
pub use scene::{NodeId, NodeKind, SceneGraph, SceneNode, SceneStatistics};
pub use vertex::Vertex3D;
