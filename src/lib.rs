// src/lib.rs
//! Vista 3D model viewer
//!
//! A small scene viewer built on wgpu and winit: a perspective camera with
//! trackball controls, one of two fixed light rigs, an optional sky dome, and
//! OBJ/MTL models loaded in the background while frames keep rendering.

pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod gfx;
pub mod loader;
pub mod render_loop;
pub mod viewport;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::VistaApp;
pub use config::ViewerConfig;
pub use context::ViewerContext;
pub use error::LoadError;
pub use render_loop::{FrameScheduler, ManualScheduler, RenderLoop};
