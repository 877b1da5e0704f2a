//! # Rendering Module
//!
//! Everything that turns a [`SceneGraph`](crate::gfx::scene::SceneGraph) into
//! pixels, behind the [`Renderer`] trait.
//!
//! - [`RenderEngine`] - wgpu renderer with a directional shadow pass
//! - [`HeadlessRenderer`] - records frames, for windowless runs and tests
//! - [`PipelineManager`] - shader and pipeline registry

pub mod headless;
pub mod pipeline_manager;
pub mod render_engine;
pub mod renderer;

pub use headless::{FrameRecord, HeadlessRenderer};
pub use pipeline_manager::{PipelineConfig, PipelineManager};
pub use render_engine::RenderEngine;
pub use renderer::Renderer;
