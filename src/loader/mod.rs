//! # Model Loading
//!
//! Fire-and-forget loading of OBJ/MTL model pairs.
//!
//! - [`ModelLoader`] - runs the material then geometry fetch on a worker thread
//! - [`LoadHandle`] - drained between frames, attaches the model to the scene
//! - [`AssetFetcher`] - where asset bytes come from ([`FileFetcher`], [`MemoryFetcher`])

pub mod fetch;
pub mod model_loader;

pub use fetch::{AssetFetcher, FileFetcher, MemoryFetcher, Progress};
pub use model_loader::{
    LoadEvent, LoadHandle, LoadRequest, LoadState, MaterialSet, ModelLoader, MODEL_BASE_HEIGHT,
};
