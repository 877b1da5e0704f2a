pub mod camera_controller;
pub mod camera_rig;
pub mod camera_utils;

// Re-export main types
pub use camera_controller::{ControlInput, ControlKey, ControlsConfig, PointerButton, TrackballControls};
pub use camera_rig::{CameraConfig, CameraRig};
pub use camera_utils::{Camera, CameraUniform};
