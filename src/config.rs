//! Viewer configuration
//!
//! Everything is configured in code. The three named presets differ only in
//! their lighting profile and whether a sky dome is added.

use std::path::PathBuf;

use crate::{
    gfx::{
        camera::{CameraConfig, ControlsConfig},
        lighting::LightingProfile,
        sky::SkyParams,
    },
    loader::LoadRequest,
};

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub title: String,
    /// Logical window size before the first resize
    pub initial_size: (u32, u32),
    pub camera: CameraConfig,
    pub lighting: LightingProfile,
    pub sky: Option<SkyParams>,
    pub controls: ControlsConfig,
    /// Model to load at startup, if any
    pub model: Option<LoadRequest>,
    /// Directory the asset paths of `model` are relative to
    pub asset_root: PathBuf,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Vista".to_string(),
            initial_size: (1200, 800),
            camera: CameraConfig::default(),
            lighting: LightingProfile::default(),
            sky: None,
            controls: ControlsConfig::default(),
            model: None,
            asset_root: PathBuf::from("."),
        }
    }
}

impl ViewerConfig {
    /// Ambient plus camera light, no sky
    pub fn studio() -> Self {
        Self::default().with_lighting(LightingProfile::Simple)
    }

    /// Hemisphere light plus shadowed sun, no sky
    pub fn outdoor() -> Self {
        Self::default().with_lighting(LightingProfile::Outdoor)
    }

    /// Outdoor lighting under a sky dome
    pub fn outdoor_sky() -> Self {
        Self::outdoor().with_sky(SkyParams::default())
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_initial_size(mut self, width: u32, height: u32) -> Self {
        self.initial_size = (width, height);
        self
    }

    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_lighting(mut self, lighting: LightingProfile) -> Self {
        self.lighting = lighting;
        self
    }

    pub fn with_sky(mut self, sky: SkyParams) -> Self {
        self.sky = Some(sky);
        self
    }

    pub fn with_controls(mut self, controls: ControlsConfig) -> Self {
        self.controls = controls;
        self
    }

    /// Loads `model/<name>/<name>.mtl|.obj` at startup
    pub fn with_model(mut self, name: &str) -> Self {
        self.model = Some(LoadRequest::for_model(name));
        self
    }

    pub fn with_load_request(mut self, request: LoadRequest) -> Self {
        self.model = Some(request);
        self
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_share_one_profile_field() {
        let studio = ViewerConfig::studio();
        assert_eq!(studio.lighting, LightingProfile::Simple);
        assert!(studio.sky.is_none());

        let outdoor = ViewerConfig::outdoor();
        assert_eq!(outdoor.lighting, LightingProfile::Outdoor);
        assert!(outdoor.sky.is_none());

        let sky = ViewerConfig::outdoor_sky();
        assert_eq!(sky.lighting, LightingProfile::Outdoor);
        assert_eq!(sky.sky, Some(SkyParams::default()));
    }

    #[test]
    fn defaults_match_viewer_camera() {
        let config = ViewerConfig::default();
        assert_eq!(config.initial_size, (1200, 800));
        assert_eq!(config.camera.fov_degrees, 45.0);
        assert_eq!(config.camera.near, 1.0);
        assert_eq!(config.camera.far, 2000.0);
        assert!(config.model.is_none());
    }

    #[test]
    fn with_model_uses_asset_layout() {
        let config = ViewerConfig::studio().with_model("boat");
        assert_eq!(
            config.model.unwrap().geometry_path(),
            PathBuf::from("model/boat/boat.obj")
        );
    }
}
