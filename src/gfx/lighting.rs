//! Fixed light rigs applied once at startup
//!
//! Two profiles exist. `Simple` is an ambient light plus a point light riding
//! on the camera. `Outdoor` is a hemisphere light plus a shadow-casting
//! directional "sun". Lights are plain descriptors stored in the scene graph;
//! the renderer reads them every frame and nothing mutates them afterwards.

use cgmath::{InnerSpace, Matrix4, Point3, Vector3};

use crate::gfx::scene::{NodeId, NodeKind, SceneGraph};

/// Converts a `0xRRGGBB` colour into linear-ish floats in `[0, 1]`.
pub fn rgb_hex(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Ambient,
    Point,
    Hemisphere,
    Directional,
}

/// Orthographic shadow camera of a directional light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowParams {
    pub map_width: u32,
    pub map_height: u32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
    /// Added to the receiver depth before the comparison
    pub bias: f32,
    /// Fraction of direct light removed inside shadow
    pub darkness: f32,
}

impl ShadowParams {
    /// Square frustum of half extent `d` on every side
    pub fn square(map_size: u32, d: f32, far: f32) -> Self {
        Self {
            map_width: map_size,
            map_height: map_size,
            left: -d,
            right: d,
            top: d,
            bottom: -d,
            near: 0.5,
            far,
            bias: 0.0,
            darkness: 0.5,
        }
    }

    pub fn with_bias(mut self, bias: f32) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_darkness(mut self, darkness: f32) -> Self {
        self.darkness = darkness;
        self
    }

    /// View-projection of the shadow camera for a light shining from
    /// `direction` onto `target`.
    ///
    /// The eye sits halfway along the depth range so geometry on both sides
    /// of the target lands inside the frustum.
    pub fn view_projection(&self, direction: Vector3<f32>, target: Point3<f32>) -> Matrix4<f32> {
        let direction = direction.normalize();
        let eye = target + direction * (self.far * 0.5);
        let up = if direction.y.abs() > 0.99 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let view = Matrix4::look_at_rh(eye, target, up);
        let proj = cgmath::ortho(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        );
        crate::gfx::camera::camera_utils::OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

/// One light source
///
/// For directional lights `position` is the direction the light comes from,
/// as in "sun at (-1, 0.75, 1)".
#[derive(Debug, Clone, PartialEq)]
pub struct LightDescriptor {
    pub kind: LightKind,
    pub color: [f32; 3],
    /// Only meaningful for hemisphere lights
    pub ground_color: [f32; 3],
    pub intensity: f32,
    pub position: Point3<f32>,
    pub cast_shadow: bool,
    pub shadow: Option<ShadowParams>,
}

impl LightDescriptor {
    pub fn ambient(color: [f32; 3], intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            color,
            ground_color: [0.0; 3],
            intensity,
            position: Point3::new(0.0, 0.0, 0.0),
            cast_shadow: false,
            shadow: None,
        }
    }

    pub fn point(color: [f32; 3], intensity: f32) -> Self {
        Self {
            kind: LightKind::Point,
            ..Self::ambient(color, intensity)
        }
    }

    pub fn hemisphere(sky: [f32; 3], ground: [f32; 3], intensity: f32) -> Self {
        Self {
            kind: LightKind::Hemisphere,
            ground_color: ground,
            ..Self::ambient(sky, intensity)
        }
    }

    pub fn directional(color: [f32; 3], intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            ..Self::ambient(color, intensity)
        }
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Point3::new(x, y, z);
        self
    }

    pub fn with_shadow(mut self, shadow: ShadowParams) -> Self {
        self.cast_shadow = true;
        self.shadow = Some(shadow);
        self
    }
}

/// Which light rig the viewer starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightingProfile {
    /// Ambient fill plus a point light attached to the camera
    Simple,
    /// Hemisphere sky light plus a shadow-casting directional sun
    #[default]
    Outdoor,
}

impl LightingProfile {
    /// Descriptors of the rig, paired with whether each rides on the camera
    pub fn lights(self) -> Vec<(&'static str, LightDescriptor, bool)> {
        match self {
            LightingProfile::Simple => vec![
                ("ambient", LightDescriptor::ambient(rgb_hex(0xcccccc), 0.4), false),
                ("camera-light", LightDescriptor::point(rgb_hex(0xffffff), 0.8), true),
            ],
            LightingProfile::Outdoor => vec![
                (
                    "hemilight",
                    LightDescriptor::hemisphere([0.5, 0.75, 0.6], [0.5, 0.5, 0.095], 0.6)
                        .at(0.0, 500.0, 0.0),
                    false,
                ),
                (
                    "dirlight",
                    LightDescriptor::directional(rgb_hex(0xffffff), 1.0)
                        .at(-1.0, 0.75, 1.0)
                        .with_shadow(
                            ShadowParams::square(2048, 300.0, 3500.0)
                                .with_bias(-0.0001)
                                .with_darkness(0.35),
                        ),
                    false,
                ),
            ],
        }
    }
}

/// Adds the lights of a profile to the scene graph
pub struct LightingSetup;

impl LightingSetup {
    /// Applies `profile` once.
    ///
    /// Lights that ride on the camera are parented to `camera_node`, adding the
    /// camera node to the scene first if needed.
    pub fn apply(profile: LightingProfile, scene: &mut SceneGraph) {
        for (name, light, on_camera) in profile.lights() {
            let parent = if on_camera {
                Some(scene.ensure_camera_node())
            } else {
                None
            };
            let id: NodeId = scene.add_child(parent, name, NodeKind::Light(light));
            log::debug!("Added light '{}' as node {:?}", name, id);
        }
    }
}
