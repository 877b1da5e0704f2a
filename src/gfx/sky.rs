//! Sky dome and sun helper
//!
//! The dome stores the atmosphere parameters and the sun position derived
//! from inclination/azimuth. Scattering itself is not evaluated; the renderer
//! only derives a background colour from the sun elevation.

use cgmath::Point3;

use crate::gfx::scene::{NodeId, NodeKind, SceneGraph};

/// Atmosphere parameters of the sky dome
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyParams {
    pub turbidity: f32,
    pub rayleigh: f32,
    pub mie_coefficient: f32,
    pub mie_directional_g: f32,
    pub luminance: f32,
    /// Elevation in half turns, 0.5 puts the sun on the horizon
    pub inclination: f32,
    /// Facing in full turns, 0.25 faces front
    pub azimuth: f32,
    pub show_sun: bool,
    /// Distance of the sun from the origin
    pub distance: f32,
    /// Uniform scale of the dome
    pub scale: f32,
}

impl Default for SkyParams {
    fn default() -> Self {
        Self {
            turbidity: 10.0,
            rayleigh: 2.0,
            mie_coefficient: 0.005,
            mie_directional_g: 0.8,
            luminance: 1.0,
            inclination: 0.49,
            azimuth: 0.25,
            show_sun: false,
            distance: 400_000.0,
            scale: 450_000.0,
        }
    }
}

impl SkyParams {
    /// Sun position for the configured inclination and azimuth
    pub fn sun_position(&self) -> Point3<f32> {
        let theta = std::f32::consts::PI * (self.inclination - 0.5);
        let phi = 2.0 * std::f32::consts::PI * (self.azimuth - 0.5);

        Point3::new(
            self.distance * phi.cos(),
            self.distance * phi.sin() * theta.sin(),
            self.distance * phi.sin() * theta.cos(),
        )
    }

    /// Sun height above the horizon in `[-1, 1]`
    pub fn sun_elevation(&self) -> f32 {
        if self.distance == 0.0 {
            return 0.0;
        }
        (self.sun_position().y / self.distance).clamp(-1.0, 1.0)
    }

    /// Background colour for the current sun elevation
    ///
    /// Blends from a warm horizon tint at sunrise towards a clear blue as the
    /// sun climbs, and towards night below the horizon.
    pub fn clear_color(&self) -> [f64; 4] {
        const NIGHT: [f64; 3] = [0.02, 0.03, 0.06];
        const HORIZON: [f64; 3] = [0.85, 0.55, 0.35];
        const ZENITH: [f64; 3] = [0.30, 0.55, 0.90];

        let elevation = self.sun_elevation() as f64;
        let (from, to, t) = if elevation >= 0.0 {
            (HORIZON, ZENITH, (elevation * 4.0).min(1.0))
        } else {
            (HORIZON, NIGHT, (-elevation * 8.0).min(1.0))
        };
        let luminance = (self.luminance as f64).clamp(0.0, 2.0);
        let mix = |i: usize| ((from[i] + (to[i] - from[i]) * t) * luminance).clamp(0.0, 1.0);
        [mix(0), mix(1), mix(2), 1.0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyDome {
    pub params: SkyParams,
    pub sun_position: Point3<f32>,
}

/// Helper sphere marking the sun, hidden unless `show_sun` is set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunSphere {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
}

impl Default for SunSphere {
    fn default() -> Self {
        Self {
            radius: 20_000.0,
            width_segments: 16,
            height_segments: 8,
        }
    }
}

pub struct SkySetup;

impl SkySetup {
    /// Adds the dome and the sun helper. Returns `(dome, sun)`.
    pub fn apply(params: SkyParams, scene: &mut SceneGraph) -> (NodeId, NodeId) {
        let sun_position = params.sun_position();

        let dome = scene.add(
            "sky",
            NodeKind::Sky(SkyDome {
                params,
                sun_position,
            }),
        );
        if let Some(node) = scene.node_mut(dome) {
            node.scale = params.scale;
        }

        let sun = scene.add("sun", NodeKind::Sun(SunSphere::default()));
        if let Some(node) = scene.node_mut(sun) {
            node.position = sun_position;
            node.visible = params.show_sun;
        }

        log::debug!(
            "Sky dome added, sun at ({:.0}, {:.0}, {:.0})",
            sun_position.x,
            sun_position.y,
            sun_position.z
        );
        (dome, sun)
    }
}
