//! Global uniform bindings for camera and scene lighting
//!
//! One uniform block per frame carries the camera and every light of the
//! active profile. It is bound to group 0 of both the shadow and lit passes
//! and MUST match the `Globals` struct in `scene.wgsl` exactly.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, SquareMatrix};

use crate::{
    gfx::{
        camera::{Camera, CameraRig},
        lighting::{LightDescriptor, LightKind, ShadowParams},
        scene::SceneGraph,
    },
    wgpu_utils::{binding_types, uniform_buffer::UniformBuffer},
};

/// Global uniform buffer content
///
/// Every light slot is a pair of `vec4`s; a `w` of zero in the flag slot
/// disables the light.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    /// rgb, intensity
    pub ambient: [f32; 4],
    /// sky rgb, intensity
    pub hemi_sky: [f32; 4],
    /// ground rgb, unused
    pub hemi_ground: [f32; 4],
    /// direction towards the light, enabled flag
    pub dir_direction: [f32; 4],
    /// rgb, intensity
    pub dir_color: [f32; 4],
    /// world position, enabled flag
    pub point_position: [f32; 4],
    /// rgb, intensity
    pub point_color: [f32; 4],
    /// bias, darkness, enabled flag, map size
    pub shadow: [f32; 4],
}

impl Default for GlobalUniform {
    fn default() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
            light_view_proj: Matrix4::identity().into(),
            ambient: [0.0; 4],
            hemi_sky: [0.0; 4],
            hemi_ground: [0.0; 4],
            dir_direction: [0.0; 4],
            dir_color: [0.0; 4],
            point_position: [0.0; 4],
            point_color: [0.0; 4],
            shadow: [0.0; 4],
        }
    }
}

impl GlobalUniform {
    /// Packs the camera and the first light of each kind found in `scene`.
    pub fn from_scene(scene: &SceneGraph, camera: &CameraRig) -> Self {
        let mut content = GlobalUniform {
            view_position: camera.position().to_homogeneous().into(),
            view_proj: camera.build_view_projection_matrix().into(),
            ..Default::default()
        };

        let mut seen = std::collections::HashSet::new();
        for (id, light) in scene.lights() {
            if !seen.insert(light.kind) {
                continue;
            }
            let flag = 1.0;
            match light.kind {
                LightKind::Ambient => {
                    content.ambient = with_w(light.color, light.intensity);
                }
                LightKind::Hemisphere => {
                    content.hemi_sky = with_w(light.color, light.intensity);
                    content.hemi_ground = with_w(light.ground_color, 0.0);
                }
                LightKind::Point => {
                    let position = scene.world_position(id).unwrap_or(light.position);
                    content.point_position = with_w(position.into(), flag);
                    content.point_color = with_w(light.color, light.intensity);
                }
                LightKind::Directional => {
                    let direction = light.position.to_vec();
                    if direction.magnitude2() > 0.0 {
                        content.dir_direction = with_w(direction.normalize().into(), flag);
                        content.dir_color = with_w(light.color, light.intensity);
                        if let Some(shadow) = shadow_of(light) {
                            content.light_view_proj =
                                shadow.view_projection(direction, scene.position()).into();
                            content.shadow = [
                                shadow.bias,
                                shadow.darkness,
                                flag,
                                shadow.map_width as f32,
                            ];
                        }
                    }
                }
            }
        }

        content
    }

    pub fn casts_shadow(&self) -> bool {
        self.shadow[2] > 0.5
    }
}

fn with_w(xyz: [f32; 3], w: f32) -> [f32; 4] {
    [xyz[0], xyz[1], xyz[2], w]
}

/// Shadow parameters of a light, if it is actually casting
pub fn shadow_of(light: &LightDescriptor) -> Option<ShadowParams> {
    if light.cast_shadow {
        light.shadow
    } else {
        None
    }
}

/// Type alias for the global uniform buffer
pub type GlobalUBO = UniformBuffer<GlobalUniform>;

/// Layout and bind group for the global uniform block (group 0)
pub struct GlobalBindings {
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device, ubo: &GlobalUBO) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &[binding_types::rendering_entry(0, binding_types::uniform())],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &layout,
            entries: &[ubo.entry(0)],
        });

        Self { layout, bind_group }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
