use super::camera_utils::{Camera, CameraUniform, OPENGL_TO_WGPU_MATRIX};
use cgmath::*;

/// Construction parameters for the viewer camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Point3<f32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 1.0,
            far: 2000.0,
            position: Point3::new(0.0, 2.0, 7.0),
        }
    }
}

/// Perspective camera with fixed field of view and clip planes
///
/// Only the position, the look-at target and the aspect ratio change after
/// construction. The projection matrix is recomputed whenever the aspect
/// ratio is set.
#[derive(Debug, Clone, Copy)]
pub struct CameraRig {
    position: Point3<f32>,
    target: Point3<f32>,
    up: Vector3<f32>,
    fovy: Deg<f32>,
    aspect: f32,
    znear: f32,
    zfar: f32,
    projection: Matrix4<f32>,
    pub uniform: CameraUniform,
}

impl Camera for CameraRig {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection * self.view_matrix()
    }
}

impl CameraRig {
    /// # Panics
    /// Panics if `aspect` is not a positive finite number.
    pub fn create(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Point3::origin(),
            target: Point3::origin(),
            up: Vector3::unit_y(),
            fovy: Deg(fov_degrees),
            aspect: 1.0,
            znear: near,
            zfar: far,
            projection: Matrix4::identity(),
            uniform: CameraUniform::default(),
        };
        camera.set_aspect(aspect);
        camera
    }

    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self::create(config.fov_degrees, aspect, config.near, config.far);
        camera.set_position(config.position.x, config.position.y, config.position.z);
        camera
    }

    pub fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.position = Point3::new(x, y, z);
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    /// Sets the aspect ratio and recomputes the projection.
    ///
    /// # Panics
    /// Panics if `ratio` is not a positive finite number.
    pub fn set_aspect(&mut self, ratio: f32) {
        assert!(
            ratio.is_finite() && ratio > 0.0,
            "camera aspect ratio must be positive, got {ratio}"
        );
        self.aspect = ratio;
        self.projection =
            OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar);
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn look_at(&mut self, target: Point3<f32>) {
        self.target = target;
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn fov(&self) -> Deg<f32> {
        self.fovy
    }

    pub fn near(&self) -> f32 {
        self.znear
    }

    pub fn far(&self) -> f32 {
        self.zfar
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn update_view_proj(&mut self) {
        self.uniform.view_position = self.position.to_homogeneous().into();
        self.uniform.view_proj = self.build_view_projection_matrix().into();
    }
}
