use cgmath::*;
use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseButton, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
};

use super::camera_rig::CameraRig;

/// Below this magnitude residual motion is dropped and the controls come to rest.
const REST_EPSILON: f32 = 1e-6;

/// Wheel lines are converted to zoom units with this factor.
const WHEEL_ZOOM_SCALE: f32 = 0.05;

/// Pixel deltas from touchpads are roughly this many times larger than lines.
const PIXELS_PER_LINE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlsConfig {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub no_zoom: bool,
    pub no_pan: bool,
    /// Static moving applies input in a single frame. Otherwise motion decays
    /// by `damping_factor` per frame.
    pub static_moving: bool,
    pub damping_factor: f32,
    pub target: Point3<f32>,
    /// Holding these keys turns a primary drag into rotate, zoom, pan.
    pub keys: [KeyCode; 3],
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            rotate_speed: 1.2,
            zoom_speed: 1.2,
            pan_speed: 0.8,
            no_zoom: false,
            no_pan: false,
            static_moving: false,
            damping_factor: 0.15,
            target: Point3::origin(),
            keys: [KeyCode::KeyA, KeyCode::KeyS, KeyCode::KeyD],
            min_distance: 0.0,
            max_distance: f32::INFINITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// One of the three modifier keys configured in [`ControlsConfig::keys`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    Rotate,
    Zoom,
    Pan,
}

/// Host-independent input captured between two `update` calls
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlInput {
    PointerDown(PointerButton),
    PointerUp(PointerButton),
    /// Pointer motion in physical pixels
    PointerMove { dx: f32, dy: f32 },
    /// Wheel motion in lines, positive scrolls away from the user
    Wheel(f32),
    KeyDown(ControlKey),
    KeyUp(ControlKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Rotate,
    Zoom,
    Pan,
}

/// Trackball-style camera manipulation: drag to orbit, scroll to zoom, drag to pan.
///
/// Input is only recorded by [`handle_input`](Self::handle_input). The camera
/// moves in [`update`](Self::update), which the render loop calls once per frame.
pub struct TrackballControls {
    pub config: ControlsConfig,
    target: Point3<f32>,
    screen_height: f32,
    held_key: Option<ControlKey>,
    drag: Option<DragMode>,

    // Input captured since the last update
    pending_rotate: Vector2<f32>,
    pending_zoom: f32,
    pending_pan: Vector2<f32>,

    // Motion carried over between frames when damping is active
    rotate_velocity: Vector2<f32>,
    zoom_velocity: f32,
    pan_velocity: Vector2<f32>,
}

impl TrackballControls {
    pub fn new(config: ControlsConfig) -> Self {
        Self {
            target: config.target,
            config,
            screen_height: 1.0,
            held_key: None,
            drag: None,
            pending_rotate: Vector2::zero(),
            pending_zoom: 0.0,
            pending_pan: Vector2::zero(),
            rotate_velocity: Vector2::zero(),
            zoom_velocity: 0.0,
            pan_velocity: Vector2::zero(),
        }
    }

    /// Point the camera orbits around
    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    /// Pointer deltas are normalised by the screen height
    pub fn handle_resize(&mut self, _width: u32, height: u32) {
        self.screen_height = height.max(1) as f32;
    }

    /// True once no input is pending and all damped motion has decayed
    pub fn is_at_rest(&self) -> bool {
        self.pending_rotate.is_zero()
            && self.pending_zoom == 0.0
            && self.pending_pan.is_zero()
            && self.rotate_velocity.is_zero()
            && self.zoom_velocity == 0.0
            && self.pan_velocity.is_zero()
    }

    pub fn handle_input(&mut self, input: ControlInput) {
        match input {
            ControlInput::KeyDown(key) => {
                if self.held_key.is_none() {
                    self.held_key = Some(key);
                }
            }
            ControlInput::KeyUp(key) => {
                if self.held_key == Some(key) {
                    self.held_key = None;
                }
            }
            ControlInput::PointerDown(button) => {
                if self.drag.is_none() {
                    self.drag = self.drag_mode_for(button);
                }
            }
            ControlInput::PointerUp(_) => {
                self.drag = None;
            }
            ControlInput::PointerMove { dx, dy } => {
                let scaled = Vector2::new(dx, dy) / self.screen_height;
                match self.drag {
                    Some(DragMode::Rotate) => self.pending_rotate += scaled,
                    Some(DragMode::Zoom) => self.pending_zoom += scaled.y,
                    Some(DragMode::Pan) => self.pending_pan += scaled,
                    None => {}
                }
            }
            ControlInput::Wheel(lines) => {
                if !self.config.no_zoom {
                    self.pending_zoom -= lines * WHEEL_ZOOM_SCALE;
                }
            }
        }
    }

    fn drag_mode_for(&self, button: PointerButton) -> Option<DragMode> {
        let mode = match (self.held_key, button) {
            (Some(ControlKey::Rotate), _) => DragMode::Rotate,
            (Some(ControlKey::Zoom), _) => DragMode::Zoom,
            (Some(ControlKey::Pan), _) => DragMode::Pan,
            (None, PointerButton::Primary) => DragMode::Rotate,
            (None, PointerButton::Middle) => DragMode::Zoom,
            (None, PointerButton::Secondary) => DragMode::Pan,
        };

        match mode {
            DragMode::Zoom if self.config.no_zoom => None,
            DragMode::Pan if self.config.no_pan => None,
            mode => Some(mode),
        }
    }

    /// Applies captured input and any remaining damped motion to `camera`.
    ///
    /// A call with no pending input while the controls are at rest leaves the
    /// camera untouched.
    pub fn update(&mut self, camera: &mut CameraRig) {
        self.rotate_velocity += self.pending_rotate * self.config.rotate_speed;
        self.zoom_velocity += self.pending_zoom * self.config.zoom_speed;
        self.pan_velocity += self.pending_pan * self.config.pan_speed;
        self.pending_rotate = Vector2::zero();
        self.pending_zoom = 0.0;
        self.pending_pan = Vector2::zero();

        if self.rotate_velocity.is_zero() && self.zoom_velocity == 0.0 && self.pan_velocity.is_zero()
        {
            return;
        }

        let mut eye = camera.position();
        if !self.rotate_velocity.is_zero() {
            eye = self.rotate(eye, camera.up());
        }
        if self.zoom_velocity != 0.0 {
            eye = self.zoom(eye);
        }
        if !self.pan_velocity.is_zero() {
            eye = self.pan(eye, camera.up());
        }
        camera.set_position(eye.x, eye.y, eye.z);

        if self.config.static_moving {
            self.rotate_velocity = Vector2::zero();
            self.zoom_velocity = 0.0;
            self.pan_velocity = Vector2::zero();
        } else {
            let keep = 1.0 - self.config.damping_factor;
            self.rotate_velocity = settle_vec(self.rotate_velocity * keep);
            self.zoom_velocity = settle(self.zoom_velocity * keep);
            self.pan_velocity = settle_vec(self.pan_velocity * keep);
        }
    }

    /// Orbits the eye around the target, keeping its distance.
    fn rotate(&self, eye: Point3<f32>, up: Vector3<f32>) -> Point3<f32> {
        let offset = eye - self.target;
        let radius = offset.magnitude();
        if radius <= f32::EPSILON {
            return eye;
        }

        let angles = self.rotate_velocity * std::f32::consts::PI;
        let yaw = offset.x.atan2(offset.z) - angles.x;
        let pitch = (offset.y / radius).clamp(-1.0, 1.0).asin() + angles.y;
        let limit = std::f32::consts::FRAC_PI_2 - 1e-3;
        let pitch = pitch.clamp(-limit, limit);

        debug_assert!(up == Vector3::unit_y());
        self.target
            + Vector3::new(
                radius * yaw.sin() * pitch.cos(),
                radius * pitch.sin(),
                radius * yaw.cos() * pitch.cos(),
            )
    }

    /// Scales the eye distance to the target.
    fn zoom(&self, eye: Point3<f32>) -> Point3<f32> {
        let offset = eye - self.target;
        let distance = offset.magnitude();
        if distance <= f32::EPSILON {
            return eye;
        }
        let factor = (1.0 + self.zoom_velocity).max(0.1);
        let new_distance =
            (distance * factor).clamp(self.config.min_distance, self.config.max_distance);
        self.target + offset * (new_distance / distance)
    }

    /// Moves eye and target together in the view plane.
    fn pan(&mut self, eye: Point3<f32>, up: Vector3<f32>) -> Point3<f32> {
        let offset = eye - self.target;
        let distance = offset.magnitude();
        if distance <= f32::EPSILON {
            return eye;
        }
        let forward = -offset / distance;
        let right = forward.cross(up);
        if right.magnitude2() <= f32::EPSILON {
            return eye;
        }
        let right = right.normalize();
        let view_up = right.cross(forward).normalize();

        // Scale by distance for a consistent feel at all zoom levels
        let movement =
            (-right * self.pan_velocity.x + view_up * self.pan_velocity.y) * distance;
        self.target += movement;
        eye + movement
    }

    pub fn process_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.handle_input(ControlInput::PointerMove {
                dx: delta.0 as f32,
                dy: delta.1 as f32,
            });
        }
    }

    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        let button = match button {
            MouseButton::Left => PointerButton::Primary,
            MouseButton::Middle => PointerButton::Middle,
            MouseButton::Right => PointerButton::Secondary,
            _ => return,
        };
        self.handle_input(match state {
            ElementState::Pressed => ControlInput::PointerDown(button),
            ElementState::Released => ControlInput::PointerUp(button),
        });
    }

    pub fn process_mouse_wheel(&mut self, delta: &MouseScrollDelta) {
        let lines = match delta {
            MouseScrollDelta::LineDelta(_, scroll) => *scroll,
            MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => {
                *y as f32 / PIXELS_PER_LINE
            }
        };
        self.handle_input(ControlInput::Wheel(lines));
    }

    pub fn process_key_event(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(key) = self.control_key(code) else {
            return;
        };
        if event.repeat {
            return;
        }
        self.handle_input(match event.state {
            ElementState::Pressed => ControlInput::KeyDown(key),
            ElementState::Released => ControlInput::KeyUp(key),
        });
    }

    fn control_key(&self, code: KeyCode) -> Option<ControlKey> {
        let [rotate, zoom, pan] = self.config.keys;
        if code == rotate {
            Some(ControlKey::Rotate)
        } else if code == zoom {
            Some(ControlKey::Zoom)
        } else if code == pan {
            Some(ControlKey::Pan)
        } else {
            None
        }
    }
}

fn settle(value: f32) -> f32 {
    if value.abs() < REST_EPSILON {
        0.0
    } else {
        value
    }
}

fn settle_vec(value: Vector2<f32>) -> Vector2<f32> {
    Vector2::new(settle(value.x), settle(value.y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> CameraRig {
        let mut camera = CameraRig::create(45.0, 1.0, 1.0, 2000.0);
        camera.set_position(0.0, 2.0, 7.0);
        camera
    }

    fn controls(static_moving: bool) -> TrackballControls {
        let mut controls = TrackballControls::new(ControlsConfig {
            static_moving,
            ..Default::default()
        });
        controls.handle_resize(800, 600);
        controls
    }

    fn drag(controls: &mut TrackballControls, button: PointerButton, dx: f32, dy: f32) {
        controls.handle_input(ControlInput::PointerDown(button));
        controls.handle_input(ControlInput::PointerMove { dx, dy });
        controls.handle_input(ControlInput::PointerUp(button));
    }

    #[test]
    fn update_without_input_does_not_move_camera() {
        let mut camera = camera();
        let mut controls = controls(false);
        let start = camera.position();

        controls.update(&mut camera);
        controls.update(&mut camera);
        assert_eq!(camera.position(), start);
        assert!(controls.is_at_rest());
    }

    #[test]
    fn static_moving_second_update_is_a_no_op() {
        let mut camera = camera();
        let mut controls = controls(true);
        let start = camera.position();

        drag(&mut controls, PointerButton::Primary, 40.0, 0.0);
        controls.update(&mut camera);
        let after_first = camera.position();
        assert_ne!(after_first, start);

        controls.update(&mut camera);
        assert_eq!(camera.position(), after_first);
    }

    #[test]
    fn damped_motion_decays_to_rest() {
        let mut camera = camera();
        let mut controls = controls(false);

        drag(&mut controls, PointerButton::Primary, 60.0, 0.0);
        let mut steps = Vec::new();
        let mut frames = 0;
        while !controls.is_at_rest() {
            let before = camera.position();
            controls.update(&mut camera);
            steps.push((camera.position() - before).magnitude());
            frames += 1;
            assert!(frames < 1000, "controls never settled");
        }
        // each frame moves less than the previous one
        assert!(steps.windows(2).all(|w| w[1] <= w[0] + 1e-5));

        let rested = camera.position();
        controls.update(&mut camera);
        controls.update(&mut camera);
        assert_eq!(camera.position(), rested);
    }

    #[test]
    fn rotation_keeps_distance_to_target() {
        let mut camera = camera();
        let mut controls = controls(true);
        let distance = camera.position().to_vec().magnitude();

        drag(&mut controls, PointerButton::Primary, 120.0, -45.0);
        controls.update(&mut camera);
        let moved = camera.position().to_vec().magnitude();
        assert!((moved - distance).abs() < 1e-4);
    }

    #[test]
    fn wheel_zooms_toward_target() {
        let mut camera = camera();
        let mut controls = controls(true);
        let distance = camera.position().to_vec().magnitude();

        controls.handle_input(ControlInput::Wheel(2.0));
        controls.update(&mut camera);
        assert!(camera.position().to_vec().magnitude() < distance);
    }

    #[test]
    fn pan_key_turns_primary_drag_into_pan() {
        let mut camera = camera();
        let mut controls = controls(true);

        controls.handle_input(ControlInput::KeyDown(ControlKey::Pan));
        drag(&mut controls, PointerButton::Primary, 30.0, 0.0);
        controls.handle_input(ControlInput::KeyUp(ControlKey::Pan));
        controls.update(&mut camera);

        assert_ne!(controls.target(), Point3::origin());
        // panning moves eye and target together
        let offset = camera.position() - controls.target();
        assert!((offset - Vector3::new(0.0, 2.0, 7.0)).magnitude() < 1e-4);
    }

    #[test]
    fn disabled_pan_ignores_drag() {
        let mut camera = camera();
        let mut controls = TrackballControls::new(ControlsConfig {
            no_pan: true,
            static_moving: true,
            ..Default::default()
        });
        let start = camera.position();

        drag(&mut controls, PointerButton::Secondary, 30.0, 30.0);
        controls.update(&mut camera);
        assert_eq!(camera.position(), start);
    }

    #[test]
    fn motion_without_button_is_ignored() {
        let mut controls = controls(false);
        controls.handle_input(ControlInput::PointerMove { dx: 10.0, dy: 10.0 });
        assert!(controls.is_at_rest());
    }
}
