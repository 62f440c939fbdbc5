/// Fly camera.
///
/// Position plus pitch/yaw angles. WASD sets a velocity in camera space that
/// `update` integrates along the current orientation; holding the right mouse
/// button turns cursor motion into yaw/pitch.

use glam::{Mat4, Quat, Vec3, Vec4};
use crate::window::InputState;

/// Pixels of cursor motion per radian of rotation
const MOUSE_SENSITIVITY: f32 = 400.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub velocity: Vec3,
    pub position: Vec3,
    /// Rotation around X, in radians
    pub pitch: f32,
    /// Rotation around -Y, in radians
    pub yaw: f32,
    /// Movement speed in units per second
    pub speed: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            position: Vec3::ZERO,
            pitch: 0.0,
            yaw: 0.0,
            speed: 1.0,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        Self { position, ..Default::default() }
    }

    /// Orientation as yaw (around -Y) then pitch (around X)
    pub fn rotation_matrix(&self) -> Mat4 {
        let pitch_rotation = Quat::from_axis_angle(Vec3::X, self.pitch);
        let yaw_rotation = Quat::from_axis_angle(Vec3::NEG_Y, self.yaw);
        Mat4::from_quat(yaw_rotation) * Mat4::from_quat(pitch_rotation)
    }

    /// Inverse of the camera's world transform
    pub fn view_matrix(&self) -> Mat4 {
        let translation = Mat4::from_translation(self.position);
        (translation * self.rotation_matrix()).inverse()
    }

    /// Apply one input snapshot
    pub fn process_input(&mut self, input: &InputState) {
        self.velocity = Vec3::ZERO;
        if input.forward {
            self.velocity.z = -1.0;
        }
        if input.backward {
            self.velocity.z = 1.0;
        }
        if input.left {
            self.velocity.x = -1.0;
        }
        if input.right {
            self.velocity.x = 1.0;
        }

        if input.right_mouse {
            self.yaw += input.cursor_delta.x / MOUSE_SENSITIVITY;
            self.pitch -= input.cursor_delta.y / MOUSE_SENSITIVITY;
        }
    }

    /// Move along the current orientation for `delta_seconds`
    pub fn update(&mut self, delta_seconds: f32) {
        let step = self.velocity * self.speed * delta_seconds;
        let world_step = self.rotation_matrix() * Vec4::new(step.x, step.y, step.z, 0.0);
        self.position += world_step.truncate();
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
