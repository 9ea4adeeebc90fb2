//! Fly camera and input controller.
//!
//! Produces a fresh [`CameraFrame`] for every frame from WASD + mouse input.
//! The camera itself is opaque to the marcher, which only ever sees the
//! frame snapshot.

use glam::{Vec2, Vec3};
use march::CameraFrame;
use winit::event::ElementState;
use winit::keyboard::KeyCode;

/// First-person camera state.
pub struct FlyCamera {
    pub eye: Vec3,
    /// Horizontal rotation in radians; zero looks down +Z.
    pub yaw: f32,
    /// Vertical rotation in radians, clamped to avoid flipping.
    pub pitch: f32,
}

impl FlyCamera {
    /// Camera at `eye` initially looking toward `target`.
    pub fn new(eye: Vec3, target: Vec3) -> Self {
        let forward = (target - eye).normalize();
        Self {
            eye,
            yaw: forward.x.atan2(forward.z),
            pitch: forward.y.asin(),
        }
    }

    /// Unit view direction from the current yaw/pitch.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.cos() * self.pitch.cos(),
        )
    }

    /// Snapshot the camera for one frame of the given canvas size.
    pub fn frame(&self, width: u32, height: u32) -> CameraFrame {
        #[allow(clippy::cast_precision_loss)]
        let screen_size = Vec2::new(width as f32, height as f32);
        CameraFrame::look_at(self.eye, self.eye + self.forward(), screen_size)
    }
}

/// Keyboard/mouse state driving a [`FlyCamera`].
pub struct CameraController {
    speed: f32,
    sensitivity: f32,
    forward_pressed: bool,
    backward_pressed: bool,
    left_pressed: bool,
    right_pressed: bool,
    up_pressed: bool,
    down_pressed: bool,
}

impl CameraController {
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            speed,
            sensitivity,
            forward_pressed: false,
            backward_pressed: false,
            left_pressed: false,
            right_pressed: false,
            up_pressed: false,
            down_pressed: false,
        }
    }

    /// Track WASD and vertical movement keys. Returns whether the key was
    /// consumed.
    pub fn process_keyboard(&mut self, keycode: KeyCode, state: ElementState) -> bool {
        let pressed = state == ElementState::Pressed;
        match keycode {
            KeyCode::KeyW => self.forward_pressed = pressed,
            KeyCode::KeyS => self.backward_pressed = pressed,
            KeyCode::KeyA => self.left_pressed = pressed,
            KeyCode::KeyD => self.right_pressed = pressed,
            KeyCode::Space => self.up_pressed = pressed,
            KeyCode::ShiftLeft => self.down_pressed = pressed,
            _ => return false,
        }
        true
    }

    /// Apply relative mouse motion to the camera's look direction.
    pub fn process_mouse(&self, camera: &mut FlyCamera, delta_x: f64, delta_y: f64) {
        #[allow(clippy::cast_possible_truncation)]
        {
            camera.yaw += delta_x as f32 * self.sensitivity;
            camera.pitch -= delta_y as f32 * self.sensitivity;
        }
        camera.pitch = camera.pitch.clamp(-1.5, 1.5);
    }

    /// Advance the camera position by the held keys. Forward/backward motion
    /// stays horizontal; Space/Shift move along the world vertical.
    pub fn update_camera(&self, camera: &mut FlyCamera, dt: f32) {
        let forward = camera.forward();
        let forward_flat = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
        let right = Vec3::Y.cross(forward).normalize_or_zero();

        let mut movement = Vec3::ZERO;
        if self.forward_pressed {
            movement += forward_flat;
        }
        if self.backward_pressed {
            movement -= forward_flat;
        }
        if self.left_pressed {
            movement -= right;
        }
        if self.right_pressed {
            movement += right;
        }
        if self.up_pressed {
            movement.y += 1.0;
        }
        if self.down_pressed {
            movement.y -= 1.0;
        }

        if movement.length_squared() > 0.0 {
            camera.eye += movement.normalize() * self.speed * dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_orientation_matches_the_target() {
        let camera = FlyCamera::new(Vec3::new(0.0, 1.0, -2.5), Vec3::new(0.0, 1.0, 1.0));
        assert!(camera.forward().abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn frame_carries_eye_and_canvas() {
        let camera = FlyCamera::new(Vec3::new(0.0, 1.0, -2.5), Vec3::new(0.0, 1.0, 1.0));
        let frame = camera.frame(1280, 720);
        assert_eq!(frame.position, camera.eye);
        assert_eq!(frame.screen_size, Vec2::new(1280.0, 720.0));
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = FlyCamera::new(Vec3::ZERO, Vec3::Z);
        let controller = CameraController::new(5.0, 0.002);
        controller.process_mouse(&mut camera, 0.0, -1e6);
        assert!(camera.pitch <= 1.5);
        controller.process_mouse(&mut camera, 0.0, 1e6);
        assert!(camera.pitch >= -1.5);
    }

    #[test]
    fn forward_motion_stays_horizontal() {
        let mut camera = FlyCamera::new(Vec3::ZERO, Vec3::new(0.0, 0.9, 0.5));
        let mut controller = CameraController::new(1.0, 0.002);
        controller.process_keyboard(KeyCode::KeyW, ElementState::Pressed);

        let before = camera.eye;
        controller.update_camera(&mut camera, 0.5);
        assert!((camera.eye.y - before.y).abs() < 1e-6);
        assert!(camera.eye.z > before.z);
    }
}
