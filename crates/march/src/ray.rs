//! Per-frame camera snapshot and per-pixel ray generation.

use glam::{Mat4, Vec2, Vec3};

/// Fixed 60 degree field of view. Applied along the vertical canvas axis and
/// widened horizontally by the aspect ratio.
pub const FIELD_OF_VIEW: f32 = std::f32::consts::FRAC_PI_3;

/// World-up reference used to build the per-ray basis.
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Immutable camera state for one frame, produced by the input collaborator.
#[derive(Debug, Clone, Copy)]
pub struct CameraFrame {
    pub view_proj: Mat4,
    pub position: Vec3,
    /// Unit view direction.
    pub forward: Vec3,
    /// Canvas size in pixels.
    pub screen_size: Vec2,
}

impl CameraFrame {
    /// Convenience constructor for a camera at `position` looking at `target`.
    #[must_use]
    pub fn look_at(position: Vec3, target: Vec3, screen_size: Vec2) -> Self {
        let forward = (target - position).normalize();
        let aspect = screen_size.x / screen_size.y;
        let view = Mat4::look_at_rh(position, target, WORLD_UP);
        let proj = Mat4::perspective_rh(FIELD_OF_VIEW, aspect, 0.1, 1000.0);
        Self {
            view_proj: proj * view,
            position,
            forward,
            screen_size,
        }
    }
}

/// A world-space ray with normalized direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Point along the ray at parametric distance `t`.
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Build the ray through the center of pixel `(x, y)`.
    ///
    /// The vertical NDC axis is flipped so image row zero looks up, matching
    /// the stored image orientation.
    #[must_use]
    pub fn through_pixel(pixel: Vec2, camera: &CameraFrame) -> Self {
        let ndc = Vec2::new(
            (pixel.x + 0.5) / camera.screen_size.x * 2.0 - 1.0,
            1.0 - (pixel.y + 0.5) / camera.screen_size.y * 2.0,
        );

        let right = WORLD_UP.cross(camera.forward).normalize();
        let up = camera.forward.cross(right);

        let aspect = camera.screen_size.x / camera.screen_size.y;
        let tan_half = (FIELD_OF_VIEW * 0.5).tan();
        let direction = camera.forward + right * (ndc.x * tan_half * aspect) + up * (ndc.y * tan_half);

        Self {
            origin: camera.position,
            direction: direction.normalize(),
        }
    }
}

/// Normalized vertical coordinate of a pixel row, zero at the top.
#[must_use]
pub fn normalized_row(pixel_y: f32, height: f32) -> f32 {
    (pixel_y + 0.5) / height
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_camera() -> CameraFrame {
        CameraFrame::look_at(
            Vec3::new(0.0, 1.0, -2.5),
            Vec3::new(0.0, 1.0, 1.0),
            Vec2::new(640.0, 360.0),
        )
    }

    #[test]
    fn center_pixel_follows_forward() {
        let camera = test_camera();
        // The exact canvas center sits between pixels; the two pixels
        // straddling it deviate by less than half a pixel's solid angle.
        let ray = Ray::through_pixel(Vec2::new(319.5, 179.5), &camera);
        assert!(ray.direction.dot(camera.forward) > 0.999_99);
    }

    #[test]
    fn directions_are_normalized() {
        let camera = test_camera();
        for pixel in [
            Vec2::new(0.0, 0.0),
            Vec2::new(639.0, 0.0),
            Vec2::new(0.0, 359.0),
            Vec2::new(639.0, 359.0),
        ] {
            let ray = Ray::through_pixel(pixel, &camera);
            assert_relative_eq!(ray.direction.length(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn vertical_axis_is_flipped() {
        let camera = test_camera();
        let top = Ray::through_pixel(Vec2::new(320.0, 0.0), &camera);
        let bottom = Ray::through_pixel(Vec2::new(320.0, 359.0), &camera);
        // Row zero is the top of the image, so its ray points up.
        assert!(top.direction.y > camera.forward.y);
        assert!(bottom.direction.y < camera.forward.y);
    }

    #[test]
    fn vertical_span_matches_the_field_of_view() {
        let camera = test_camera();
        // Rays through the exact vertical canvas edges span 60 degrees.
        let top = Ray::through_pixel(Vec2::new(319.5, -0.5), &camera);
        let bottom = Ray::through_pixel(Vec2::new(319.5, 359.5), &camera);
        let spanned = top.direction.dot(bottom.direction).acos();
        assert_relative_eq!(spanned.to_degrees(), 60.0, epsilon = 0.1);
    }

    #[test]
    fn horizontal_span_is_widened_by_aspect() {
        let camera = test_camera();
        let left = Ray::through_pixel(Vec2::new(-0.5, 179.5), &camera);
        let right = Ray::through_pixel(Vec2::new(639.5, 179.5), &camera);
        let spanned = left.direction.dot(right.direction).acos();
        let expected = 2.0 * ((FIELD_OF_VIEW * 0.5).tan() * (640.0 / 360.0)).atan();
        assert_relative_eq!(spanned, expected, epsilon = 1e-3);
    }

    #[test]
    fn normalized_row_covers_unit_range() {
        assert_relative_eq!(normalized_row(0.0, 10.0), 0.05);
        assert_relative_eq!(normalized_row(9.0, 10.0), 0.95);
    }
}
