//! # Camera Implementation
//!
//! A yaw/pitch camera that supplies the world-to-camera (view) matrix the
//! draw pass culls against, and the ray used for block targeting.

use cgmath::*;
use std::f32::consts::FRAC_PI_2;

/// Safe limit for pitch to prevent gimbal lock
const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

/// Represents a first-person camera in 3D space.
///
/// Yaw is measured from +x towards +z, pitch from the horizon towards +y.
#[derive(Debug, Clone)]
pub struct Camera {
    /// The camera's position in world space
    pub position: Point3<f32>,
    /// Horizontal rotation (around Y axis) in radians
    pub yaw: Rad<f32>,
    /// Vertical rotation (around X axis) in radians
    pub pitch: Rad<f32>,
}

impl Camera {
    /// Creates a new camera with the specified position and orientation.
    ///
    /// # Arguments
    /// * `position` - Initial position of the camera in world space
    /// * `yaw` - Initial yaw (horizontal rotation around Y axis)
    /// * `pitch` - Initial pitch, clamped just short of straight up or down
    ///
    /// # Example
    /// ```rust
    /// use cgmath::{Deg, Point3};
    /// use voxel_pipeline::engine_state::camera_state::Camera;
    ///
    /// let camera = Camera::new(Point3::new(0.0, 0.0, 0.0), Deg(90.0), Deg(0.0));
    /// assert!((camera.get_view_vec().z - 1.0).abs() < 1e-5);
    /// ```
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        let mut camera = Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        };
        camera.clamp_pitch();
        camera
    }

    /// Turns the camera by the given angles.
    pub fn rotate<Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(&mut self, yaw: Y, pitch: P) {
        self.yaw += yaw.into();
        self.pitch += pitch.into();
        self.clamp_pitch();
    }

    fn clamp_pitch(&mut self) {
        if self.pitch < -Rad(SAFE_FRAC_PI_2) {
            self.pitch = -Rad(SAFE_FRAC_PI_2);
        } else if self.pitch > Rad(SAFE_FRAC_PI_2) {
            self.pitch = Rad(SAFE_FRAC_PI_2);
        }
    }

    /// Gets the camera's forward direction vector.
    ///
    /// # Returns
    /// A normalized 3D vector representing the camera's forward direction
    pub fn get_view_vec(&self) -> Vector3<f32> {
        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.0.sin_cos();
        Vector3::new(yaw_cos * pitch_cos, pitch_sin, yaw_sin * pitch_cos).normalize()
    }

    /// Calculates the view matrix for this camera.
    ///
    /// The view matrix transforms world coordinates to view (camera) space,
    /// where the camera looks down -z.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.get_view_vec(), Vector3::unit_y())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_ahead_land_on_negative_z() {
        let camera = Camera::new(Point3::new(1.0, 2.0, 3.0), Deg(0.0), Deg(0.0));
        let ahead = camera.calc_matrix() * Point3::new(11.0, 2.0, 3.0).to_homogeneous();
        assert!((ahead.z + 10.0).abs() < 1e-4);
        assert!(ahead.x.abs() < 1e-4 && ahead.y.abs() < 1e-4);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::new(Point3::new(0.0, 0.0, 0.0), Deg(0.0), Deg(0.0));
        camera.rotate(Deg(0.0), Deg(120.0));
        assert!(camera.pitch.0 < FRAC_PI_2);
        assert!(camera.get_view_vec().y > 0.99);
    }
}
