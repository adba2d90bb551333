//! Capture camera.

use glam::{Mat3, Mat4, Vec3};
use pathcap_core::InterpolatedPose;

/// Default vertical field of view in degrees.
pub const DEFAULT_FOV_DEGREES: f32 = 45.0;
/// Default near clipping plane.
pub const DEFAULT_NEAR: f32 = 0.001;
/// Default far clipping plane.
pub const DEFAULT_FAR: f32 = 256.0;

/// A perspective camera posed by a world-to-camera rotation and a position.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// World-to-camera rotation.
    pub rotation: Mat3,
    /// Field of view in radians.
    pub fov: f32,
    /// Aspect ratio (width / height).
    pub aspect_ratio: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
}

impl Camera {
    /// Creates a camera at the origin looking down -Z.
    #[must_use]
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Mat3::IDENTITY,
            fov: DEFAULT_FOV_DEGREES.to_radians(),
            aspect_ratio,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }

    /// Sets all projection parameters at once.
    pub fn set_perspective(&mut self, fov_degrees: f32, aspect_ratio: f32, near: f32, far: f32) {
        self.fov = fov_degrees.to_radians();
        self.aspect_ratio = aspect_ratio;
        self.near = near;
        self.far = far;
    }

    /// Sets rotation and position together.
    pub fn set_pose(&mut self, rotation: Mat3, position: Vec3) {
        self.rotation = rotation;
        self.position = position;
    }

    /// Applies an interpolated path pose.
    pub fn apply_pose(&mut self, pose: &InterpolatedPose) {
        self.set_pose(pose.rotation(), pose.position);
    }

    /// Returns the view matrix: `rotation * translate(-position)`.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_mat3(self.rotation) * Mat4::from_translation(-self.position)
    }

    /// Returns the projection matrix (depth range 0..1).
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    /// Returns the combined view-projection matrix.
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Returns the camera's forward direction in world space.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        -self.rotation.row(2)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_defaults() {
        let camera = Camera::default();
        assert!((camera.fov.to_degrees() - 45.0).abs() < 1e-4);
        assert_eq!(camera.near, DEFAULT_NEAR);
        assert_eq!(camera.far, DEFAULT_FAR);
        assert_eq!(camera.forward(), Vec3::NEG_Z);
    }

    #[test]
    fn test_apply_pose_matches_pose_view() {
        let pose = InterpolatedPose {
            frame: 3,
            position: Vec3::new(1.0, 2.0, 3.0),
            direction: Vec3::new(0.5, -0.2, -1.0).normalize(),
        };
        let mut camera = Camera::new(1.0);
        camera.apply_pose(&pose);
        assert!(camera.view_matrix().abs_diff_eq(pose.view_matrix(), 1e-6));
        assert!((camera.forward() - pose.direction).length() < 1e-5);
    }

    #[test]
    fn test_set_perspective() {
        let mut camera = Camera::new(1.0);
        camera.set_perspective(90.0, 2.0, 0.1, 10.0);
        assert!((camera.fov - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(camera.aspect_ratio, 2.0);
        let proj = camera.projection_matrix();
        assert!(proj.w_axis.z != 0.0);
    }
}
