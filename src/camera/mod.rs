/// Cameras for viewing the refocus plane
///
/// - `orbit.rs` - mouse-driven orbit controls with damping
/// - `orientation.rs` - gyroscope controls fed by device orientation readings
///
/// Both controllers drive a `PerspectiveCamera`, which stores a position and
/// an orientation quaternion (the camera looks down its local -Z).

pub mod orbit;
pub mod orientation;

pub use orbit::OrbitControls;
pub use orientation::{GyroControls, OrientationReading};

use cgmath::{
    perspective, Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Quaternion, Rotation, Vector3,
};

/// Vertical field of view in degrees
pub const FOV_Y: f32 = 45.0;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 100.0;

/// cgmath produces OpenGL clip space (z in -1..1); wgpu wants z in 0..1
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Point3<f32>,
    pub orientation: Quaternion<f32>,
    pub aspect: f32,
}

impl PerspectiveCamera {
    /// Camera at `position` looking down -Z
    pub fn new(position: Point3<f32>, aspect: f32) -> Self {
        Self {
            position,
            orientation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            aspect,
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    /// Camera-space +X in world space
    pub fn right(&self) -> Vector3<f32> {
        self.orientation.rotate_vector(Vector3::unit_x())
    }

    /// Camera-space +Y in world space
    pub fn up(&self) -> Vector3<f32> {
        self.orientation.rotate_vector(Vector3::unit_y())
    }

    /// World-to-camera transform
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::from(self.orientation.conjugate()) * Matrix4::from_translation(-self.position.to_vec())
    }

    /// Camera-to-clip transform in wgpu clip space
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(Deg(FOV_Y), self.aspect, NEAR, FAR)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Copy of this camera shifted sideways by `offset` (negative = left)
    pub fn shifted(&self, offset: f32) -> Self {
        let right = self.right().normalize();
        Self {
            position: self.position + right * offset,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Rotation3, Rad, Transform};

    impl PerspectiveCamera {
        /// Unit vector the camera looks along
        pub(crate) fn forward(&self) -> Vector3<f32> {
            self.orientation.rotate_vector(-Vector3::unit_z())
        }
    }

    #[test]
    fn test_default_camera_looks_down_negative_z() {
        let camera = PerspectiveCamera::new(Point3::new(0.0, 0.0, 2.0), 1.0);
        let forward = camera.forward();
        assert!((forward - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-6);
    }

    #[test]
    fn test_view_matrix_moves_eye_to_origin() {
        let mut camera = PerspectiveCamera::new(Point3::new(1.0, 2.0, 3.0), 1.0);
        camera.orientation = Quaternion::from_angle_y(Rad(0.7));

        let eye = camera.view_matrix().transform_point(camera.position);
        assert!(eye.to_vec().magnitude() < 1e-5);
    }

    #[test]
    fn test_shifted_moves_along_right_axis() {
        let camera = PerspectiveCamera::new(Point3::new(0.0, 0.0, 2.0), 1.0);
        let left = camera.shifted(-0.032);
        assert!((left.position.x + 0.032).abs() < 1e-6);
        assert_eq!(left.orientation, camera.orientation);
    }

    #[test]
    fn test_invalid_aspect_ignored() {
        let mut camera = PerspectiveCamera::new(Point3::new(0.0, 0.0, 2.0), 1.5);
        camera.set_aspect(0.0);
        camera.set_aspect(f32::NAN);
        assert_eq!(camera.aspect, 1.5);
    }
}
