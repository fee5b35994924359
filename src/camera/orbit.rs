/// Orbit controls: rotate around a target with the mouse
///
/// Drag input accumulates into pending deltas. Each `update` applies a
/// fraction of the pending motion (the damping factor) and decays the rest,
/// so the camera glides to a stop over several frames. `update` reports
/// whether anything moved so the caller knows to keep ticking.

use cgmath::{InnerSpace, Point3, Quaternion, Rad, Rotation3, Vector3, Zero};
use std::f32::consts::PI;

use super::{PerspectiveCamera, FOV_Y};

/// Motion below this is treated as settled
const EPSILON: f32 = 1e-6;

/// Polar angle stays this far from the poles
const POLE_MARGIN: f32 = 1e-4;

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub enabled: bool,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Azimuth around +Y, 0 = camera on +Z of the target
    theta: f32,
    /// Polar angle from +Y
    phi: f32,
    radius: f32,
    theta_delta: f32,
    phi_delta: f32,
    scale: f32,
    pan_offset: Vector3<f32>,
}

impl OrbitControls {
    /// Orbit controls for a camera at `eye` looking at `target`
    pub fn new(eye: Point3<f32>, target: Point3<f32>) -> Self {
        let offset = eye - target;
        let radius = offset.magnitude().max(EPSILON);
        let theta = offset.x.atan2(offset.z);
        let phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        Self {
            target,
            enabled: true,
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            pan_speed: 2.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            theta,
            phi,
            radius,
            theta_delta: 0.0,
            phi_delta: 0.0,
            scale: 1.0,
            pan_offset: Vector3::zero(),
        }
    }

    /// Current eye position
    pub fn eye(&self) -> Point3<f32> {
        let sin_phi = self.phi.sin();
        self.target
            + Vector3::new(
                self.radius * sin_phi * self.theta.sin(),
                self.radius * self.phi.cos(),
                self.radius * sin_phi * self.theta.cos(),
            )
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    /// Orientation that makes the camera look from the eye at the target
    pub fn orientation(&self) -> Quaternion<f32> {
        let elevation = PI / 2.0 - self.phi;
        Quaternion::from_angle_y(Rad(self.theta)) * Quaternion::from_angle_x(Rad(-elevation))
    }

    /// Left-drag by a pixel delta in a viewport `height` pixels tall
    pub fn rotate_drag(&mut self, dx: f32, dy: f32, height: f32) {
        if !self.enabled || height <= 0.0 {
            return;
        }
        self.theta_delta -= 2.0 * PI * dx / height * self.rotate_speed;
        self.phi_delta -= 2.0 * PI * dy / height * self.rotate_speed;
    }

    /// Right-drag by a pixel delta in a viewport `height` pixels tall
    pub fn pan_drag(&mut self, dx: f32, dy: f32, height: f32) {
        if !self.enabled || height <= 0.0 {
            return;
        }
        // World units covered by one pixel at the target's depth
        let target_distance = self.radius * (FOV_Y.to_radians() / 2.0).tan();
        let per_pixel = 2.0 * target_distance / height * self.pan_speed;

        let orientation = self.orientation();
        let right = orientation * Vector3::unit_x();
        let up = orientation * Vector3::unit_y();
        self.pan_offset += -right * (dx * per_pixel) + up * (dy * per_pixel);
    }

    /// Wheel zoom; positive `lines` moves closer
    pub fn zoom(&mut self, lines: f32) {
        if !self.enabled || lines == 0.0 {
            return;
        }
        let step = 0.95f32.powf(self.zoom_speed * lines.abs());
        if lines > 0.0 {
            self.scale *= step;
        } else {
            self.scale /= step;
        }
    }

    /// Whether pending motion remains
    pub fn is_settling(&self) -> bool {
        self.theta_delta.abs() > EPSILON
            || self.phi_delta.abs() > EPSILON
            || self.pan_offset.magnitude() > EPSILON
            || (self.scale - 1.0).abs() > EPSILON
    }

    /// Apply pending motion to the camera. Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        if !self.enabled {
            return false;
        }
        let moved = self.is_settling();

        let factor = if self.enable_damping { self.damping_factor } else { 1.0 };

        self.theta += self.theta_delta * factor;
        self.phi = (self.phi + self.phi_delta * factor).clamp(POLE_MARGIN, PI - POLE_MARGIN);
        self.radius = (self.radius * self.scale).clamp(self.min_distance.max(EPSILON), self.max_distance);
        self.target += self.pan_offset * factor;

        if self.enable_damping {
            self.theta_delta *= 1.0 - self.damping_factor;
            self.phi_delta *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.theta_delta = 0.0;
            self.phi_delta = 0.0;
            self.pan_offset = Vector3::zero();
        }
        self.scale = 1.0;

        camera.position = self.eye();
        camera.orientation = self.orientation();
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controls() -> (OrbitControls, PerspectiveCamera) {
        let eye = Point3::new(0.0, 0.0, 2.0);
        (
            OrbitControls::new(eye, Point3::new(0.0, 0.0, 1.0)),
            PerspectiveCamera::new(eye, 1.0),
        )
    }

    #[test]
    fn test_initial_pose_matches_camera() {
        let (mut orbit, mut camera) = controls();
        assert!((orbit.distance() - 1.0).abs() < 1e-6);

        orbit.update(&mut camera);
        assert!((camera.position - Point3::new(0.0, 0.0, 2.0)).magnitude() < 1e-5);
        assert!((camera.forward() - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-5);
    }

    #[test]
    fn test_camera_keeps_looking_at_target() {
        let (mut orbit, mut camera) = controls();
        orbit.enable_damping = false;
        orbit.rotate_drag(120.0, -40.0, 600.0);
        orbit.update(&mut camera);

        let to_target = (orbit.target - camera.position).normalize();
        assert!((camera.forward() - to_target).magnitude() < 1e-4);
        assert!(((orbit.eye() - orbit.target).magnitude() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_damping_settles() {
        let (mut orbit, mut camera) = controls();
        orbit.rotate_drag(300.0, 0.0, 600.0);

        let mut frames = 0;
        while orbit.update(&mut camera) {
            frames += 1;
            assert!(frames < 2000, "orbit never settled");
        }
        assert!(frames > 1);
        assert!(!orbit.is_settling());

        // Damped motion converges to the undamped total
        let total = -2.0 * PI * 300.0 / 600.0;
        assert!((orbit.theta - total).abs() < 1e-3);
    }

    #[test]
    fn test_disabled_controls_ignore_input() {
        let (mut orbit, mut camera) = controls();
        orbit.enabled = false;
        orbit.rotate_drag(100.0, 100.0, 600.0);
        orbit.zoom(3.0);

        assert!(!orbit.update(&mut camera));
        assert_eq!(camera.position, Point3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_zoom_in_and_pan() {
        let (mut orbit, mut camera) = controls();
        orbit.enable_damping = false;

        orbit.zoom(1.0);
        orbit.update(&mut camera);
        assert!(orbit.distance() < 1.0);

        orbit.pan_drag(-50.0, 0.0, 600.0);
        orbit.update(&mut camera);
        assert!(orbit.target.x > 0.0);
    }
}
