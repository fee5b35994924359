/// Gyroscope camera control from device orientation readings
///
/// Readings are alpha/beta/gamma in degrees, the way phone motion sensors
/// report them. The first reading after the controls are (re)armed becomes
/// the baseline, and the camera rotates by the offset from that baseline,
/// so whatever pose the device was in at mode entry looks straight ahead.

use cgmath::{Quaternion, Rad, Rotation3};

use super::PerspectiveCamera;

/// Raw sensor reading in degrees; absent axes are `None`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationReading {
    pub alpha: Option<f32>,
    pub beta: Option<f32>,
    pub gamma: Option<f32>,
}

/// Orientation in radians
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,
}

impl From<OrientationReading> for Orientation {
    fn from(reading: OrientationReading) -> Self {
        // Missing or non-numeric axes read as zero
        let radians = |degrees: Option<f32>| {
            degrees
                .filter(|d| d.is_finite())
                .map_or(0.0, f32::to_radians)
        };
        Self {
            alpha: radians(reading.alpha),
            beta: radians(reading.beta),
            gamma: radians(reading.gamma),
        }
    }
}

impl Orientation {
    fn offset_from(&self, baseline: &Orientation) -> Orientation {
        Orientation {
            alpha: self.alpha - baseline.alpha,
            beta: self.beta - baseline.beta,
            gamma: self.gamma - baseline.gamma,
        }
    }

    /// Euler(beta, alpha, -gamma) applied in YXZ order
    pub fn to_quaternion(&self) -> Quaternion<f32> {
        Quaternion::from_angle_y(Rad(self.alpha))
            * Quaternion::from_angle_x(Rad(self.beta))
            * Quaternion::from_angle_z(Rad(-self.gamma))
    }
}

#[derive(Debug, Clone, Default)]
pub struct GyroControls {
    baseline: Option<Orientation>,
}

impl GyroControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> Option<Orientation> {
        self.baseline
    }

    /// Forget the baseline; the next reading becomes the new zero
    pub fn reset(&mut self) {
        self.baseline = None;
    }

    /// Orient the camera from a reading
    pub fn handle(&mut self, reading: OrientationReading, camera: &mut PerspectiveCamera) {
        let current = Orientation::from(reading);
        let baseline = *self.baseline.get_or_insert(current);

        camera.orientation = current.offset_from(&baseline).to_quaternion();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Point3, Vector3};

    fn reading(alpha: f32, beta: f32, gamma: f32) -> OrientationReading {
        OrientationReading {
            alpha: Some(alpha),
            beta: Some(beta),
            gamma: Some(gamma),
        }
    }

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(Point3::new(0.0, 0.0, 2.0), 1.0)
    }

    #[test]
    fn test_missing_axes_read_as_zero() {
        let orientation = Orientation::from(OrientationReading {
            alpha: None,
            beta: Some(90.0),
            gamma: Some(f32::NAN),
        });
        assert_eq!(orientation.alpha, 0.0);
        assert!((orientation.beta - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(orientation.gamma, 0.0);
    }

    #[test]
    fn test_first_reading_is_baseline() {
        let mut gyro = GyroControls::new();
        let mut camera = camera();
        camera.orientation = Quaternion::from_angle_y(Rad(1.0));

        gyro.handle(reading(30.0, 60.0, -10.0), &mut camera);

        // Baseline reading maps to looking straight ahead
        assert!((camera.forward() - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-5);
        assert!(gyro.baseline().is_some());
    }

    #[test]
    fn test_rotation_is_relative_to_baseline() {
        let mut gyro = GyroControls::new();
        let mut camera = camera();

        gyro.handle(reading(10.0, 0.0, 0.0), &mut camera);
        gyro.handle(reading(100.0, 0.0, 0.0), &mut camera);

        // +90 degrees of alpha turns the view to the left (-X)
        assert!((camera.forward() - Vector3::new(-1.0, 0.0, 0.0)).magnitude() < 1e-5);
    }

    #[test]
    fn test_reset_rearms_baseline() {
        let mut gyro = GyroControls::new();
        let mut camera = camera();

        gyro.handle(reading(10.0, 20.0, 30.0), &mut camera);
        gyro.reset();
        assert!(gyro.baseline().is_none());

        gyro.handle(reading(50.0, 50.0, 50.0), &mut camera);
        assert!((camera.forward() - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-5);
    }
}
