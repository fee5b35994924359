/// Shader parameters for light-field resampling
///
/// These are the values the resampling shader reads every frame. They are
/// plain scalars: slider input writes them directly and nothing clamps
/// them, so an out-of-range value reaches the shader unchanged.

use serde::{Deserialize, Serialize};

/// Aperture slider domain
pub const APERTURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=10.0;
pub const APERTURE_STEP: f32 = 0.1;

/// Focus slider domain
pub const FOCUS_RANGE: std::ops::RangeInclusive<f32> = -0.01..=0.01;
pub const FOCUS_STEP: f32 = 0.0001;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ShaderParams {
    /// Squared radius (in grid cells) of the synthetic aperture.
    /// - 0.0 = only the nearest camera contributes (pinhole)
    /// - larger values blend more cameras (shallower depth of field)
    pub aperture: f32,

    /// UV shift per grid cell of camera distance.
    /// Selects which depth is in focus; 0.0 focuses at infinity.
    pub focus: f32,

    /// Camera grid dimensions `(cams_x, cams_y)`
    pub cam_array_size: [f32; 2],
}

impl Default for ShaderParams {
    fn default() -> Self {
        Self::new(5.0, 0.0, 17, 17)
    }
}

impl ShaderParams {
    pub fn new(aperture: f32, focus: f32, cams_x: u32, cams_y: u32) -> Self {
        Self {
            aperture,
            focus,
            cam_array_size: [cams_x as f32, cams_y as f32],
        }
    }

    pub fn set_aperture(&mut self, aperture: f32) {
        self.aperture = aperture;
    }

    pub fn set_focus(&mut self, focus: f32) {
        self.focus = focus;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slider_bounds_pass_through_exactly() {
        let mut params = ShaderParams::default();

        params.set_aperture(*APERTURE_RANGE.start());
        assert_eq!(params.aperture, 0.0);
        params.set_aperture(*APERTURE_RANGE.end());
        assert_eq!(params.aperture, 10.0);

        params.set_focus(*FOCUS_RANGE.start());
        assert_eq!(params.focus, -0.01);
        params.set_focus(*FOCUS_RANGE.end());
        assert_eq!(params.focus, 0.01);
    }

    #[test]
    fn test_out_of_domain_values_not_clamped() {
        let mut params = ShaderParams::default();
        params.set_aperture(-3.5);
        params.set_focus(42.0);

        assert_eq!(params.aperture, -3.5);
        assert_eq!(params.focus, 42.0);
    }

    #[test]
    fn test_serialization() {
        let mut params = ShaderParams::new(2.5, 0.003, 8, 4);
        params.set_focus(-0.002);

        let json = serde_json::to_string(&params).unwrap();
        let restored: ShaderParams = serde_json::from_str(&json).unwrap();

        assert_eq!(params, restored);
        assert_eq!(restored.cam_array_size, [8.0, 4.0]);
    }
}
