/// Per-frame render description
///
/// A `RenderRequest` is a snapshot of everything the GPU needs for one
/// frame: output size, whether to draw markers, and one `EyeView` per
/// viewport. Mono rendering uses a single full-size viewport; stereo and VR
/// split the output into left and right halves with the eyes
/// `EYE_SEPARATION` apart.

use cgmath::{EuclideanSpace, Matrix4, Point3, Vector3};

use crate::camera::PerspectiveCamera;
use crate::field::CameraGrid;
use crate::state::{ShaderParams, ViewerSession};

/// Distance between the left and right eye in world units
pub const EYE_SEPARATION: f32 = 0.064;

/// Marker colour (#eeccff)
pub const MARKER_COLOR: [f32; 4] = [0xee as f32 / 255.0, 0xcc as f32 / 255.0, 1.0, 1.0];

/// Marker radius in world units
pub const MARKER_RADIUS: f32 = 0.005;

/// Largest output dimension requested from the GPU
pub const MAX_OUTPUT_DIMENSION: u32 = 2048;

#[derive(Debug, Clone)]
pub struct EyeView {
    /// Viewport `(x, y, width, height)` in output pixels
    pub viewport: (f32, f32, f32, f32),
    pub view_proj: Matrix4<f32>,
    pub plane_model: Matrix4<f32>,
    pub points_model: Matrix4<f32>,
    pub eye_local: Vector3<f32>,
    pub plane_size: [f32; 2],
    pub markers_size: [f32; 2],
    pub params: ShaderParams,
    pub marker_color: [f32; 4],
    pub marker_radius: f32,
}

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub width: u32,
    pub height: u32,
    pub show_points: bool,
    pub eyes: Vec<EyeView>,
}

impl RenderRequest {
    /// Describe the current session as seen through its active camera
    pub fn from_session(session: &ViewerSession, grid: &CameraGrid, width: u32, height: u32) -> Self {
        let width = width.clamp(1, MAX_OUTPUT_DIMENSION);
        let height = height.clamp(1, MAX_OUTPUT_DIMENSION);

        let plane_origin = session.scene_origin + session.plane_position;
        let points_origin = session.scene_origin + session.points_position;
        let plane_model = Matrix4::from_translation(plane_origin);
        let points_model = Matrix4::from_translation(points_origin);

        let eye_view = |camera: PerspectiveCamera, viewport: (f32, f32, f32, f32)| EyeView {
            viewport,
            view_proj: camera.view_projection(),
            plane_model,
            points_model,
            eye_local: camera.position - Point3::from_vec(plane_origin),
            plane_size: grid.plane_size(),
            markers_size: grid.markers_size(),
            params: session.params,
            marker_color: MARKER_COLOR,
            marker_radius: MARKER_RADIUS,
        };

        let mut camera = *session.active_camera();
        let (w, h) = (width as f32, height as f32);

        let eyes = if session.render_mode().is_split() {
            let half = w / 2.0;
            camera.set_aspect(half / h);
            vec![
                eye_view(camera.shifted(-EYE_SEPARATION / 2.0), (0.0, 0.0, half, h)),
                eye_view(camera.shifted(EYE_SEPARATION / 2.0), (half, 0.0, half, h)),
            ]
        } else {
            camera.set_aspect(w / h);
            vec![eye_view(camera, (0.0, 0.0, w, h))]
        };

        Self {
            width,
            height,
            show_points: session.points_visible,
            eyes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use crate::state::session::VR_PLANE_POSITION;
    use cgmath::InnerSpace;

    /// World-space eye position (plane origin + local offset)
    fn eye_world(eye: &EyeView) -> Vector3<f32> {
        eye.plane_model.w.truncate() + eye.eye_local
    }

    fn ready_session() -> (ViewerSession, CameraGrid) {
        let config = ViewerConfig::default();
        let mut session = ViewerSession::new(&config);
        session.begin_load();
        session.finish_load();
        (session, config.grid())
    }

    #[test]
    fn test_mono_uses_one_full_viewport() {
        let (mut session, grid) = ready_session();
        session.toggle_view_mode();

        let request = RenderRequest::from_session(&session, &grid, 800, 600);
        assert_eq!(request.eyes.len(), 1);
        assert_eq!(request.eyes[0].viewport, (0.0, 0.0, 800.0, 600.0));
    }

    #[test]
    fn test_stereo_splits_viewports_and_eyes() {
        let (session, grid) = ready_session();

        let request = RenderRequest::from_session(&session, &grid, 800, 600);
        assert_eq!(request.eyes.len(), 2);
        assert_eq!(request.eyes[0].viewport, (0.0, 0.0, 400.0, 600.0));
        assert_eq!(request.eyes[1].viewport, (400.0, 0.0, 400.0, 600.0));

        let left = eye_world(&request.eyes[0]);
        let right = eye_world(&request.eyes[1]);
        assert!((right.x - left.x - EYE_SEPARATION).abs() < 1e-5);
    }

    #[test]
    fn test_eye_is_relative_to_plane() {
        let (mut session, grid) = ready_session();
        session.xr_session_start();

        let request = RenderRequest::from_session(&session, &grid, 640, 480);
        let eye = &request.eyes[0];
        // Gyro camera at z = 2, plane moved to z = -2
        assert!((eye.eye_local.z - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_scene_origin_moves_plane_and_markers() {
        let (mut session, grid) = ready_session();
        session.scene_origin = Vector3::new(0.5, 0.0, -1.0);

        let request = RenderRequest::from_session(&session, &grid, 640, 480);
        let eye = &request.eyes[0];
        assert_eq!(eye.plane_model.w.truncate(), Vector3::new(0.5, 0.0, -1.0));
        let points = eye.points_model.w.truncate();
        assert!((points - Vector3::new(0.5, 0.0, -1.01)).magnitude() < 1e-6);

        session.xr_session_start();
        session.xr_session_end();
        let request = RenderRequest::from_session(&session, &grid, 640, 480);
        assert_eq!(request.eyes[0].plane_model.w.truncate(), VR_PLANE_POSITION);
    }

    #[test]
    fn test_request_carries_parameters() {
        let (mut session, grid) = ready_session();
        session.set_aperture(7.5);
        session.set_focus(0.004);
        session.points_visible = true;

        let request = RenderRequest::from_session(&session, &grid, 0, 99999);
        assert_eq!((request.width, request.height), (1, MAX_OUTPUT_DIMENSION));
        assert!(request.show_points);
        assert!(request.eyes.iter().all(|e| e.params.aperture == 7.5 && e.params.focus == 0.004));
    }
}
