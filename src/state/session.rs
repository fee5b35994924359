/// Viewer session state
///
/// Everything the UI mutates lives here: the load phase, view-mode flags,
/// camera controllers, scene placement and the shader parameters. The
/// session is built when the app starts, mutated by UI events and dropped
/// with the app.
///
/// State machine:
///
/// ```text
/// Idle --load--> Loading(p) --done--> Ready-Mono / Ready-Stereo
///   ^                |                     |  ^
///   +----failed------+          toggle view |  | VR end
///                                           v  |
///                                   (VR start) Ready-VR
/// ```

use cgmath::{Point3, Vector3, Zero};

use crate::camera::{GyroControls, OrbitControls, OrientationReading, PerspectiveCamera};
use crate::config::ViewerConfig;
use crate::state::params::ShaderParams;

/// Plane position forced by a VR session start
pub const VR_PLANE_POSITION: Vector3<f32> = Vector3::new(0.0, 0.0, -2.0);
/// Marker position forced by a VR session start
pub const VR_POINTS_POSITION: Vector3<f32> = Vector3::new(0.0, 1.6, -2.01);
/// Markers sit just behind the plane
pub const POINTS_OFFSET: Vector3<f32> = Vector3::new(0.0, 0.0, -0.01);

/// Both cameras start here
pub const CAMERA_START: Point3<f32> = Point3::new(0.0, 0.0, 2.0);
/// Orbit target
pub const ORBIT_TARGET: Point3<f32> = Point3::new(0.0, 0.0, 1.0);

pub const SINGLE_VIEW_LABEL: &str = "Switch to Left/Right View";
pub const STEREO_VIEW_LABEL: &str = "Switch to Single View";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    Idle,
    Loading(u8),
    ReadyMono,
    ReadyStereo,
    ReadyVr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Mono,
    Stereo,
    Vr,
}

impl RenderMode {
    /// Mono draws one viewport, the other modes draw two side by side
    pub fn is_split(&self) -> bool {
        !matches!(self, RenderMode::Mono)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Orbit,
    Gyro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPhase {
    Idle,
    Loading(u8),
    Ready,
}

#[derive(Debug)]
pub struct ViewerSession {
    phase: LoadPhase,
    stereo_view: bool,
    xr_active: bool,
    control_mode: ControlMode,
    last_error: Option<String>,
    pub params: ShaderParams,
    pub points_visible: bool,
    pub plane_position: Vector3<f32>,
    pub points_position: Vector3<f32>,
    /// World offset applied to the plane and markers: the origin of the XR
    /// reference space. Nothing on the desktop moves it yet; a headset
    /// runtime recentring the scene would, and ending VR puts it back.
    pub scene_origin: Vector3<f32>,
    pub camera: PerspectiveCamera,
    pub gyro_camera: PerspectiveCamera,
    pub orbit: OrbitControls,
    pub gyro: GyroControls,
}

impl ViewerSession {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            phase: LoadPhase::Idle,
            stereo_view: config.stereo_view,
            xr_active: false,
            control_mode: ControlMode::Orbit,
            last_error: None,
            params: config.params(),
            points_visible: config.show_points,
            plane_position: Vector3::zero(),
            points_position: POINTS_OFFSET,
            scene_origin: Vector3::zero(),
            camera: PerspectiveCamera::new(CAMERA_START, 1.0),
            gyro_camera: PerspectiveCamera::new(CAMERA_START, 1.0),
            orbit: OrbitControls::new(CAMERA_START, ORBIT_TARGET),
            gyro: GyroControls::new(),
        }
    }

    pub fn state(&self) -> ViewerState {
        match self.phase {
            LoadPhase::Idle => ViewerState::Idle,
            LoadPhase::Loading(percent) => ViewerState::Loading(percent),
            LoadPhase::Ready => match self.render_mode() {
                RenderMode::Mono => ViewerState::ReadyMono,
                RenderMode::Stereo => ViewerState::ReadyStereo,
                RenderMode::Vr => ViewerState::ReadyVr,
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase == LoadPhase::Ready
    }

    // ========== Loading ==========

    /// Enter Loading. Refused unless Idle, so a load can't be started twice.
    pub fn begin_load(&mut self) -> bool {
        if self.phase != LoadPhase::Idle {
            return false;
        }
        self.phase = LoadPhase::Loading(0);
        self.last_error = None;
        true
    }

    pub fn set_progress(&mut self, percent: u8) {
        if let LoadPhase::Loading(_) = self.phase {
            self.phase = LoadPhase::Loading(percent.min(100));
        }
    }

    pub fn finish_load(&mut self) {
        if let LoadPhase::Loading(_) = self.phase {
            self.phase = LoadPhase::Ready;
        }
    }

    /// Drop back to Idle so the user can retry
    pub fn fail_load(&mut self, error: String) {
        self.phase = LoadPhase::Idle;
        self.last_error = Some(error);
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn load_enabled(&self) -> bool {
        self.phase == LoadPhase::Idle
    }

    pub fn load_label(&self) -> String {
        match self.phase {
            LoadPhase::Idle => "Load Light Field".to_string(),
            LoadPhase::Loading(percent) => format!("Loaded {percent}%"),
            LoadPhase::Ready => "Loaded".to_string(),
        }
    }

    // ========== View mode ==========

    /// Flip mono/stereo and return the new button label
    pub fn toggle_view_mode(&mut self) -> &'static str {
        self.stereo_view = !self.stereo_view;
        self.view_mode_label()
    }

    /// Whether the non-VR view is side-by-side
    pub fn stereo_view(&self) -> bool {
        self.stereo_view
    }

    pub fn view_mode_label(&self) -> &'static str {
        if self.stereo_view {
            STEREO_VIEW_LABEL
        } else {
            SINGLE_VIEW_LABEL
        }
    }

    pub fn render_mode(&self) -> RenderMode {
        if self.xr_active {
            RenderMode::Vr
        } else if self.stereo_view {
            RenderMode::Stereo
        } else {
            RenderMode::Mono
        }
    }

    // ========== Camera control ==========

    pub fn control_mode(&self) -> ControlMode {
        self.control_mode
    }

    /// The orientation listener only exists in gyroscope mode
    pub fn orientation_listener_active(&self) -> bool {
        self.control_mode == ControlMode::Gyro
    }

    pub fn toggle_gyro(&mut self) -> ControlMode {
        match self.control_mode {
            ControlMode::Orbit => self.enter_gyro(),
            ControlMode::Gyro => self.leave_gyro(),
        }
        self.control_mode
    }

    fn enter_gyro(&mut self) {
        self.control_mode = ControlMode::Gyro;
        self.orbit.enabled = false;
        self.gyro.reset();
        log::info!("Gyroscope mode on");
    }

    fn leave_gyro(&mut self) {
        self.control_mode = ControlMode::Orbit;
        self.orbit.enabled = true;
        self.gyro.reset();
        log::info!("Gyroscope mode off");
    }

    /// Apply an orientation reading. Ignored outside gyroscope mode.
    pub fn handle_orientation(&mut self, reading: OrientationReading) -> bool {
        if !self.orientation_listener_active() {
            return false;
        }
        self.gyro.handle(reading, &mut self.gyro_camera);
        true
    }

    /// Advance orbit damping by one frame. Returns true if the camera moved.
    pub fn tick(&mut self) -> bool {
        if self.control_mode != ControlMode::Orbit {
            return false;
        }
        self.orbit.update(&mut self.camera)
    }

    pub fn active_camera(&self) -> &PerspectiveCamera {
        match self.control_mode {
            ControlMode::Orbit => &self.camera,
            ControlMode::Gyro => &self.gyro_camera,
        }
    }

    /// Keep both cameras' aspect in step with the viewport
    pub fn resize(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            let aspect = width / height;
            self.camera.set_aspect(aspect);
            self.gyro_camera.set_aspect(aspect);
        }
    }

    // ========== VR session ==========

    pub fn xr_active(&self) -> bool {
        self.xr_active
    }

    /// Start a VR session: gyroscope camera plus a fixed scene placement.
    /// Only possible once the field is loaded.
    pub fn xr_session_start(&mut self) -> bool {
        if !self.is_ready() || self.xr_active {
            return false;
        }
        self.xr_active = true;
        if self.control_mode != ControlMode::Gyro {
            self.enter_gyro();
        }

        self.plane_position = VR_PLANE_POSITION;
        self.points_position = VR_POINTS_POSITION;
        log::info!(
            "VR session started, plane at {:?}, markers at {:?}",
            self.plane_position,
            self.points_position
        );
        true
    }

    pub fn xr_session_end(&mut self) {
        if !self.xr_active {
            return;
        }
        self.xr_active = false;
        self.scene_origin = Vector3::zero();
        log::info!("VR session ended");
    }

    // ========== Parameters ==========

    pub fn set_aperture(&mut self, aperture: f32) {
        self.params.set_aperture(aperture);
    }

    pub fn set_focus(&mut self, focus: f32) {
        self.params.set_focus(focus);
    }
}
