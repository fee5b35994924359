use clap::Parser;
use iced::widget::{
    button, canvas, checkbox, column, container, image, progress_bar, row, slider, stack, text, Column,
};
use iced::{event, time, window, Alignment, ContentFit, Element, Length, Size, Subscription, Task, Theme};
use rfd::FileDialog;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod camera;
mod config;
mod error;
mod field;
mod gpu;
mod loader;
mod sensor;
mod state;
mod ui;

use camera::OrientationReading;
use config::ViewerConfig;
use gpu::RenderRequest;
use loader::{LoadEvent, LoadedField};
use state::params::{APERTURE_RANGE, APERTURE_STEP, FOCUS_RANGE, FOCUS_STEP};
use state::{ControlMode, ViewerSession, ViewerState};

/// Width of the control panel next to the viewport
const PANEL_WIDTH: f32 = 280.0;

/// Initial window size
const WINDOW_SIZE: Size = Size::new(1280.0, 800.0);

/// Damping tick while the orbit camera settles
const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Interactive light-field refocus viewer
#[derive(Parser, Debug)]
#[command(name = "lightfield-viewer", version, about)]
struct Args {
    /// Directory holding frame1.png .. frameN.png
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// UDP address to receive device orientation on
    #[arg(long)]
    orientation_addr: Option<String>,
}

impl Args {
    /// Config file (explicit or default location) with CLI overrides applied
    fn resolve_config(&self) -> error::Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::load_from(path)?,
            None => ViewerConfig::load_or_default(),
        };
        if let Some(frames) = &self.frames {
            config.frames_dir = frames.clone();
        }
        if let Some(addr) = &self.orientation_addr {
            config.orientation_addr = addr.clone();
        }
        Ok(config)
    }
}

/// Main application state
struct LightFieldViewer {
    config: ViewerConfig,
    session: ViewerSession,
    /// Loaded field and its pipeline, once Ready
    scene: Option<LoadedField>,
    /// Last rendered frame
    frame: Option<image::Handle>,
    /// Viewport size in logical pixels
    viewport: Size,
    /// Where "Save Settings" writes the config
    config_path: Option<PathBuf>,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// User clicked "Choose Frames Folder"
    ChooseFolder,
    /// User clicked the load button
    Load,
    /// Progress or result from the background load
    Loader(LoadEvent),
    ApertureChanged(f32),
    FocusChanged(f32),
    PointsToggled(bool),
    ToggleViewMode,
    ToggleGyro,
    ToggleVr,
    /// Persist the current parameters and view flags
    SaveSettings,
    Orientation(OrientationReading),
    /// Orbit drag with the left button
    Rotate { dx: f32, dy: f32 },
    /// Orbit drag with the right button
    Pan { dx: f32, dy: f32 },
    /// Wheel lines, positive zooms in
    Zoom(f32),
    Tick,
    WindowResized(Size),
}

impl LightFieldViewer {
    fn new(config: ViewerConfig, config_path: Option<PathBuf>) -> (Self, Task<Message>) {
        let mut session = ViewerSession::new(&config);
        let viewport = viewport_size(WINDOW_SIZE);
        session.resize(viewport.width, viewport.height);

        log::info!(
            "Viewer initialized: {}x{} cameras at {}x{}, frames in {}",
            config.cams_x,
            config.cams_y,
            config.res_x,
            config.res_y,
            config.frames_dir.display()
        );

        let status = format!("Ready to load from {}", config.frames_dir.display());

        (
            LightFieldViewer {
                config,
                session,
                scene: None,
                frame: None,
                viewport,
                config_path,
                status,
            },
            Task::none(),
        )
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ChooseFolder => {
                let folder = FileDialog::new()
                    .set_title("Select Folder with Light Field Frames")
                    .set_directory(&self.config.frames_dir)
                    .pick_folder();

                if let Some(folder_path) = folder {
                    self.status = format!("Frames folder: {}", folder_path.display());
                    self.config.frames_dir = folder_path;
                }
                Task::none()
            }

            Message::Load => {
                if !self.session.begin_load() {
                    return Task::none();
                }
                let grid = self.config.grid();
                log::info!(
                    "Loading {} frames from {} ({} MB packed)",
                    grid.frame_count(),
                    grid.frames_dir.display(),
                    grid.field_bytes() / (1024 * 1024)
                );
                self.status = "Loading...".to_string();

                Task::run(
                    loader::load_light_field(grid, self.config.shader_path.clone()),
                    Message::Loader,
                )
            }

            Message::Loader(event) => {
                match event {
                    LoadEvent::Fetched(progress) => {
                        self.session.set_progress(progress.percent());
                    }
                    LoadEvent::Packed(progress) => {
                        self.status = format!("Uploaded chunk {}/{}", progress.chunk + 1, progress.chunks);
                    }
                    LoadEvent::Finished(Ok(scene)) => {
                        self.session.finish_load();
                        self.status = format!(
                            "Loaded {} views ({} MB)",
                            scene.field.layers(),
                            scene.field.len() / (1024 * 1024)
                        );
                        self.scene = Some(scene);
                        self.redraw();
                    }
                    LoadEvent::Finished(Err(e)) => {
                        self.status = format!("Load failed: {e}");
                        self.session.fail_load(e);
                    }
                }
                Task::none()
            }

            Message::ApertureChanged(aperture) => {
                self.session.set_aperture(aperture);
                log::debug!("aperture = {aperture}");
                self.redraw();
                Task::none()
            }

            Message::FocusChanged(focus) => {
                self.session.set_focus(focus);
                log::debug!("focus = {focus}");
                self.redraw();
                Task::none()
            }

            Message::PointsToggled(visible) => {
                self.session.points_visible = visible;
                self.redraw();
                Task::none()
            }

            Message::ToggleViewMode => {
                let label = self.session.toggle_view_mode();
                log::info!("View mode toggled, button now reads \"{label}\"");
                self.redraw();
                Task::none()
            }

            Message::ToggleGyro => {
                if self.session.toggle_gyro() == ControlMode::Gyro {
                    self.status = format!("Waiting for orientation on {}", self.config.orientation_addr);
                }
                self.redraw();
                Task::none()
            }

            Message::ToggleVr => {
                if self.session.xr_active() {
                    self.session.xr_session_end();
                } else if !self.session.xr_session_start() {
                    self.status = "VR is available once the light field is loaded".to_string();
                }
                self.redraw();
                Task::none()
            }

            Message::SaveSettings => {
                let Some(path) = self.config_path.clone() else {
                    self.status = "No config location on this platform".to_string();
                    return Task::none();
                };
                self.status = match self.save_settings(&path) {
                    Ok(()) => {
                        log::info!("Saved settings to {}", path.display());
                        format!("Saved settings to {}", path.display())
                    }
                    Err(e) => {
                        log::error!("{e}");
                        format!("Save failed: {e}")
                    }
                };
                Task::none()
            }

            Message::Orientation(reading) => {
                if self.session.handle_orientation(reading) {
                    self.redraw();
                }
                Task::none()
            }

            Message::Rotate { dx, dy } => {
                self.session.orbit.rotate_drag(dx, dy, self.viewport.height);
                self.step_orbit();
                Task::none()
            }

            Message::Pan { dx, dy } => {
                self.session.orbit.pan_drag(dx, dy, self.viewport.height);
                self.step_orbit();
                Task::none()
            }

            Message::Zoom(lines) => {
                self.session.orbit.zoom(lines);
                self.step_orbit();
                Task::none()
            }

            Message::Tick => {
                self.step_orbit();
                Task::none()
            }

            Message::WindowResized(size) => {
                self.viewport = viewport_size(size);
                self.session.resize(self.viewport.width, self.viewport.height);
                self.redraw();
                Task::none()
            }
        }
    }

    /// Write the session's parameters and view flags over the file's own
    /// values, leaving command-line overrides out of it
    fn save_settings(&self, path: &Path) -> error::Result<()> {
        let mut saved = if path.exists() {
            ViewerConfig::load_from(path)?
        } else {
            ViewerConfig::default()
        };
        saved.aperture = self.session.params.aperture;
        saved.focus = self.session.params.focus;
        saved.stereo_view = self.session.stereo_view();
        saved.show_points = self.session.points_visible;
        saved.save_to(path)
    }

    /// Advance the orbit controls and redraw if the camera moved
    fn step_orbit(&mut self) {
        if self.session.tick() {
            self.redraw();
        }
    }

    /// Output resolution: the viewport, capped at the preview width
    fn render_size(&self) -> (u32, u32) {
        let width = self.viewport.width.max(1.0);
        let height = self.viewport.height.max(1.0);
        let scale = (self.config.preview_width as f32 / width).min(1.0);
        ((width * scale).round() as u32, (height * scale).round() as u32)
    }

    /// Render the current session into the displayed frame
    fn redraw(&mut self) {
        if !self.session.is_ready() {
            return;
        }
        let Some(scene) = &self.scene else {
            return;
        };

        let (width, height) = self.render_size();
        let request = RenderRequest::from_session(&self.session, &scene.grid, width, height);

        match scene.pipeline.render_to_bytes(&request) {
            Ok(pixels) => {
                self.frame = Some(image::Handle::from_rgba(request.width, request.height, pixels));
            }
            Err(e) => {
                log::error!("Render failed: {e}");
                self.status = format!("Render failed: {e}");
            }
        }
    }

    fn view(&self) -> Element<Message> {
        let params = self.session.params;
        let ready = self.session.is_ready();

        let mut controls: Column<Message> = column![
            text("Light Field Viewer").size(24),
            button(text(self.session.load_label()))
                .on_press_maybe(self.session.load_enabled().then_some(Message::Load))
                .padding(10),
            button("Choose Frames Folder")
                .on_press_maybe(self.session.load_enabled().then_some(Message::ChooseFolder))
                .padding(10),
            text(format!("Aperture: {:.1}", params.aperture)).size(14),
            slider(APERTURE_RANGE, params.aperture, Message::ApertureChanged).step(APERTURE_STEP),
            text(format!("Focus: {:.4}", params.focus)).size(14),
            slider(FOCUS_RANGE, params.focus, Message::FocusChanged).step(FOCUS_STEP),
            checkbox("Show camera positions", self.session.points_visible).on_toggle(Message::PointsToggled),
            button(text(self.session.view_mode_label()))
                .on_press(Message::ToggleViewMode)
                .padding(10),
            button(text(match self.session.control_mode() {
                ControlMode::Orbit => "Use Gyroscope",
                ControlMode::Gyro => "Use Mouse Orbit",
            }))
            .on_press(Message::ToggleGyro)
            .padding(10),
            button(text(if self.session.xr_active() { "Exit VR" } else { "Enter VR" }))
                .on_press_maybe(ready.then_some(Message::ToggleVr))
                .padding(10),
            button("Save Settings").on_press(Message::SaveSettings).padding(10),
            text(&self.status).size(14),
        ]
        .spacing(12)
        .padding(20)
        .width(Length::Fixed(PANEL_WIDTH));

        if let ViewerState::Loading(percent) = self.session.state() {
            controls = controls.push(progress_bar(0.0..=100.0, f32::from(percent)).height(Length::Fixed(8.0)));
        }

        if let Some(error) = self.session.last_error() {
            controls = controls.push(text(format!("Last error: {error}")).size(12));
        }

        let viewport: Element<Message> = match &self.frame {
            Some(handle) => stack![
                image(handle.clone())
                    .width(Length::Fill)
                    .height(Length::Fill)
                    .content_fit(ContentFit::Fill),
                canvas(ui::OrbitOverlay).width(Length::Fill).height(Length::Fill),
            ]
            .into(),
            None => container(text("No light field loaded").size(16))
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .into(),
        };

        row![controls, viewport]
            .align_y(Alignment::Start)
            .height(Length::Fill)
            .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![event::listen_with(|event, _status, _id| match event {
            iced::Event::Window(window::Event::Resized(size)) => Some(Message::WindowResized(size)),
            _ => None,
        })];

        if self.session.orientation_listener_active() {
            let addr = self.config.orientation_addr.clone();
            subscriptions.push(
                Subscription::run_with_id(addr.clone(), sensor::listen(addr)).map(Message::Orientation),
            );
        }

        if self.session.is_ready()
            && self.session.control_mode() == ControlMode::Orbit
            && self.session.orbit.is_settling()
        {
            subscriptions.push(time::every(TICK_INTERVAL).map(|_| Message::Tick));
        }

        Subscription::batch(subscriptions)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Viewport area left of the control panel
fn viewport_size(window: Size) -> Size {
    Size::new((window.width - PANEL_WIDTH).max(1.0), window.height.max(1.0))
}

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("lightfield_viewer=info")).init();

    let args = Args::parse();
    let config_path = args.config.clone().or_else(ViewerConfig::default_path);
    let config = match args.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    iced::application("Light Field Viewer", LightFieldViewer::update, LightFieldViewer::view)
        .subscription(LightFieldViewer::subscription)
        .theme(LightFieldViewer::theme)
        .window_size(WINDOW_SIZE)
        .centered()
        .run_with(move || LightFieldViewer::new(config, config_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "frames_dir": "/data/lf", "cams_x": 9 }"#).unwrap();

        let args = Args::parse_from([
            "lightfield-viewer",
            "--config",
            path.to_str().unwrap(),
            "--orientation-addr",
            "127.0.0.1:9000",
        ]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.frames_dir, PathBuf::from("/data/lf"));
        assert_eq!(config.cams_x, 9);
        assert_eq!(config.orientation_addr, "127.0.0.1:9000");

        let args = Args::parse_from(["lightfield-viewer", "--config", path.to_str().unwrap(), "--frames", "other"]);
        assert_eq!(args.resolve_config().unwrap().frames_dir, PathBuf::from("other"));
    }

    #[test]
    fn test_explicit_bad_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let args = Args::parse_from(["lightfield-viewer", "--config", path.to_str().unwrap()]);
        assert!(args.resolve_config().is_err());
    }

    #[test]
    fn test_render_size_caps_at_preview_width() {
        let config = ViewerConfig {
            preview_width: 640,
            ..ViewerConfig::default()
        };
        let (mut viewer, _) = LightFieldViewer::new(config, None);

        viewer.viewport = Size::new(1280.0, 720.0);
        assert_eq!(viewer.render_size(), (640, 360));

        viewer.viewport = Size::new(500.0, 400.0);
        assert_eq!(viewer.render_size(), (500, 400));
    }

    #[test]
    fn test_save_settings_persists_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let (mut viewer, _) = LightFieldViewer::new(ViewerConfig::default(), Some(path.clone()));

        let _ = viewer.update(Message::ApertureChanged(2.5));
        let _ = viewer.update(Message::FocusChanged(-0.003));
        let _ = viewer.update(Message::ToggleViewMode);
        let _ = viewer.update(Message::SaveSettings);

        let saved = ViewerConfig::load_from(&path).unwrap();
        assert_eq!(saved.aperture, 2.5);
        assert_eq!(saved.focus, -0.003);
        assert!(!saved.stereo_view);
    }

    #[test]
    fn test_save_settings_keeps_cli_overrides_out_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "frames_dir": "/data/lf", "cams_x": 9 }"#).unwrap();

        let args = Args::parse_from([
            "lightfield-viewer",
            "--config",
            path.to_str().unwrap(),
            "--frames",
            "scratch",
            "--orientation-addr",
            "127.0.0.1:9000",
        ]);
        let config = args.resolve_config().unwrap();
        let (mut viewer, _) = LightFieldViewer::new(config, Some(path.clone()));

        let _ = viewer.update(Message::ApertureChanged(7.0));
        let _ = viewer.update(Message::PointsToggled(true));
        let _ = viewer.update(Message::SaveSettings);

        let saved = ViewerConfig::load_from(&path).unwrap();
        assert_eq!(saved.frames_dir, PathBuf::from("/data/lf"));
        assert_eq!(saved.orientation_addr, ViewerConfig::default().orientation_addr);
        assert_eq!(saved.cams_x, 9);
        assert_eq!(saved.aperture, 7.0);
        assert!(saved.show_points);
    }

    #[test]
    fn test_load_ignored_unless_idle() {
        let (mut viewer, _) = LightFieldViewer::new(ViewerConfig::default(), None);
        viewer.session.begin_load();
        let _ = viewer.update(Message::Load);
        assert!(!viewer.session.load_enabled());

        let _ = viewer.update(Message::Loader(LoadEvent::Finished(Err("frame 3 missing".into()))));
        assert!(viewer.session.load_enabled());
        assert_eq!(viewer.session.last_error(), Some("frame 3 missing"));
        assert!(viewer.status.contains("frame 3 missing"));
    }
}
