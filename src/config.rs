/// Viewer configuration
///
/// Settings are stored as JSON in the user's config directory:
/// - Linux: ~/.config/lightfield-viewer/config.json
/// - macOS: ~/Library/Application Support/lightfield-viewer/config.json
/// - Windows: %APPDATA%\lightfield-viewer\config.json
///
/// A missing file means "use the defaults", which describe the reference
/// 17x17 data set captured at 300x300.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ViewerError};
use crate::field::CameraGrid;
use crate::state::params::ShaderParams;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    /// Number of cameras along X
    pub cams_x: u32,
    /// Number of cameras along Y
    pub cams_y: u32,
    /// Width every frame is resampled to
    pub res_x: u32,
    /// Height every frame is resampled to
    pub res_y: u32,
    /// Physical distance between neighbouring cameras
    pub camera_gap: f32,
    /// Directory holding `frame1.png` .. `frameN.png`
    pub frames_dir: PathBuf,
    /// Optional WGSL file replacing the built-in resampling shader
    pub shader_path: Option<PathBuf>,
    /// Initial aperture (squared camera radius, in grid cells)
    pub aperture: f32,
    /// Initial focus (UV shift per camera cell)
    pub focus: f32,
    /// Start in side-by-side stereo
    pub stereo_view: bool,
    /// Show the camera grid markers behind the plane
    pub show_points: bool,
    /// UDP address the gyroscope listener binds to
    pub orientation_addr: String,
    /// Width of the rendered preview (height follows the window aspect)
    pub preview_width: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            cams_x: 17,
            cams_y: 17,
            res_x: 300,
            res_y: 300,
            camera_gap: 0.08,
            frames_dir: PathBuf::from("./frames"),
            shader_path: None,
            aperture: 5.0,
            focus: 0.0,
            stereo_view: true,
            show_points: false,
            orientation_addr: "0.0.0.0:5555".to_string(),
            preview_width: 1280,
        }
    }
}

impl ViewerConfig {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("lightfield-viewer");
            path.push("config.json");
            path
        })
    }

    /// Load the config from an explicit path. The file must exist and parse.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ViewerError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ViewerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the config from the default location, falling back to defaults
    /// when the file is absent or unreadable.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            log::warn!("No config directory on this platform, using defaults");
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e}; using defaults");
                Self::default()
            }
        }
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let io_err = |source| ViewerError::ConfigIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| ViewerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)
    }

    /// The camera grid described by this config
    pub fn grid(&self) -> CameraGrid {
        CameraGrid {
            cams_x: self.cams_x,
            cams_y: self.cams_y,
            res_x: self.res_x,
            res_y: self.res_y,
            camera_gap: self.camera_gap,
            frames_dir: self.frames_dir.clone(),
        }
    }

    /// Initial shader parameters
    pub fn params(&self) -> ShaderParams {
        ShaderParams::new(self.aperture, self.focus, self.cams_x, self.cams_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_set() {
        let config = ViewerConfig::default();
        let grid = config.grid();

        assert_eq!(grid.frame_count(), 289);
        assert_eq!(grid.layer_bytes(), 300 * 300 * 4);
        assert_eq!(config.params().cam_array_size, [17.0, 17.0]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = ViewerConfig::default();
        config.cams_x = 8;
        config.shader_path = Some(PathBuf::from("custom.wgsl"));
        config.save_to(&path).unwrap();

        let restored = ViewerConfig::load_from(&path).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "cams_x": 4, "cams_y": 2 }"#).unwrap();

        let config = ViewerConfig::load_from(&path).unwrap();
        assert_eq!(config.cams_x, 4);
        assert_eq!(config.cams_y, 2);
        assert_eq!(config.res_x, 300);
        assert!(config.stereo_view);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = ViewerConfig::load_from(&path);
        assert!(matches!(result, Err(ViewerError::ConfigParse { .. })));
    }
}
