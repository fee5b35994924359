/// Camera grid layout of a light-field capture
///
/// Frames are numbered 1..=N on disk (`frame1.png`, `frame2.png`, ...) and
/// laid out row-major: frame `i` sits at column `(i - 1) % cams_x`, row
/// `(i - 1) / cams_x`. Texture layers are zero-based, so frame `i` is layer
/// `i - 1`.

use std::path::PathBuf;

use crate::error::{Result, ViewerError};

#[derive(Debug, Clone, PartialEq)]
pub struct CameraGrid {
    pub cams_x: u32,
    pub cams_y: u32,
    pub res_x: u32,
    pub res_y: u32,
    pub camera_gap: f32,
    pub frames_dir: PathBuf,
}

impl CameraGrid {
    /// Reject grids that would produce an empty field
    pub fn validate(&self) -> Result<()> {
        if self.cams_x == 0 || self.cams_y == 0 || self.res_x == 0 || self.res_y == 0 {
            return Err(ViewerError::EmptyGrid {
                cams_x: self.cams_x,
                cams_y: self.cams_y,
                res_x: self.res_x,
                res_y: self.res_y,
            });
        }
        Ok(())
    }

    /// Total number of frames (N = cams_x * cams_y)
    pub fn frame_count(&self) -> usize {
        self.cams_x as usize * self.cams_y as usize
    }

    /// Size of one RGBA8 layer in bytes
    pub fn layer_bytes(&self) -> usize {
        self.res_x as usize * self.res_y as usize * 4
    }

    /// Size of the whole packed field in bytes
    pub fn field_bytes(&self) -> usize {
        self.layer_bytes() * self.frame_count()
    }

    /// Path of frame `index` (1-based)
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.frames_dir.join(format!("frame{index}.png"))
    }

    /// Size of the refocus plane in world units
    pub fn plane_size(&self) -> [f32; 2] {
        [
            self.cams_x as f32 * self.camera_gap * 4.0,
            self.cams_y as f32 * self.camera_gap * 4.0,
        ]
    }

    /// Extent covered by the camera marker grid
    pub fn markers_size(&self) -> [f32; 2] {
        [
            self.cams_x as f32 * self.camera_gap * 2.0,
            self.cams_y as f32 * self.camera_gap * 2.0,
        ]
    }

    /// Markers sit on the vertices of a `cams_x x cams_y` cell lattice
    pub fn marker_count(&self) -> u32 {
        (self.cams_x + 1) * (self.cams_y + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cams_x: u32, cams_y: u32) -> CameraGrid {
        CameraGrid {
            cams_x,
            cams_y,
            res_x: 4,
            res_y: 3,
            camera_gap: 0.08,
            frames_dir: PathBuf::from("frames"),
        }
    }

    #[test]
    fn test_frame_paths_are_one_based() {
        let grid = grid(2, 2);
        assert_eq!(grid.frame_path(1), PathBuf::from("frames").join("frame1.png"));
        assert_eq!(grid.frame_path(4), PathBuf::from("frames").join("frame4.png"));
    }

    #[test]
    fn test_sizes() {
        let grid = grid(3, 2);
        assert_eq!(grid.frame_count(), 6);
        assert_eq!(grid.layer_bytes(), 48);
        assert_eq!(grid.field_bytes(), 288);
        assert_eq!(grid.marker_count(), 12);
    }

    #[test]
    fn test_empty_grid_rejected() {
        assert!(grid(0, 4).validate().is_err());
        assert!(grid(1, 1).validate().is_ok());
    }
}
