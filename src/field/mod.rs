/// Light-field assembly
///
/// This module turns a directory of frames into one packed array-texture
/// buffer:
/// - `grid.rs` - camera grid layout and frame naming
/// - `fetch.rs` - sequential, progress-reporting frame loading
/// - `rasterize.rs` - fixed-size RGBA8 rasterization, chunked packing
/// - `packer.rs` - the packed buffer and its dirty-layer tracking

pub mod fetch;
pub mod grid;
pub mod packer;
pub mod rasterize;

pub use fetch::{fetch_frames, FetchProgress};
pub use grid::CameraGrid;
pub use packer::FieldBuffer;
pub use rasterize::{pack_frames, ChunkProgress};

#[cfg(test)]
pub(crate) mod test_support {
    use super::CameraGrid;
    use image::{Rgba, RgbaImage};
    use std::path::Path;

    /// Write a `cams_x` x `cams_y` frame set of 5x4 PNGs into `dir`.
    /// Frame `i` is filled with red = i so tests can tell frames apart.
    pub fn write_frames(dir: &Path, cams_x: u32, cams_y: u32) -> CameraGrid {
        let grid = CameraGrid {
            cams_x,
            cams_y,
            res_x: 3,
            res_y: 3,
            camera_gap: 0.08,
            frames_dir: dir.to_path_buf(),
        };

        for index in 1..=grid.frame_count() {
            let image = RgbaImage::from_pixel(5, 4, Rgba([index as u8, 40, 80, 255]));
            image.save(grid.frame_path(index)).unwrap();
        }

        grid
    }
}
