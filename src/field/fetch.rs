/// Sequential frame fetcher
///
/// Frames are read and decoded strictly in index order. The whole set must
/// be resident before rasterization starts, and the first failure aborts
/// the fetch: no retries, no skipped frames.

use image::DynamicImage;
use std::future::Future;
use std::path::PathBuf;
use tokio::task;

use super::CameraGrid;
use crate::error::{Result, ViewerError};

/// Progress after a successful frame load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
    pub loaded: usize,
    pub total: usize,
}

impl FetchProgress {
    /// Rounded completion percentage
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((100.0 * self.loaded as f64 / self.total as f64).round()) as u8
    }
}

/// Load all frames of the grid in order, reporting progress after each one.
/// The progress future is awaited before the next frame is read.
pub async fn fetch_frames<F, Fut>(grid: &CameraGrid, mut on_progress: F) -> Result<Vec<DynamicImage>>
where
    F: FnMut(FetchProgress) -> Fut,
    Fut: Future<Output = ()>,
{
    let total = grid.frame_count();
    let mut images = Vec::with_capacity(total);

    log::info!("Fetching {} frames from {}", total, grid.frames_dir.display());

    for index in 1..=total {
        let image = fetch_frame(index, grid.frame_path(index)).await?;
        images.push(image);

        on_progress(FetchProgress {
            loaded: index,
            total,
        })
        .await;
    }

    log::info!("Fetched {} frames", images.len());
    Ok(images)
}

/// Read and decode a single frame
async fn fetch_frame(index: usize, path: PathBuf) -> Result<DynamicImage> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| ViewerError::FrameRead {
            index,
            path: path.clone(),
            source,
        })?;

    // Decoding is CPU-bound, keep it off the async workers
    task::spawn_blocking(move || {
        image::load_from_memory(&bytes)
            .map_err(|source| ViewerError::FrameDecode { index, path, source })
    })
    .await
    .map_err(|e| ViewerError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::test_support::write_frames;

    #[test]
    fn test_percent_rounding() {
        let progress = |loaded| FetchProgress { loaded, total: 289 };
        assert_eq!(progress(1).percent(), 0);
        assert_eq!(progress(2).percent(), 1);
        assert_eq!(progress(145).percent(), 50);
        assert_eq!(progress(289).percent(), 100);
    }

    #[tokio::test]
    async fn test_fetch_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        let grid = write_frames(dir.path(), 3, 2);

        let mut reported = Vec::new();
        let images = fetch_frames(&grid, |p| {
            reported.push(p.loaded);
            std::future::ready(())
        })
        .await
        .unwrap();

        assert_eq!(images.len(), 6);
        assert_eq!(reported, vec![1, 2, 3, 4, 5, 6]);

        // Each test frame is filled with its own index in the red channel
        for (layer, image) in images.iter().enumerate() {
            let pixel = image.to_rgba8().get_pixel(0, 0).0;
            assert_eq!(pixel[0] as usize, layer + 1);
        }
    }

    #[tokio::test]
    async fn test_first_missing_frame_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let grid = write_frames(dir.path(), 2, 2);
        std::fs::remove_file(grid.frame_path(3)).unwrap();

        let mut reported = Vec::new();
        let result = fetch_frames(&grid, |p| {
            reported.push(p.loaded);
            std::future::ready(())
        })
        .await;

        match result {
            Err(ViewerError::FrameRead { index, .. }) => assert_eq!(index, 3),
            other => panic!("expected FrameRead error, got {other:?}"),
        }
        // Progress stops at the last good frame
        assert_eq!(reported, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_corrupt_frame_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let grid = write_frames(dir.path(), 2, 1);
        std::fs::write(grid.frame_path(2), b"not a png").unwrap();

        let result = fetch_frames(&grid, |_| std::future::ready(())).await;
        assert!(matches!(result, Err(ViewerError::FrameDecode { index: 2, .. })));
    }
}
