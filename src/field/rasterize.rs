/// Frame rasterization and chunked packing
///
/// Every decoded frame is stretched to exactly `res_x` x `res_y` and turned
/// into RGBA8 bytes, row-major from the top row down. Frames are handled in
/// chunks of `CHUNK_SIZE`; the decoded sources of a chunk are dropped once
/// the chunk is packed, so peak memory shrinks as packing advances.

use image::imageops::{self, FilterType};
use image::DynamicImage;

use super::FieldBuffer;
use crate::error::Result;

/// Frames rasterized between two flushes of the packed buffer
pub const CHUNK_SIZE: usize = 8;

/// Progress after a chunk has been packed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// Zero-based chunk index
    pub chunk: usize,
    /// Total number of chunks
    pub chunks: usize,
}

/// Rasterize one frame to `res_x` x `res_y` RGBA8
pub fn rasterize_frame(image: &DynamicImage, res_x: u32, res_y: u32) -> Vec<u8> {
    let rgba = image.to_rgba8();
    if rgba.dimensions() == (res_x, res_y) {
        return rgba.into_raw();
    }
    imageops::resize(&rgba, res_x, res_y, FilterType::Triangle).into_raw()
}

/// Rasterize and pack all frames in index order.
///
/// `flush` runs after each chunk with the buffer's dirty layers still set,
/// so the caller can push them to the GPU before the next chunk starts.
pub fn pack_frames<F>(frames: Vec<DynamicImage>, field: &mut FieldBuffer, mut flush: F) -> Result<()>
where
    F: FnMut(&mut FieldBuffer, ChunkProgress),
{
    let chunks = frames.len().div_ceil(CHUNK_SIZE);
    let mut frames = frames.into_iter();
    let (res_x, res_y) = (field.width(), field.height());

    for chunk in 0..chunks {
        let start = chunk * CHUNK_SIZE;
        let batch: Vec<DynamicImage> = frames.by_ref().take(CHUNK_SIZE).collect();

        for (offset, image) in batch.iter().enumerate() {
            let raster = rasterize_frame(image, res_x, res_y);
            field.write_layer((start + offset) as u32, &raster)?;
        }

        // Sources of this chunk are no longer needed
        drop(batch);

        flush(field, ChunkProgress { chunk, chunks });
        log::debug!("Packed chunk {}/{}", chunk + 1, chunks);
    }

    Ok(())
}
