/// Packed light-field buffer
///
/// One contiguous RGBA8 buffer holding every frame as a layer of a 2D array
/// texture. Layer `l` lives at `[l * layer_bytes, (l + 1) * layer_bytes)`,
/// which is exactly the layer the shader samples for grid cell `l`.
///
/// The storage is allocated on the first write, sized for all layers up
/// front. Writes mark layers dirty; the GPU side drains the dirty range
/// with `take_dirty` and uploads only those layers.

use std::ops::Range;

use crate::error::{Result, ViewerError};

pub struct FieldBuffer {
    width: u32,
    height: u32,
    layers: u32,
    data: Option<Vec<u8>>,
    dirty: Option<Range<u32>>,
    revision: u64,
}

impl FieldBuffer {
    pub fn new(width: u32, height: u32, layers: u32) -> Self {
        Self {
            width,
            height,
            layers,
            data: None,
            dirty: None,
            revision: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layers(&self) -> u32 {
        self.layers
    }

    /// Bytes per layer (width * height * 4)
    pub fn layer_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Whether the backing storage exists yet
    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    /// Current size of the backing storage (0 before the first write)
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy one rasterized frame into its layer slot
    pub fn write_layer(&mut self, layer: u32, rgba: &[u8]) -> Result<()> {
        if layer >= self.layers {
            return Err(ViewerError::LayerOutOfRange {
                layer: layer as usize,
                layers: self.layers as usize,
            });
        }

        let layer_bytes = self.layer_bytes();
        if rgba.len() != layer_bytes {
            return Err(ViewerError::RasterSize {
                expected: layer_bytes,
                actual: rgba.len(),
            });
        }

        let total = layer_bytes * self.layers as usize;
        let data = self.data.get_or_insert_with(|| vec![0u8; total]);

        let start = layer as usize * layer_bytes;
        data[start..start + layer_bytes].copy_from_slice(rgba);

        self.dirty = Some(match self.dirty.take() {
            Some(range) => range.start.min(layer)..range.end.max(layer + 1),
            None => layer..layer + 1,
        });

        Ok(())
    }

    /// Bytes of one layer, if the buffer has been allocated
    pub fn layer(&self, layer: u32) -> Option<&[u8]> {
        if layer >= self.layers {
            return None;
        }
        let layer_bytes = self.layer_bytes();
        let start = layer as usize * layer_bytes;
        self.data.as_ref().map(|data| &data[start..start + layer_bytes])
    }

    /// Bytes of a contiguous range of layers
    pub fn layer_range(&self, layers: Range<u32>) -> Option<&[u8]> {
        if layers.start > layers.end || layers.end > self.layers {
            return None;
        }
        let layer_bytes = self.layer_bytes();
        let start = layers.start as usize * layer_bytes;
        let end = layers.end as usize * layer_bytes;
        self.data.as_ref().map(|data| &data[start..end])
    }

    /// Take the dirty range, marking the buffer clean. Bumps the revision
    /// whenever there was something to flush.
    pub fn take_dirty(&mut self) -> Option<Range<u32>> {
        let dirty = self.dirty.take();
        if dirty.is_some() {
            self.revision += 1;
        }
        dirty
    }

    /// Number of flushes so far
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl std::fmt::Debug for FieldBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layers", &self.layers)
            .field("allocated", &self.is_allocated())
            .field("revision", &self.revision)
            .finish()
    }
}
