/// Error types for the light-field viewer
///
/// Everything fallible in the load pipeline, the GPU pipeline and the
/// configuration layer funnels into `ViewerError`. UI messages carry the
/// error's display text since iced messages must be `Clone`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Failed to read frame {index} ({path}): {source}")]
    FrameRead {
        index: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode frame {index} ({path}): {source}")]
    FrameDecode {
        index: usize,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Frame raster has {actual} bytes, expected {expected}")]
    RasterSize { expected: usize, actual: usize },

    #[error("Layer {layer} is out of range for a field of {layers} layers")]
    LayerOutOfRange { layer: usize, layers: usize },

    #[error("Frame grid must not be empty ({cams_x}x{cams_y} cameras at {res_x}x{res_y})")]
    EmptyGrid {
        cams_x: u32,
        cams_y: u32,
        res_x: u32,
        res_y: u32,
    },

    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Failed to create GPU device: {0}")]
    Device(String),

    #[error("Light field needs {needed} texture layers but the GPU supports {supported}")]
    TooManyLayers { needed: u32, supported: u32 },

    #[error("Light field layers are {width}x{height} but the GPU supports at most {supported}x{supported}")]
    TextureTooLarge { width: u32, height: u32, supported: u32 },

    #[error("Failed to create GPU resources: {0}")]
    Resource(String),

    #[error("Failed to read shader {path}: {source}")]
    ShaderRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Shader failed to compile: {0}")]
    ShaderCompile(String),

    #[error("GPU readback failed: {0}")]
    Readback(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Config I/O error at {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ViewerError>;
