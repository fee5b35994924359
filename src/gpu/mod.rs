/// GPU-accelerated light-field rendering module
///
/// Architecture:
/// - `shaders.rs` - WGSL resampling shader and runtime shader loading
/// - `frame.rs` - per-frame render descriptions (mono / stereo / VR eyes)
/// - `pipeline.rs` - wgpu device, array texture and render pipelines
///
/// The pipeline owns its own device so it can request enough array layers
/// for large camera grids, renders offscreen and hands RGBA bytes to the UI.

pub mod frame;
pub mod pipeline;
pub mod shaders;

pub use frame::RenderRequest;
pub use pipeline::RenderPipeline;
