/// UI widgets for the viewer
///
/// - `canvas.rs` - mouse overlay feeding the orbit controls

pub mod canvas;

pub use canvas::OrbitOverlay;
