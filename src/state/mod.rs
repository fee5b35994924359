/// State management module
///
/// - `params.rs` - shader parameters (aperture, focus, grid size)
/// - `session.rs` - the viewer session: load phase, view modes, cameras

pub mod params;
pub mod session;

pub use params::ShaderParams;
pub use session::{ControlMode, ViewerSession, ViewerState};
