//! Built-in effects.
//!
//! Small, deterministic image operations used by the CLI and the test suite. Each effect is
//! immutable: a parameter edit installs a new instance with [`crate::RenderNode::set_effect`].

pub mod brightness;
/// Solid color generator.
pub mod constant;
pub mod crop;
/// Viewer node routing one of its inputs downstream.
pub mod inspector;
pub mod merge;

pub use brightness::Brightness;
pub use constant::ConstantColor;
pub use crop::Crop;
pub use inspector::Inspector;
pub use merge::MergeOver;
