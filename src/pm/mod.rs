//! Presentation Models
//!
//! The node tree, the model trait nodes implement, and the context their hooks
//! receive.

pub mod context;
pub mod description;
pub mod model;
pub mod scope;
pub mod tree;

pub use context::PmContext;
pub use description::{PmArgs, PmDescription, PmFactory, DEFAULT_ROOT_TAG};
pub use model::{AsAny, PresentationModel};
pub use scope::PmScope;
pub use tree::{PmId, PmTree};
