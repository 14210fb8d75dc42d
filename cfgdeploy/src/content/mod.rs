//! Content handling shared by the diff and deploy paths

pub mod diff;
pub mod kind;
pub mod normalize;
pub mod validate;

pub use diff::DiffResult;
pub use kind::{ConfigurationProfileKind, FileKind};
pub use normalize::normalize;
