//! Common types shared across the lazy image workspace.

pub mod error;

pub use error::{AfterImageError, AfterImageResult};
