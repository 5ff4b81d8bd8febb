//! AfterImage - lazy-loading images for component-built pages.
//!
//! This crate provides:
//! - The deferred image component ([`AfterImage`])
//! - The shared image-loader observer, memoized per host
//! - The host environment components mount into ([`Host`])
//! - Configuration for both

pub mod component;
pub mod config;
pub mod host;
pub mod observer;
pub mod props;
pub mod render;
pub mod state;

pub use common::{AfterImageError, AfterImageResult};
pub use component::AfterImage;
pub use config::{AfterImageConfig, HostConfig};
pub use host::Host;
pub use observer::{image_loader_observer, ImageLoaderObserver, CACHE_KEY};
pub use props::{AfterImageProps, LoadCallback};
pub use render::RenderedNodes;
pub use state::{Lifecycle, LoadPhase, SharedPhase};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
