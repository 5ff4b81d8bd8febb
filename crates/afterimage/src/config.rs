//! Host and lazy-loading configuration.

use common::{AfterImageError, AfterImageResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use web_apis::RootMargin;

/// Share of a container's area that must be visible before its image is fetched.
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Duration of the image/placeholder cross-fade.
pub const DEFAULT_TRANSITION_MS: u64 = 300;

/// Lazy-loading configuration shared by every component of a host.
///
/// The shared observer is built from this configuration once; later
/// changes do not affect an observer that already exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AfterImageConfig {
    /// Visibility threshold in `[0, 1]`.
    pub threshold: f64,
    /// Root margin in CSS margin shorthand (`px` or `%`).
    pub root_margin: String,
    /// Cross-fade duration in milliseconds.
    pub transition_ms: u64,
}

impl AfterImageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> AfterImageResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AfterImageResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(AfterImageError::config(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        self.root_margin()?;
        Ok(())
    }

    pub fn root_margin(&self) -> AfterImageResult<RootMargin> {
        RootMargin::parse(&self.root_margin)
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Start fetching before the container reaches the viewport.
    pub fn with_root_margin(mut self, root_margin: &str) -> Self {
        self.root_margin = root_margin.to_string();
        self
    }

    pub fn with_transition_ms(mut self, transition_ms: u64) -> Self {
        self.transition_ms = transition_ms;
        self
    }
}

impl Default for AfterImageConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            root_margin: "0px".to_string(),
            transition_ms: DEFAULT_TRANSITION_MS,
        }
    }
}

/// Host configuration.
#[derive(Clone, Debug)]
pub struct HostConfig {
    /// Viewport width.
    pub viewport_width: u32,
    /// Viewport height.
    pub viewport_height: u32,
    /// Device pixel ratio.
    pub device_pixel_ratio: f64,
    /// Base URL relative image sources resolve against.
    pub base_url: Option<Url>,
    /// Whether the platform exposes Intersection Observer.
    pub intersection_observer: bool,
    /// Lazy-loading settings.
    pub lazy_load: AfterImageConfig,
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mobile configuration.
    pub fn mobile() -> Self {
        Self {
            viewport_width: 375,
            viewport_height: 812,
            device_pixel_ratio: 3.0,
            ..Self::default()
        }
    }

    /// A platform without Intersection Observer: images load eagerly.
    pub fn legacy() -> Self {
        Self {
            intersection_observer: false,
            ..Self::default()
        }
    }

    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> AfterImageResult<Self> {
        self.base_url = Some(Url::parse(base_url)?);
        Ok(self)
    }

    pub fn with_lazy_load(mut self, lazy_load: AfterImageConfig) -> Self {
        self.lazy_load = lazy_load;
        self
    }

    pub fn validate(&self) -> AfterImageResult<()> {
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(AfterImageError::config("viewport must not be empty"));
        }
        self.lazy_load.validate()
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            device_pixel_ratio: 1.0,
            base_url: None,
            intersection_observer: true,
            lazy_load: AfterImageConfig::default(),
        }
    }
}
