//! Component options.

use dom::AttributeMap;
use std::sync::Arc;

/// Callback invoked once the image finished downloading.
pub type LoadCallback = Arc<dyn Fn() + Send + Sync>;

pub const DEFAULT_ASPECT_HEIGHT: f64 = 9.0;
pub const DEFAULT_ASPECT_WIDTH: f64 = 16.0;

/// Attributes the component renders itself; never forwarded to the image.
const RESERVED_ATTRIBUTES: &[&str] = &["src", "data-src", "class", "style"];

/// Options of an [`AfterImage`](crate::AfterImage).
#[derive(Clone)]
pub struct AfterImageProps {
    /// Resource to defer-load.
    pub src: String,
    /// Extra class appended to the container.
    pub class_name: Option<String>,
    pub aspect_height: f64,
    pub aspect_width: f64,
    /// Whether to reserve space with a placeholder block.
    pub with_placeholder: bool,
    pub on_load: Option<LoadCallback>,
    /// Pass-through attributes for the `<img>` element.
    pub attributes: AttributeMap,
}

impl AfterImageProps {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            class_name: None,
            aspect_height: DEFAULT_ASPECT_HEIGHT,
            aspect_width: DEFAULT_ASPECT_WIDTH,
            with_placeholder: true,
            on_load: None,
            attributes: AttributeMap::new(),
        }
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn aspect(mut self, height: f64, width: f64) -> Self {
        self.aspect_height = height;
        self.aspect_width = width;
        self
    }

    pub fn with_placeholder(mut self, with_placeholder: bool) -> Self {
        self.with_placeholder = with_placeholder;
        self
    }

    pub fn on_load<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_load = Some(Arc::new(callback));
        self
    }

    /// Forward an attribute to the rendered `<img>`.
    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.set(&name.to_ascii_lowercase(), value);
        self
    }

    /// Pass-through attributes minus the ones the component owns.
    pub fn forwarded_attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .filter(|(name, _)| !RESERVED_ATTRIBUTES.contains(name))
    }

    /// Placeholder height as a fraction of its width.
    ///
    /// Falls back to 9/16 when the aspect is unusable (zero, negative or
    /// non-finite width, negative or non-finite height).
    pub fn aspect_ratio(&self) -> f64 {
        let usable = self.aspect_width.is_finite()
            && self.aspect_width > 0.0
            && self.aspect_height.is_finite()
            && self.aspect_height >= 0.0;

        if usable {
            self.aspect_height / self.aspect_width
        } else {
            DEFAULT_ASPECT_HEIGHT / DEFAULT_ASPECT_WIDTH
        }
    }

    /// `padding-top` reserving the placeholder height.
    pub fn padding_top(&self) -> String {
        format!("{}%", self.aspect_ratio() * 100.0)
    }
}

impl std::fmt::Debug for AfterImageProps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AfterImageProps")
            .field("src", &self.src)
            .field("class_name", &self.class_name)
            .field("aspect_height", &self.aspect_height)
            .field("aspect_width", &self.aspect_width)
            .field("with_placeholder", &self.with_placeholder)
            .field("on_load", &self.on_load.is_some())
            .field("attributes", &self.attributes)
            .finish()
    }
}
