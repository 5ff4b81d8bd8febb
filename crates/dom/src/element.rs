//! DOM Element implementation.

use crate::attributes::{AttributeMap, DataAttributes};
use crate::style::InlineStyle;
use bitflags::bitflags;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Common HTML tag names interned for efficiency.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TagName(Arc<str>);

impl TagName {
    pub fn new(name: &str) -> Self {
        static INTERNED: Lazy<RwLock<HashMap<String, Arc<str>>>> =
            Lazy::new(|| RwLock::new(HashMap::new()));

        let lower = name.to_ascii_lowercase();

        {
            let cache = INTERNED.read();
            if let Some(s) = cache.get(&lower) {
                return TagName(s.clone());
            }
        }

        let mut cache = INTERNED.write();
        let s = cache
            .entry(lower.clone())
            .or_insert_with(|| Arc::from(lower.as_str()))
            .clone();
        TagName(s)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn body() -> Self {
        Self::new("body")
    }
    pub fn div() -> Self {
        Self::new("div")
    }
    pub fn img() -> Self {
        Self::new("img")
    }
}

impl std::fmt::Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<&str> for TagName {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == other.to_ascii_lowercase()
    }
}

bitflags! {
    /// Element flags for quick property checks.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ElementFlags: u32 {
        /// No closing tag, no children.
        const VOID = 1 << 0;
    }
}

/// Element-specific data.
#[derive(Clone, Debug)]
pub struct ElementData {
    /// Tag name (lowercase).
    pub tag_name: TagName,
    /// Attributes.
    pub attributes: AttributeMap,
    /// Class list (cached).
    pub class_list: SmallVec<[Arc<str>; 4]>,
    /// Element flags.
    pub flags: ElementFlags,
}

impl ElementData {
    pub fn new(tag_name: TagName) -> Self {
        let flags = Self::default_flags(&tag_name);
        Self {
            tag_name,
            attributes: AttributeMap::new(),
            class_list: SmallVec::new(),
            flags,
        }
    }

    fn default_flags(tag_name: &TagName) -> ElementFlags {
        let void = matches!(
            tag_name.as_str(),
            "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
                | "param" | "source" | "track" | "wbr"
        );
        if void {
            ElementFlags::VOID
        } else {
            ElementFlags::empty()
        }
    }

    /// Set an attribute, updating cached values.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        let name_lower = name.to_ascii_lowercase();

        if name_lower == "class" {
            self.class_list = value.split_whitespace().map(Arc::from).collect();
        }

        self.attributes.set(&name_lower, value);
    }

    /// Remove an attribute.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let name_lower = name.to_ascii_lowercase();

        if name_lower == "class" {
            self.class_list.clear();
        }

        self.attributes.remove(&name_lower)
    }

    #[inline]
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(&name.to_ascii_lowercase())
    }

    #[inline]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(&name.to_ascii_lowercase())
    }

    /// View over the `data-*` attributes.
    pub fn dataset(&self) -> DataAttributes<'_> {
        DataAttributes::new(&self.attributes)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_list.iter().any(|c| c.as_ref() == class)
    }

    /// Parsed inline `style` attribute.
    pub fn style(&self) -> InlineStyle {
        self.get_attribute("style")
            .map(InlineStyle::parse)
            .unwrap_or_default()
    }

    /// Replace the inline `style` attribute.
    pub fn set_style(&mut self, style: &InlineStyle) {
        if style.is_empty() {
            self.remove_attribute("style");
        } else {
            self.attributes.set("style", &style.to_css());
        }
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        self.flags.contains(ElementFlags::VOID)
    }
}
