//! DOM Attribute handling.

use indexmap::IndexMap;
use std::sync::Arc;

/// Map of element attributes preserving insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeMap {
    attrs: IndexMap<Arc<str>, String>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self {
            attrs: IndexMap::new(),
        }
    }

    /// Set an attribute value.
    pub fn set(&mut self, name: &str, value: &str) {
        self.attrs.insert(Arc::from(name), value.to_string());
    }

    /// Get an attribute value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(|s| s.as_str())
    }

    /// Remove an attribute, keeping the order of the remaining ones.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.attrs.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Iterate over attributes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    /// Get attribute names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(|k| k.as_ref())
    }

    /// Convert to HTML attribute string.
    pub fn to_html(&self) -> String {
        let mut result = String::new();
        for (name, value) in &self.attrs {
            if !result.is_empty() {
                result.push(' ');
            }
            if value.is_empty() {
                result.push_str(name);
            } else {
                result.push_str(&format!("{}=\"{}\"", name, html_escape(value)));
            }
        }
        result
    }
}

/// Escape HTML special characters.
pub(crate) fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

/// Read-only view over the `data-*` attributes of an element.
pub struct DataAttributes<'a> {
    attrs: &'a AttributeMap,
}

impl<'a> DataAttributes<'a> {
    pub fn new(attrs: &'a AttributeMap) -> Self {
        Self { attrs }
    }

    /// Get a data attribute value.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        let key = format!("data-{}", name.to_ascii_lowercase());
        self.attrs.get(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_map() {
        let mut map = AttributeMap::new();
        map.set("alt", "A mountain");
        map.set("class", "afterimage__image");

        assert_eq!(map.get("alt"), Some("A mountain"));
        assert!(map.contains("class"));
        assert!(!map.contains("src"));
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["alt", "class"]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut map = AttributeMap::new();
        map.set("a", "1");
        map.set("b", "2");
        map.set("c", "3");
        assert_eq!(map.remove("a"), Some("1".to_string()));
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(map.remove("a"), None);
    }

    #[test]
    fn test_to_html() {
        let mut map = AttributeMap::new();
        map.set("data-src", "https://x/a?b=1&c=2");
        map.set("hidden", "");
        assert_eq!(map.to_html(), "data-src=\"https://x/a?b=1&amp;c=2\" hidden");
    }

    #[test]
    fn test_data_attributes() {
        let mut map = AttributeMap::new();
        map.set("data-src", "https://x/1600x900");
        map.set("alt", "");
        map.set("data-id", "7");

        let data = DataAttributes::new(&map);
        assert_eq!(data.get("src"), Some("https://x/1600x900"));
        assert_eq!(data.get("ID"), Some("7"));
        assert_eq!(data.get("alt"), None);
    }
}
