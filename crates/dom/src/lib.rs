//! DOM (Document Object Model) implementation.
//!
//! This crate provides the DOM tree, events and window primitives the
//! lazy image component renders into.

pub mod attributes;
pub mod element;
pub mod events;
pub mod node;
pub mod serializer;
pub mod style;
pub mod tree;
pub mod window;

pub use attributes::{AttributeMap, DataAttributes};
pub use element::{ElementData, ElementFlags, TagName};
pub use events::{Event, EventCallback, EventDispatch, EventManager, EventType};
pub use node::{Node, NodeData, NodeId};
pub use serializer::serialize_outer_html;
pub use style::InlineStyle;
pub use tree::DomTree;
pub use window::{AnimationFrameCallback, Window, WindowFeatures};
