//! DOM Events implementation.

use crate::node::NodeId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Resource events fired at an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    Load,
    Error,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Load => "load",
            EventType::Error => "error",
        }
    }
}

/// DOM Event.
///
/// Only delivered at its target; resource events never bubble.
#[derive(Clone, Debug)]
pub struct Event {
    pub event_type: EventType,
    pub target: NodeId,
    /// Milliseconds since the Unix epoch.
    pub timestamp: f64,
}

impl Event {
    pub fn new(event_type: EventType, target: NodeId) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
            * 1000.0;

        Self {
            event_type,
            target,
            timestamp,
        }
    }
}

/// Event listener callback type.
pub type EventCallback = Arc<dyn Fn(&mut Event) + Send + Sync>;

/// Listeners registered per node and event type.
///
/// The manager never runs callbacks itself. Dispatchers take a
/// [`snapshot`](EventManager::snapshot), release the manager, then invoke
/// it, so listeners are free to register or drop listeners of their own.
#[derive(Default)]
pub struct EventManager {
    listeners: HashMap<NodeId, HashMap<String, Vec<EventCallback>>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, node: NodeId, event_type: &str, callback: EventCallback) {
        self.listeners
            .entry(node)
            .or_default()
            .entry(event_type.to_string())
            .or_default()
            .push(callback);
    }

    /// Number of listeners for a node and event type.
    pub fn listener_count(&self, node: NodeId, event_type: &str) -> usize {
        self.listeners
            .get(&node)
            .and_then(|n| n.get(event_type))
            .map(|l| l.len())
            .unwrap_or(0)
    }

    /// Listeners an event at `node` would reach right now, in registration
    /// order.
    pub fn snapshot(&self, node: NodeId, event_type: &EventType) -> EventDispatch {
        let listeners = self
            .listeners
            .get(&node)
            .and_then(|n| n.get(event_type.as_str()))
            .cloned()
            .unwrap_or_default();
        EventDispatch { listeners }
    }

    /// Remove all listeners for a node.
    pub fn remove_all(&mut self, node: NodeId) {
        self.listeners.remove(&node);
    }
}

/// Listeners captured for one event, detached from the manager.
pub struct EventDispatch {
    listeners: Vec<EventCallback>,
}

impl EventDispatch {
    /// Invoke every captured listener. Returns how many ran.
    pub fn run(&self, event: &mut Event) -> usize {
        for listener in &self.listeners {
            listener(event);
        }
        self.listeners.len()
    }
}
