//! Load state shared between a component and the shared observer.

use parking_lot::RwLock;
use std::sync::Arc;

/// Progress of a component's image fetch.
///
/// `src` is assigned on the `Pending -> Triggered` edge only, which keeps the
/// fetch from starting twice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadPhase {
    /// `src` not assigned yet; the locator sits on `data-src`.
    #[default]
    Pending,
    /// `src` assigned, download in flight.
    Triggered,
    /// Image finished downloading.
    Loaded,
}

impl LoadPhase {
    /// Move to `Triggered`. Returns `true` only when the caller must assign `src`.
    pub fn trigger(&mut self) -> bool {
        if *self == LoadPhase::Pending {
            *self = LoadPhase::Triggered;
            true
        } else {
            false
        }
    }

    /// Move to `Loaded`. Only a triggered fetch can complete; returns
    /// `false` from any other phase.
    pub fn complete(&mut self) -> bool {
        if *self != LoadPhase::Triggered {
            return false;
        }
        *self = LoadPhase::Loaded;
        true
    }

    pub fn is_loaded(&self) -> bool {
        *self == LoadPhase::Loaded
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadPhase::Pending => "pending",
            LoadPhase::Triggered => "triggered",
            LoadPhase::Loaded => "loaded",
        }
    }
}

impl std::fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase handle held by both the component and its observer registration.
pub type SharedPhase = Arc<RwLock<LoadPhase>>;

/// Component lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Unmounted,
    /// Rendered; registration waits for the next animation frame.
    Mounted,
    /// Registered with the observer, or fetched eagerly.
    Registered,
    Loaded,
    /// Unmounted. Terminal.
    Destroyed,
}

impl Lifecycle {
    pub fn is_mounted(&self) -> bool {
        matches!(
            self,
            Lifecycle::Mounted | Lifecycle::Registered | Lifecycle::Loaded
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_happens_once() {
        let mut phase = LoadPhase::default();
        assert!(phase.trigger());
        assert!(!phase.trigger());
        assert_eq!(phase, LoadPhase::Triggered);
    }

    #[test]
    fn test_complete() {
        let mut phase = LoadPhase::Pending;
        assert!(!phase.complete());
        assert_eq!(phase, LoadPhase::Pending);

        assert!(phase.trigger());
        assert!(phase.complete());
        assert!(phase.is_loaded());
        assert!(!phase.complete());
        // A loaded image never triggers again
        assert!(!phase.trigger());
        assert_eq!(phase.to_string(), "loaded");
    }

    #[test]
    fn test_lifecycle_mounted() {
        assert!(!Lifecycle::Unmounted.is_mounted());
        assert!(Lifecycle::Mounted.is_mounted());
        assert!(Lifecycle::Loaded.is_mounted());
        assert!(!Lifecycle::Destroyed.is_mounted());
    }
}
