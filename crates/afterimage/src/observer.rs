//! The shared image-loader observer.
//!
//! One intersection observer per host serves every component. It is built on
//! first request and memoized in the window's global slots under
//! [`CACHE_KEY`]; every later request returns the same handle.

use crate::host::Host;
use crate::render::{SRC_ATTRIBUTE, STAGED_SRC_ATTRIBUTE};
use crate::state::SharedPhase;
use dom::{DomTree, NodeId, WindowFeatures};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use web_apis::{
    IntersectionCallback, IntersectionObserverController, IntersectionObserverEntry,
    IntersectionObserverOptions, ObserverId, RootMargin, Threshold,
};

/// Window global slot holding the shared observer.
pub const CACHE_KEY: &str = "__AFTER_IMAGE_INTERSECTION_OBSERVER__";

type Registrations = Arc<RwLock<HashMap<NodeId, SharedPhase>>>;

/// Handle to the shared observer. Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct ImageLoaderObserver {
    inner: Arc<ObserverInner>,
}

struct ObserverInner {
    id: ObserverId,
    threshold: f64,
    /// Observed containers and the phase of their component.
    registrations: Registrations,
    controller: Arc<RwLock<IntersectionObserverController>>,
}

/// Get the host's shared observer, creating it on first use.
///
/// Returns `None` when the host has no Intersection Observer; callers then
/// load eagerly.
pub fn image_loader_observer(host: &Host) -> Option<ImageLoaderObserver> {
    let mut window = host.window().write();

    if !window.supports(WindowFeatures::INTERSECTION_OBSERVER) {
        trace!("intersection observer unavailable, images load eagerly");
        return None;
    }

    if let Some(observer) = window.global::<ImageLoaderObserver>(CACHE_KEY) {
        return Some(observer);
    }

    let config = &host.config().lazy_load;
    let root_margin = match config.root_margin() {
        Ok(margin) => margin,
        Err(err) => {
            warn!("ignoring root margin {:?}: {}", config.root_margin, err);
            RootMargin::default()
        }
    };

    let registrations: Registrations = Arc::new(RwLock::new(HashMap::new()));
    let callback = load_visible_images(host.tree().clone(), registrations.clone(), config.threshold);
    let options = IntersectionObserverOptions {
        root: None,
        root_margin,
        threshold: Threshold::Single(config.threshold),
    };
    let id = host.intersections().write().create_observer(callback, options);

    let observer = ImageLoaderObserver {
        inner: Arc::new(ObserverInner {
            id,
            threshold: config.threshold,
            registrations,
            controller: host.intersections().clone(),
        }),
    };
    window.set_global(CACHE_KEY, observer.clone());
    debug!(threshold = config.threshold, "created shared image loader observer");

    Some(observer)
}

/// Callback shared by every registration: starts the fetch of each
/// registered container whose visible share reached `threshold`.
fn load_visible_images(
    tree: Arc<RwLock<DomTree>>,
    registrations: Registrations,
    threshold: f64,
) -> IntersectionCallback {
    Arc::new(move |entries: &[IntersectionObserverEntry]| {
        for entry in entries {
            if entry.intersection_ratio < threshold {
                trace!(ratio = entry.intersection_ratio, "below threshold");
                continue;
            }

            let Some(phase) = registrations.read().get(&entry.target).cloned() else {
                trace!(container = ?entry.target, "entry for unregistered container");
                continue;
            };

            let mut document = tree.write();
            let Some(image) = document.find_descendant_by_tag(entry.target, "img") else {
                continue;
            };
            let Some(element) = document.get_element_mut(image) else {
                continue;
            };

            if element.has_attribute(SRC_ATTRIBUTE) {
                // Fetched through some other path; keep the phase in step
                phase.write().trigger();
                continue;
            }

            let Some(src) = element
                .dataset()
                .get("src")
                .filter(|src| !src.is_empty())
                .map(str::to_string)
            else {
                continue;
            };

            if phase.write().trigger() {
                element.set_attribute(SRC_ATTRIBUTE, &src);
                debug!(%src, ratio = entry.intersection_ratio, "image fetch triggered");
            }
        }
    })
}

impl ImageLoaderObserver {
    /// Start watching a container. Returns `false` if it was already watched.
    pub fn observe(&self, container: NodeId, phase: SharedPhase) -> bool {
        self.inner.registrations.write().insert(container, phase);
        let observed = self
            .inner
            .controller
            .write()
            .get_mut(self.inner.id)
            .map(|observer| observer.observe(container))
            .unwrap_or(false);
        if observed {
            debug!(?container, "observing container");
        }
        observed
    }

    /// Stop watching a container. Unknown containers are ignored.
    pub fn unobserve(&self, container: NodeId) -> bool {
        self.inner.registrations.write().remove(&container);
        let removed = self
            .inner
            .controller
            .write()
            .get_mut(self.inner.id)
            .map(|observer| observer.unobserve(container))
            .unwrap_or(false);
        if removed {
            debug!(?container, "unobserved container");
        }
        removed
    }

    pub fn is_observing(&self, container: NodeId) -> bool {
        self.inner
            .controller
            .read()
            .get(self.inner.id)
            .is_some_and(|observer| observer.is_observing(container))
    }

    pub fn id(&self) -> ObserverId {
        self.inner.id
    }

    pub fn threshold(&self) -> f64 {
        self.inner.threshold
    }

    /// Whether two handles refer to the same observer.
    pub fn ptr_eq(&self, other: &ImageLoaderObserver) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for ImageLoaderObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoaderObserver")
            .field("id", &self.inner.id)
            .field("threshold", &self.inner.threshold)
            .field("registrations", &self.inner.registrations.read().len())
            .finish()
    }
}
