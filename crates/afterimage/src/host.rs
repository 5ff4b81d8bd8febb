//! Host environment components are mounted into.

use crate::config::HostConfig;
use crate::observer::{self, ImageLoaderObserver};
use crate::render::SRC_ATTRIBUTE;
use common::{AfterImageError, AfterImageResult};
use dom::{
    serialize_outer_html, AnimationFrameCallback, DomTree, ElementData, Event, EventManager,
    EventType, NodeId, TagName, Window, WindowFeatures,
};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use url::Url;
use web_apis::{
    DOMRect, IntersectionNotification, IntersectionObserverController, IntersectionObserverEntry,
    ObserverId,
};

/// A document with its window, event loop hooks and intersection machinery.
///
/// Clones share all state. Frame callbacks, event listeners and observer
/// callbacks always run after the host's own locks are released.
#[derive(Clone)]
pub struct Host {
    config: Arc<HostConfig>,
    tree: Arc<RwLock<DomTree>>,
    window: Arc<RwLock<Window>>,
    events: Arc<RwLock<EventManager>>,
    intersections: Arc<RwLock<IntersectionObserverController>>,
    /// Document-space layout rects.
    layout: Arc<RwLock<HashMap<NodeId, DOMRect>>>,
    /// Images whose current fetch already finished or failed.
    settled: Arc<RwLock<HashSet<NodeId>>>,
    body: NodeId,
}

impl Host {
    pub fn new(config: HostConfig) -> AfterImageResult<Self> {
        config.validate()?;

        let mut features = WindowFeatures::default();
        features.set(
            WindowFeatures::INTERSECTION_OBSERVER,
            config.intersection_observer,
        );
        let mut window = Window::with_features(features);
        window.resize_to(config.viewport_width, config.viewport_height);
        window.device_pixel_ratio = config.device_pixel_ratio;

        let mut tree = DomTree::new();
        let body = tree.create_element(ElementData::new(TagName::body()));
        let root = tree.root();
        tree.append_child(root, body);

        Ok(Self {
            config: Arc::new(config),
            tree: Arc::new(RwLock::new(tree)),
            window: Arc::new(RwLock::new(window)),
            events: Arc::new(RwLock::new(EventManager::new())),
            intersections: Arc::new(RwLock::new(IntersectionObserverController::new())),
            layout: Arc::new(RwLock::new(HashMap::new())),
            settled: Arc::new(RwLock::new(HashSet::new())),
            body,
        })
    }

    /// The `<body>` element.
    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn tree(&self) -> &Arc<RwLock<DomTree>> {
        &self.tree
    }

    pub fn window(&self) -> &Arc<RwLock<Window>> {
        &self.window
    }

    pub fn events(&self) -> &Arc<RwLock<EventManager>> {
        &self.events
    }

    pub fn intersections(&self) -> &Arc<RwLock<IntersectionObserverController>> {
        &self.intersections
    }

    /// The shared image-loader observer of this host.
    pub fn image_loader_observer(&self) -> Option<ImageLoaderObserver> {
        observer::image_loader_observer(self)
    }

    // ---- layout ----

    /// Place a node in document coordinates.
    pub fn set_layout_rect(&self, node: NodeId, rect: DOMRect) {
        self.layout.write().insert(node, rect);
    }

    pub fn layout_rect(&self, node: NodeId) -> Option<DOMRect> {
        self.layout.read().get(&node).copied()
    }

    pub fn scroll_to(&self, x: f64, y: f64) {
        self.window.write().scroll_to(x, y);
    }

    pub fn resize_viewport(&self, width: u32, height: u32) {
        self.window.write().resize_to(width, height);
    }

    // ---- event loop ----

    pub fn request_animation_frame(&self, callback: AnimationFrameCallback) -> u32 {
        self.window.write().request_animation_frame(callback)
    }

    pub fn cancel_animation_frame(&self, id: u32) {
        self.window.write().cancel_animation_frame(id);
    }

    /// Run one frame: pending frame callbacks, then the intersection step.
    ///
    /// Returns the number of intersection entries delivered.
    pub fn run_animation_frame(&self) -> usize {
        let (callbacks, now) = {
            let mut window = self.window.write();
            (window.take_animation_frames(), window.now())
        };
        for callback in callbacks {
            callback(now);
        }
        self.update_intersections()
    }

    /// Recompute intersections from layout and scroll position and notify
    /// observers of every threshold crossing.
    pub fn update_intersections(&self) -> usize {
        let (viewport, scroll_x, scroll_y, time) = {
            let window = self.window.read();
            (
                DOMRect::new(
                    0.0,
                    0.0,
                    window.inner_width as f64,
                    window.inner_height as f64,
                ),
                window.scroll_x,
                window.scroll_y,
                window.now(),
            )
        };

        let client_rects: HashMap<NodeId, DOMRect> = {
            let tree = self.tree.read();
            let mut layout = self.layout.write();
            layout.retain(|node, _| tree.contains(*node));
            self.settled.write().retain(|node| tree.contains(*node));
            layout
                .iter()
                .filter(|(node, _)| tree.is_connected(**node))
                .map(|(node, rect)| {
                    let client = DOMRect::new(rect.x - scroll_x, rect.y - scroll_y, rect.width, rect.height);
                    (*node, client)
                })
                .collect()
        };

        let notifications = self
            .intersections
            .write()
            .update(&viewport, &client_rects, time);
        dispatch_all(notifications)
    }

    /// Report a visibility change for `target` as the platform would.
    ///
    /// Goes to every observer watching `target`, subject to threshold
    /// crossing.
    pub fn report_intersection(&self, target: NodeId, ratio: f64) -> usize {
        let time = self.window.read().now();
        let notifications = self
            .intersections
            .write()
            .report(IntersectionObserverEntry::reported(target, ratio, time));
        dispatch_all(notifications)
    }

    /// Hand an entry straight to an observer's callback, whether or not it
    /// still watches `target`. Returns `false` for an unknown observer.
    pub fn deliver_intersection(&self, observer: ObserverId, target: NodeId, ratio: f64) -> bool {
        let time = self.window.read().now();
        let entry = IntersectionObserverEntry::reported(target, ratio, time);
        let notification = self.intersections.read().deliver(observer, vec![entry]);
        match notification {
            Some(notification) => {
                notification.dispatch();
                true
            }
            None => false,
        }
    }

    /// Fire an event at `target`. Returns the number of listeners that ran.
    ///
    /// Listeners run with no host lock held.
    pub fn dispatch_event(&self, target: NodeId, event_type: EventType) -> usize {
        if !self.tree.read().contains(target) {
            return 0;
        }
        let dispatch = self.events.read().snapshot(target, &event_type);
        dispatch.run(&mut Event::new(event_type, target))
    }

    // ---- network ----

    /// Whether `image` has a fetch in flight.
    pub fn is_fetching(&self, image: NodeId) -> bool {
        let has_src = self.tree.read().get_attribute(image, SRC_ATTRIBUTE).is_some();
        has_src && !self.settled.read().contains(&image)
    }

    /// URL the image fetches, resolved against the configured base URL.
    pub fn fetch_url(&self, image: NodeId) -> AfterImageResult<Option<Url>> {
        let tree = self.tree.read();
        let Some(src) = tree.get_attribute(image, SRC_ATTRIBUTE) else {
            return Ok(None);
        };
        let url = match &self.config.base_url {
            Some(base) => base.join(src)?,
            None => Url::parse(src)?,
        };
        Ok(Some(url))
    }

    /// Complete the in-flight fetch of `image` and fire `load`.
    pub fn finish_image_load(&self, image: NodeId) -> AfterImageResult<()> {
        self.settle(image)?;
        self.dispatch_event(image, EventType::Load);
        Ok(())
    }

    /// Fail the in-flight fetch of `image` and fire `error`.
    pub fn fail_image_load(&self, image: NodeId) -> AfterImageResult<()> {
        self.settle(image)?;
        self.dispatch_event(image, EventType::Error);
        Ok(())
    }

    fn settle(&self, image: NodeId) -> AfterImageResult<()> {
        if !self.tree.read().contains(image) {
            return Err(AfterImageError::not_found(format!("image {image:?}")));
        }
        if !self.is_fetching(image) {
            return Err(AfterImageError::invalid(format!(
                "no fetch in flight for {image:?}"
            )));
        }
        self.settled.write().insert(image);
        Ok(())
    }

    /// Drop the fetch bookkeeping of an image leaving the document.
    pub fn release_image(&self, image: NodeId) {
        self.settled.write().remove(&image);
        self.layout.write().remove(&image);
    }

    #[cfg(test)]
    pub(crate) fn settled_count(&self) -> usize {
        self.settled.read().len()
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        serialize_outer_html(&self.tree.read(), node)
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("config", &self.config)
            .field("body", &self.body)
            .field("nodes", &self.tree.read().len())
            .finish()
    }
}

fn dispatch_all(notifications: Vec<IntersectionNotification>) -> usize {
    notifications
        .iter()
        .map(|notification| {
            notification.dispatch();
            notification.entries.len()
        })
        .sum()
}
