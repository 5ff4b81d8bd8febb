//! Intersection Observer API implementation.

use common::{AfterImageError, AfterImageResult};
use dom::NodeId;
use indexmap::IndexMap;
use slotmap::{new_key_type, SlotMap};
use std::collections::HashMap;
use std::sync::Arc;

new_key_type! {
    /// Identifier of an observer registered with the controller.
    pub struct ObserverId;
}

/// Callback receiving a batch of intersection entries.
pub type IntersectionCallback = Arc<dyn Fn(&[IntersectionObserverEntry]) + Send + Sync>;

/// Intersection Observer.
pub struct IntersectionObserver {
    /// Callback invoked with each batch of entries.
    callback: IntersectionCallback,
    /// Root element (None = viewport).
    root: Option<NodeId>,
    /// Root margin.
    root_margin: RootMargin,
    /// Thresholds, sorted ascending.
    thresholds: Vec<f64>,
    /// Observed targets with the threshold index of their last report.
    targets: IndexMap<NodeId, Option<isize>>,
    /// Whether the observer is active.
    active: bool,
}

impl IntersectionObserver {
    /// Create a new Intersection Observer.
    pub fn new(callback: IntersectionCallback, options: IntersectionObserverOptions) -> Self {
        Self {
            callback,
            root: options.root,
            root_margin: options.root_margin,
            thresholds: Self::normalize_thresholds(options.threshold),
            targets: IndexMap::new(),
            active: true,
        }
    }

    /// Normalize thresholds to a sorted, deduplicated list.
    fn normalize_thresholds(threshold: Threshold) -> Vec<f64> {
        let mut thresholds = match threshold {
            Threshold::Single(t) => vec![t],
            Threshold::Multiple(ts) => ts,
        };

        thresholds.retain(|t| t.is_finite());
        for t in &mut thresholds {
            *t = t.clamp(0.0, 1.0);
        }
        thresholds.sort_by(|a, b| a.total_cmp(b));
        thresholds.dedup();

        if thresholds.is_empty() {
            thresholds.push(0.0);
        }
        thresholds
    }

    /// Observe a target element. Observing an already observed target is a
    /// no-op and returns `false`.
    pub fn observe(&mut self, target: NodeId) -> bool {
        if self.targets.contains_key(&target) {
            return false;
        }
        self.targets.insert(target, None);
        self.active = true;
        true
    }

    /// Stop observing a target element. Returns `false` if it was not observed.
    pub fn unobserve(&mut self, target: NodeId) -> bool {
        self.targets.shift_remove(&target).is_some()
    }

    /// Stop observing all targets.
    pub fn disconnect(&mut self) {
        self.targets.clear();
        self.active = false;
    }

    pub fn is_observing(&self, target: NodeId) -> bool {
        self.targets.contains_key(&target)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn root_margin(&self) -> &RootMargin {
        &self.root_margin
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Get observed targets, in observation order.
    pub fn targets(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.targets.keys().copied()
    }

    pub fn callback(&self) -> IntersectionCallback {
        self.callback.clone()
    }

    /// Index of the threshold band a ratio falls in; `-1` when not
    /// intersecting at all.
    pub fn threshold_index(&self, ratio: f64, is_intersecting: bool) -> isize {
        if !is_intersecting {
            return -1;
        }
        self.thresholds.iter().filter(|&&t| ratio >= t).count() as isize
    }

    /// Record the band of a fresh entry; returns whether it crossed a
    /// threshold since the previous report (the first report always does).
    fn record(&mut self, entry: &IntersectionObserverEntry) -> bool {
        let index = self.threshold_index(entry.intersection_ratio, entry.is_intersecting);
        match self.targets.get_mut(&entry.target) {
            Some(previous) if *previous != Some(index) => {
                *previous = Some(index);
                true
            }
            _ => false,
        }
    }
}

/// Intersection Observer options.
#[derive(Clone, Debug)]
pub struct IntersectionObserverOptions {
    /// Root element (None = viewport).
    pub root: Option<NodeId>,
    /// Root margin.
    pub root_margin: RootMargin,
    /// Threshold(s).
    pub threshold: Threshold,
}

impl Default for IntersectionObserverOptions {
    fn default() -> Self {
        Self {
            root: None,
            root_margin: RootMargin::default(),
            threshold: Threshold::Single(0.0),
        }
    }
}

/// Root margin specification.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RootMargin {
    pub top: MarginValue,
    pub right: MarginValue,
    pub bottom: MarginValue,
    pub left: MarginValue,
}

impl RootMargin {
    /// Parse root margin from a string (CSS margin shorthand).
    pub fn parse(margin: &str) -> AfterImageResult<Self> {
        let parts: Vec<&str> = margin.split_whitespace().collect();

        match parts.len() {
            0 => Ok(Self::default()),
            1 => {
                let value = MarginValue::parse(parts[0])?;
                Ok(Self {
                    top: value,
                    right: value,
                    bottom: value,
                    left: value,
                })
            }
            2 => {
                let vertical = MarginValue::parse(parts[0])?;
                let horizontal = MarginValue::parse(parts[1])?;
                Ok(Self {
                    top: vertical,
                    right: horizontal,
                    bottom: vertical,
                    left: horizontal,
                })
            }
            3 => {
                let horizontal = MarginValue::parse(parts[1])?;
                Ok(Self {
                    top: MarginValue::parse(parts[0])?,
                    right: horizontal,
                    bottom: MarginValue::parse(parts[2])?,
                    left: horizontal,
                })
            }
            4 => Ok(Self {
                top: MarginValue::parse(parts[0])?,
                right: MarginValue::parse(parts[1])?,
                bottom: MarginValue::parse(parts[2])?,
                left: MarginValue::parse(parts[3])?,
            }),
            _ => Err(AfterImageError::config(format!(
                "invalid root margin: {margin:?}"
            ))),
        }
    }

    /// Grow a root rectangle by this margin.
    pub fn apply(&self, root: &DOMRect) -> DOMRect {
        let top = self.top.to_pixels(root.height);
        let right = self.right.to_pixels(root.width);
        let bottom = self.bottom.to_pixels(root.height);
        let left = self.left.to_pixels(root.width);

        DOMRect::new(
            root.x - left,
            root.y - top,
            root.width + left + right,
            root.height + top + bottom,
        )
    }
}

impl std::fmt::Display for RootMargin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

/// Margin value (pixels or percentage).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MarginValue {
    Pixels(f64),
    Percentage(f64),
}

impl MarginValue {
    /// Parse a margin value. Only `px` and `%` units are accepted.
    pub fn parse(value: &str) -> AfterImageResult<Self> {
        let value = value.trim();
        let invalid = || AfterImageError::config(format!("invalid margin value: {value:?}"));

        if let Some(num) = value.strip_suffix('%') {
            num.parse::<f64>()
                .map(MarginValue::Percentage)
                .map_err(|_| invalid())
        } else if let Some(num) = value.strip_suffix("px") {
            num.parse::<f64>()
                .map(MarginValue::Pixels)
                .map_err(|_| invalid())
        } else {
            // Unitless zero is the only accepted bare number
            match value.parse::<f64>() {
                Ok(num) if num == 0.0 => Ok(MarginValue::Pixels(0.0)),
                _ => Err(invalid()),
            }
        }
    }

    /// Get the value in pixels given a reference size.
    pub fn to_pixels(&self, reference: f64) -> f64 {
        match self {
            MarginValue::Pixels(px) => *px,
            MarginValue::Percentage(pct) => reference * pct / 100.0,
        }
    }
}

impl Default for MarginValue {
    fn default() -> Self {
        MarginValue::Pixels(0.0)
    }
}

impl std::fmt::Display for MarginValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarginValue::Pixels(px) => write!(f, "{}px", px),
            MarginValue::Percentage(pct) => write!(f, "{}%", pct),
        }
    }
}

/// Threshold specification.
#[derive(Clone, Debug)]
pub enum Threshold {
    Single(f64),
    Multiple(Vec<f64>),
}

/// Intersection observer entry.
#[derive(Clone, Debug)]
pub struct IntersectionObserverEntry {
    /// Target element.
    pub target: NodeId,
    /// Bounding client rect.
    pub bounding_client_rect: DOMRect,
    /// Intersection rect.
    pub intersection_rect: DOMRect,
    /// Root bounds.
    pub root_bounds: Option<DOMRect>,
    /// Intersection ratio.
    pub intersection_ratio: f64,
    /// Is intersecting.
    pub is_intersecting: bool,
    /// Time.
    pub time: f64,
}

impl IntersectionObserverEntry {
    /// An entry reported by the platform without geometry.
    pub fn reported(target: NodeId, intersection_ratio: f64, time: f64) -> Self {
        let intersection_ratio = intersection_ratio.clamp(0.0, 1.0);
        Self {
            target,
            bounding_client_rect: DOMRect::default(),
            intersection_rect: DOMRect::default(),
            root_bounds: None,
            intersection_ratio,
            is_intersecting: intersection_ratio > 0.0,
            time,
        }
    }
}

/// DOMRect for intersection calculations.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DOMRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DOMRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Calculate intersection with another rect.
    pub fn intersection(&self, other: &DOMRect) -> Option<DOMRect> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if left < right && top < bottom {
            Some(DOMRect::new(left, top, right - left, bottom - top))
        } else {
            None
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// A batch of entries ready to be handed to an observer's callback.
///
/// Produced while the controller is borrowed and dispatched afterwards, so
/// callbacks are free to observe or unobserve targets.
pub struct IntersectionNotification {
    pub observer: ObserverId,
    pub entries: Vec<IntersectionObserverEntry>,
    callback: IntersectionCallback,
}

impl IntersectionNotification {
    /// Invoke the observer's callback with the batch.
    pub fn dispatch(&self) {
        (self.callback)(&self.entries);
    }
}

/// Intersection observer controller.
pub struct IntersectionObserverController {
    /// Active observers.
    observers: SlotMap<ObserverId, IntersectionObserver>,
}

impl IntersectionObserverController {
    pub fn new() -> Self {
        Self {
            observers: SlotMap::with_key(),
        }
    }

    /// Create and register an observer.
    pub fn create_observer(
        &mut self,
        callback: IntersectionCallback,
        options: IntersectionObserverOptions,
    ) -> ObserverId {
        self.observers
            .insert(IntersectionObserver::new(callback, options))
    }

    pub fn get(&self, id: ObserverId) -> Option<&IntersectionObserver> {
        self.observers.get(id)
    }

    pub fn get_mut(&mut self, id: ObserverId) -> Option<&mut IntersectionObserver> {
        self.observers.get_mut(id)
    }

    /// Remove an observer.
    pub fn remove(&mut self, id: ObserverId) {
        self.observers.remove(id);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Run the intersection step (called after layout or scroll changes).
    ///
    /// `elements` holds the client rects of laid-out elements; observed
    /// targets without a rect count as not intersecting.
    pub fn update(
        &mut self,
        viewport: &DOMRect,
        elements: &HashMap<NodeId, DOMRect>,
        time: f64,
    ) -> Vec<IntersectionNotification> {
        let mut notifications = Vec::new();

        for (id, observer) in self.observers.iter_mut() {
            if !observer.is_active() {
                continue;
            }

            let root_bounds = match observer.root {
                Some(root_id) => elements.get(&root_id).copied(),
                None => Some(*viewport),
            };
            let Some(root) = root_bounds else {
                continue;
            };
            let expanded_root = observer.root_margin.apply(&root);

            let computed: Vec<_> = observer
                .targets()
                .map(|target| {
                    let target_rect = elements.get(&target).copied().unwrap_or_default();
                    compute_entry(target, &target_rect, &expanded_root, time)
                })
                .collect();

            let entries: Vec<_> = computed
                .into_iter()
                .filter(|entry| observer.record(entry))
                .collect();

            if !entries.is_empty() {
                notifications.push(IntersectionNotification {
                    observer: id,
                    entries,
                    callback: observer.callback(),
                });
            }
        }

        notifications
    }

    /// Route a platform-reported entry to every observer watching its
    /// target, applying the same threshold-crossing filter as `update`.
    pub fn report(&mut self, entry: IntersectionObserverEntry) -> Vec<IntersectionNotification> {
        self.observers
            .iter_mut()
            .filter(|(_, observer)| observer.is_active() && observer.is_observing(entry.target))
            .filter_map(|(id, observer)| {
                observer.record(&entry).then(|| IntersectionNotification {
                    observer: id,
                    entries: vec![entry.clone()],
                    callback: observer.callback(),
                })
            })
            .collect()
    }

    /// Hand entries straight to an observer's callback, bypassing target
    /// bookkeeping. Used for records the platform already queued.
    pub fn deliver(
        &self,
        id: ObserverId,
        entries: Vec<IntersectionObserverEntry>,
    ) -> Option<IntersectionNotification> {
        self.observers.get(id).map(|observer| IntersectionNotification {
            observer: id,
            entries,
            callback: observer.callback(),
        })
    }
}

impl Default for IntersectionObserverController {
    fn default() -> Self {
        Self::new()
    }
}

fn compute_entry(
    target: NodeId,
    target_rect: &DOMRect,
    root_bounds: &DOMRect,
    time: f64,
) -> IntersectionObserverEntry {
    let intersection = target_rect.intersection(root_bounds);

    let intersection_ratio = match &intersection {
        Some(int_rect) if target_rect.area() > 0.0 => int_rect.area() / target_rect.area(),
        _ => 0.0,
    };

    IntersectionObserverEntry {
        target,
        bounding_client_rect: *target_rect,
        is_intersecting: intersection.is_some(),
        intersection_rect: intersection.unwrap_or_default(),
        root_bounds: Some(*root_bounds),
        intersection_ratio,
        time,
    }
}
