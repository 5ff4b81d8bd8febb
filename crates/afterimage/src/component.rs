//! The deferred image component.

use crate::host::Host;
use crate::observer::ImageLoaderObserver;
use crate::props::AfterImageProps;
use crate::render::{self, RenderedNodes, SRC_ATTRIBUTE};
use crate::state::{Lifecycle, LoadPhase, SharedPhase};
use common::{AfterImageError, AfterImageResult};
use dom::{DomTree, Event, EventCallback, EventType, NodeId};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// An image whose fetch is deferred until its container becomes visible.
///
/// Renders a container holding the `<img>` (locator staged on `data-src`)
/// and, optionally, a placeholder reserving the image's aspect ratio. On the
/// animation frame after mounting, the container is registered with the
/// host's shared observer, or, when the host has none, the image is fetched
/// right away. The image fades in once it finished downloading.
///
/// Clones share the same instance.
#[derive(Clone)]
pub struct AfterImage {
    inner: Arc<ComponentInner>,
}

struct ComponentInner {
    props: RwLock<AfterImageProps>,
    nodes: RwLock<Option<RenderedNodes>>,
    observer: RwLock<Option<ImageLoaderObserver>>,
    /// Shared with the observer registration.
    phase: SharedPhase,
    lifecycle: RwLock<Lifecycle>,
    /// Pending registration frame.
    frame_request: RwLock<Option<u32>>,
    transition: RwLock<Duration>,
}

impl AfterImage {
    pub fn new(props: AfterImageProps) -> Self {
        Self {
            inner: Arc::new(ComponentInner {
                props: RwLock::new(props),
                nodes: RwLock::new(None),
                observer: RwLock::new(None),
                phase: SharedPhase::default(),
                lifecycle: RwLock::new(Lifecycle::Unmounted),
                frame_request: RwLock::new(None),
                transition: RwLock::new(Duration::ZERO),
            }),
        }
    }

    /// Render under `parent` and schedule registration for the next frame.
    pub fn mount(&self, host: &Host, parent: NodeId) -> AfterImageResult<()> {
        match *self.inner.lifecycle.read() {
            Lifecycle::Unmounted => {}
            Lifecycle::Destroyed => {
                return Err(AfterImageError::invalid("cannot remount an unmounted component"))
            }
            _ => return Err(AfterImageError::invalid("component is already mounted")),
        }

        let observer = host.image_loader_observer();
        let transition = host.config().lazy_load.transition();

        let nodes = {
            let props = self.inner.props.read();
            let mut tree = host.tree().write();
            render::render(&mut tree, parent, &props, false, transition)?
        };
        self.listen(host, nodes.image);

        *self.inner.nodes.write() = Some(nodes);
        *self.inner.observer.write() = observer;
        *self.inner.transition.write() = transition;
        *self.inner.lifecycle.write() = Lifecycle::Mounted;

        let weak = Arc::downgrade(&self.inner);
        let tree = host.tree().clone();
        let request = host.request_animation_frame(Arc::new(move |_: f64| {
            if let Some(component) = upgrade(&weak) {
                component.add_image_to_observer(&tree);
            }
        }));
        *self.inner.frame_request.write() = Some(request);

        debug!(container = ?nodes.container, "afterimage mounted");
        Ok(())
    }

    fn listen(&self, host: &Host, image: NodeId) {
        let weak = Arc::downgrade(&self.inner);
        let tree = host.tree().clone();
        let on_load: EventCallback = Arc::new(move |_: &mut Event| {
            if let Some(component) = upgrade(&weak) {
                component.on_image_load(&tree);
            }
        });

        let weak = Arc::downgrade(&self.inner);
        let on_error: EventCallback = Arc::new(move |_: &mut Event| {
            if let Some(component) = upgrade(&weak) {
                component.on_image_error();
            }
        });

        let mut events = host.events().write();
        events.add_listener(image, EventType::Load.as_str(), on_load);
        events.add_listener(image, EventType::Error.as_str(), on_error);
    }

    /// Registration step, run on the frame after mounting.
    fn add_image_to_observer(&self, tree: &RwLock<DomTree>) {
        self.inner.frame_request.write().take();
        if *self.inner.lifecycle.read() != Lifecycle::Mounted {
            return;
        }
        let Some(nodes) = *self.inner.nodes.read() else {
            return;
        };

        let observer = self.inner.observer.read().clone();
        match observer {
            Some(observer) => {
                observer.observe(nodes.container, self.inner.phase.clone());
            }
            None => {
                let src = self.inner.props.read().src.clone();
                // Phase lock is released before the tree is locked
                let triggered = !src.is_empty() && self.inner.phase.write().trigger();
                if triggered {
                    tree.write().set_attribute(nodes.image, SRC_ATTRIBUTE, &src);
                    trace!(%src, "no intersection observer, fetching eagerly");
                }
            }
        }

        *self.inner.lifecycle.write() = Lifecycle::Registered;
    }

    fn on_image_load(&self, tree: &RwLock<DomTree>) {
        if !self.inner.lifecycle.read().is_mounted() {
            return;
        }
        // Only a fetch this component started can complete
        let completed = self.inner.phase.write().complete();
        if !completed {
            trace!("load event outside a triggered fetch ignored");
            return;
        }
        *self.inner.lifecycle.write() = Lifecycle::Loaded;

        if let Err(err) = self.rerender(tree) {
            warn!("afterimage could not show loaded image: {}", err);
        }

        let (src, on_load) = {
            let props = self.inner.props.read();
            (props.src.clone(), props.on_load.clone())
        };
        debug!(%src, "image loaded");
        if let Some(on_load) = on_load {
            on_load();
        }
    }

    fn on_image_error(&self) {
        let src = self.inner.props.read().src.clone();
        warn!(%src, "image failed to load, keeping placeholder");
    }

    /// Apply new options to the mounted nodes.
    ///
    /// A new `src` only takes effect while the fetch has not started yet.
    pub fn update(&self, host: &Host, props: AfterImageProps) -> AfterImageResult<()> {
        let lifecycle = *self.inner.lifecycle.read();
        if lifecycle == Lifecycle::Destroyed {
            return Err(AfterImageError::invalid("cannot update an unmounted component"));
        }

        *self.inner.props.write() = props;
        if lifecycle.is_mounted() {
            self.rerender(host.tree())?;
        }
        Ok(())
    }

    fn rerender(&self, tree: &RwLock<DomTree>) -> AfterImageResult<()> {
        let loaded = self.inner.phase.read().is_loaded();
        let transition = *self.inner.transition.read();

        let props = self.inner.props.read();
        let mut nodes = self.inner.nodes.write();
        let Some(nodes) = nodes.as_mut() else {
            return Ok(());
        };
        let mut tree = tree.write();
        render::reconcile(&mut tree, nodes, &props, loaded, transition)
    }

    /// Unregister and remove the component's nodes. Calling it again is a
    /// no-op.
    pub fn unmount(&self, host: &Host) {
        let previous = std::mem::replace(&mut *self.inner.lifecycle.write(), Lifecycle::Destroyed);
        if previous == Lifecycle::Destroyed {
            return;
        }

        if let Some(request) = self.inner.frame_request.write().take() {
            host.cancel_animation_frame(request);
        }

        let nodes = self.inner.nodes.write().take();
        let observer = self.inner.observer.write().take();
        let Some(nodes) = nodes else {
            return;
        };

        if let Some(observer) = observer {
            observer.unobserve(nodes.container);
        }
        host.events().write().remove_all(nodes.image);
        host.tree().write().remove(nodes.container);
        host.release_image(nodes.image);

        debug!(container = ?nodes.container, "afterimage unmounted");
    }

    pub fn container(&self) -> Option<NodeId> {
        self.inner.nodes.read().map(|nodes| nodes.container)
    }

    pub fn image(&self) -> Option<NodeId> {
        self.inner.nodes.read().map(|nodes| nodes.image)
    }

    pub fn placeholder(&self) -> Option<NodeId> {
        self.inner.nodes.read().and_then(|nodes| nodes.placeholder)
    }

    pub fn phase(&self) -> LoadPhase {
        *self.inner.phase.read()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.inner.lifecycle.read()
    }

    pub fn has_loaded(&self) -> bool {
        self.phase().is_loaded()
    }

    pub fn props(&self) -> AfterImageProps {
        self.inner.props.read().clone()
    }

    /// Markup of the mounted component; empty when not mounted.
    pub fn outer_html(&self, host: &Host) -> String {
        self.container()
            .map(|container| host.outer_html(container))
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for AfterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AfterImage")
            .field("src", &self.inner.props.read().src)
            .field("lifecycle", &self.lifecycle())
            .field("phase", &self.phase())
            .field("nodes", &*self.inner.nodes.read())
            .finish()
    }
}

fn upgrade(weak: &Weak<ComponentInner>) -> Option<AfterImage> {
    weak.upgrade().map(|inner| AfterImage { inner })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfig;
    use crate::observer::CACHE_KEY;
    use crate::render::LOADED_CLASS;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use web_apis::DOMRect;

    fn host() -> Host {
        Host::new(HostConfig::default()).unwrap()
    }

    fn mounted(host: &Host, props: AfterImageProps) -> AfterImage {
        let component = AfterImage::new(props);
        component.mount(host, host.body()).unwrap();
        component
    }

    fn src(host: &Host, component: &AfterImage) -> Option<String> {
        host.tree()
            .read()
            .get_attribute(component.image().unwrap(), "src")
            .map(str::to_string)
    }

    fn style(host: &Host, node: NodeId, property: &str) -> Option<String> {
        host.tree()
            .read()
            .get_element(node)
            .and_then(|element| element.style().get(property).map(str::to_string))
    }

    fn load_counter(props: AfterImageProps) -> (AfterImageProps, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let props = props.on_load(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (props, loads)
    }

    #[test]
    fn test_initial_render_defers_fetch() {
        let host = host();
        let component = mounted(&host, AfterImageProps::new("https://x/1600x900"));
        let image = component.image().unwrap();
        let placeholder = component.placeholder().unwrap();

        assert_eq!(component.lifecycle(), Lifecycle::Mounted);
        assert_eq!(src(&host, &component), None);
        assert_eq!(
            host.tree().read().get_attribute(image, "data-src"),
            Some("https://x/1600x900")
        );
        assert_eq!(style(&host, image, "opacity").as_deref(), Some("0"));
        assert_eq!(style(&host, placeholder, "opacity").as_deref(), Some("1"));
        assert_eq!(style(&host, placeholder, "padding-top").as_deref(), Some("56.25%"));

        // Registration waits for the next frame
        let observer = host.image_loader_observer().unwrap();
        assert!(!observer.is_observing(component.container().unwrap()));

        host.run_animation_frame();
        assert_eq!(component.lifecycle(), Lifecycle::Registered);
        assert!(observer.is_observing(component.container().unwrap()));
        assert_eq!(src(&host, &component), None);
    }

    #[test]
    fn test_visible_crossing_loads_image() {
        let host = host();
        let (props, loads) = load_counter(AfterImageProps::new("https://x/1600x900"));
        let component = mounted(&host, props);
        host.run_animation_frame();

        let container = component.container().unwrap();
        let image = component.image().unwrap();
        assert_eq!(host.report_intersection(container, 0.15), 1);
        assert_eq!(src(&host, &component).as_deref(), Some("https://x/1600x900"));
        assert_eq!(component.phase(), LoadPhase::Triggered);
        assert!(host.is_fetching(image));

        host.finish_image_load(image).unwrap();
        assert!(component.has_loaded());
        assert_eq!(component.lifecycle(), Lifecycle::Loaded);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(host
            .tree()
            .read()
            .get_element(container)
            .unwrap()
            .has_class(LOADED_CLASS));
        assert_eq!(style(&host, image, "opacity").as_deref(), Some("1"));
        assert_eq!(
            style(&host, component.placeholder().unwrap(), "opacity").as_deref(),
            Some("0")
        );

        // A second load signal changes nothing
        host.dispatch_event(image, EventType::Load);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(style(&host, image, "opacity").as_deref(), Some("1"));
    }

    #[test]
    fn test_scrolling_into_view_triggers_fetch() {
        let host = host();
        let component = mounted(&host, AfterImageProps::new("https://x/1"));
        let container = component.container().unwrap();
        host.set_layout_rect(container, DOMRect::new(0.0, 2000.0, 1280.0, 720.0));

        host.run_animation_frame();
        assert_eq!(src(&host, &component), None);

        // 20px of 720 visible: intersecting, under 10%
        host.scroll_to(0.0, 1300.0);
        host.update_intersections();
        assert_eq!(src(&host, &component), None);

        // 100px of 720 visible
        host.scroll_to(0.0, 1380.0);
        host.update_intersections();
        assert_eq!(src(&host, &component).as_deref(), Some("https://x/1"));
    }

    #[test]
    fn test_src_assigned_once() {
        let host = host();
        let component = mounted(&host, AfterImageProps::new("https://x/first"));
        host.run_animation_frame();
        let observer = host.image_loader_observer().unwrap();
        let container = component.container().unwrap();

        for _ in 0..3 {
            host.deliver_intersection(observer.id(), container, 0.5);
        }
        host.tree()
            .write()
            .set_attribute(component.image().unwrap(), "data-src", "https://x/second");
        host.deliver_intersection(observer.id(), container, 1.0);

        assert_eq!(src(&host, &component).as_deref(), Some("https://x/first"));
        assert_eq!(component.phase(), LoadPhase::Triggered);
    }

    #[test]
    fn test_crossing_before_registration_is_ignored() {
        let host = host();
        let component = mounted(&host, AfterImageProps::new("https://x/1"));
        let observer = host.image_loader_observer().unwrap();

        host.deliver_intersection(observer.id(), component.container().unwrap(), 1.0);
        assert_eq!(src(&host, &component), None);
    }

    #[test]
    fn test_eager_fallback_without_observer() {
        let host = Host::new(HostConfig::legacy()).unwrap();
        let component = mounted(&host, AfterImageProps::new("https://x/1600x900"));

        assert_eq!(src(&host, &component), None);
        host.run_animation_frame();
        assert_eq!(src(&host, &component).as_deref(), Some("https://x/1600x900"));
        assert_eq!(component.phase(), LoadPhase::Triggered);
        assert_eq!(component.lifecycle(), Lifecycle::Registered);
        assert!(!host.window().read().has_global(CACHE_KEY));

        host.finish_image_load(component.image().unwrap()).unwrap();
        assert!(component.has_loaded());
    }

    #[test]
    fn test_unmount_before_registration_cancels_frame() {
        let host = host();
        let component = mounted(&host, AfterImageProps::new("https://x/1"));
        let container = component.container().unwrap();
        assert_eq!(host.window().read().pending_animation_frames(), 1);

        component.unmount(&host);
        assert_eq!(host.window().read().pending_animation_frames(), 0);
        assert_eq!(component.lifecycle(), Lifecycle::Destroyed);
        assert!(!host.tree().read().contains(container));
        assert_eq!(component.container(), None);

        host.run_animation_frame();
        let observer = host.image_loader_observer().unwrap();
        assert!(!observer.is_observing(container));
    }

    #[test]
    fn test_late_crossing_after_unmount() {
        let host = host();
        let (props, loads) = load_counter(AfterImageProps::new("https://x/1"));
        let component = mounted(&host, props);
        host.run_animation_frame();

        let container = component.container().unwrap();
        let image = component.image().unwrap();
        let observer = host.image_loader_observer().unwrap();
        component.unmount(&host);

        assert!(!observer.is_observing(container));
        assert_eq!(host.events().read().listener_count(image, "load"), 0);
        assert_eq!(host.report_intersection(container, 0.5), 0);
        assert!(host.deliver_intersection(observer.id(), container, 0.5));
        assert!(!host.tree().read().contains(image));
        assert_eq!(component.phase(), LoadPhase::Pending);

        host.update_intersections();
        assert!(host.finish_image_load(image).is_err());
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        // Unmounting twice is harmless
        component.unmount(&host);
    }

    #[test]
    fn test_observe_twice_and_unknown_unobserve() {
        let host = host();
        let component = mounted(&host, AfterImageProps::new("https://x/1"));
        host.run_animation_frame();
        let observer = host.image_loader_observer().unwrap();
        let container = component.container().unwrap();

        assert!(!observer.observe(container, SharedPhase::default()));
        let stranger = host.tree().write().create_text("stranger".to_string());
        assert!(!observer.unobserve(stranger));
        assert!(observer.is_observing(container));
    }

    #[test]
    fn test_without_placeholder() {
        let host = host();
        let component = mounted(
            &host,
            AfterImageProps::new("https://x/1600x900").with_placeholder(false),
        );
        let container = component.container().unwrap();
        let image = component.image().unwrap();

        assert_eq!(component.placeholder(), None);
        assert_eq!(host.tree().read().children(container).count(), 1);
        assert_eq!(style(&host, image, "position").as_deref(), Some("static"));

        host.run_animation_frame();
        host.report_intersection(container, 0.15);
        host.finish_image_load(image).unwrap();
        assert_eq!(style(&host, image, "opacity").as_deref(), Some("1"));
        assert_eq!(host.tree().read().children(container).count(), 1);
    }

    #[test]
    fn test_custom_aspect_ratio() {
        let host = host();
        let component = mounted(&host, AfterImageProps::new("https://x/1300x400").aspect(400.0, 1300.0));
        let padding = style(&host, component.placeholder().unwrap(), "padding-top").unwrap();
        let value: f64 = padding.trim_end_matches('%').parse().unwrap();
        assert!((value - 100.0 * 400.0 / 1300.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_failure_keeps_placeholder() {
        let host = host();
        let (props, loads) = load_counter(AfterImageProps::new("https://x/broken"));
        let component = mounted(&host, props);
        host.run_animation_frame();
        host.report_intersection(component.container().unwrap(), 1.0);

        host.fail_image_load(component.image().unwrap()).unwrap();
        assert!(!component.has_loaded());
        assert_eq!(component.lifecycle(), Lifecycle::Registered);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert_eq!(
            style(&host, component.placeholder().unwrap(), "opacity").as_deref(),
            Some("1")
        );

        // No retry
        host.report_intersection(component.container().unwrap(), 0.0);
        host.report_intersection(component.container().unwrap(), 1.0);
        assert!(!host.is_fetching(component.image().unwrap()));
    }

    #[test]
    fn test_update_reapplies_props() {
        let host = host();
        let component = mounted(
            &host,
            AfterImageProps::new("https://x/a").attribute("alt", "A"),
        );
        let image = component.image().unwrap();

        component
            .update(
                &host,
                AfterImageProps::new("https://x/b")
                    .attribute("alt", "B")
                    .class_name("hero"),
            )
            .unwrap();
        assert_eq!(host.tree().read().get_attribute(image, "alt"), Some("B"));
        assert_eq!(
            host.tree().read().get_attribute(image, "data-src"),
            Some("https://x/b")
        );
        assert!(host
            .tree()
            .read()
            .get_element(component.container().unwrap())
            .unwrap()
            .has_class("hero"));

        // Not yet fetched: the new locator is the one loaded
        host.run_animation_frame();
        host.report_intersection(component.container().unwrap(), 0.5);
        assert_eq!(src(&host, &component).as_deref(), Some("https://x/b"));

        // Already fetched: no refetch
        component
            .update(&host, AfterImageProps::new("https://x/c"))
            .unwrap();
        assert_eq!(src(&host, &component).as_deref(), Some("https://x/b"));
        assert_eq!(host.tree().read().get_attribute(image, "alt"), None);
    }

    #[test]
    fn test_lifecycle_misuse() {
        let host = host();
        let component = mounted(&host, AfterImageProps::new("https://x/1"));
        assert!(matches!(
            component.mount(&host, host.body()),
            Err(AfterImageError::InvalidOperation(_))
        ));

        let orphan = AfterImage::new(AfterImageProps::new("https://x/2"));
        let gone = host.tree().write().create_text(String::new());
        host.tree().write().remove(gone);
        assert!(matches!(
            orphan.mount(&host, gone),
            Err(AfterImageError::NodeNotFound(_))
        ));
        assert_eq!(orphan.lifecycle(), Lifecycle::Unmounted);

        component.unmount(&host);
        assert!(component.mount(&host, host.body()).is_err());
        assert!(component
            .update(&host, AfterImageProps::new("https://x/3"))
            .is_err());
    }

    #[test]
    fn test_components_share_one_observer() {
        let host = host();
        let components: Vec<_> = (0..3)
            .map(|n| mounted(&host, AfterImageProps::new(format!("https://x/{n}"))))
            .collect();
        for (n, component) in components.iter().enumerate() {
            let y = n as f64 * 1000.0;
            host.set_layout_rect(
                component.container().unwrap(),
                DOMRect::new(0.0, y, 1280.0, 720.0),
            );
        }

        host.run_animation_frame();
        assert_eq!(host.intersections().read().len(), 1);

        let fetched: Vec<_> = components
            .iter()
            .map(|component| src(&host, component).is_some())
            .collect();
        assert_eq!(fetched, vec![true, false, false]);

        host.scroll_to(0.0, 1000.0);
        host.update_intersections();
        let fetched: Vec<_> = components
            .iter()
            .map(|component| src(&host, component).is_some())
            .collect();
        assert_eq!(fetched, vec![true, true, false]);
    }

    #[test]
    fn test_markup() {
        let host = host();
        let component = mounted(
            &host,
            AfterImageProps::new("https://x/1")
                .class_name("hero")
                .attribute("alt", "Coast")
                .attribute("src", "https://eager")
                .with_placeholder(false),
        );

        assert_eq!(
            component.outer_html(&host),
            concat!(
                r#"<div class="afterimage hero">"#,
                r#"<img alt="Coast" class="afterimage__image" data-src="https://x/1" "#,
                r#"style="width: 100%; height: auto; opacity: 0; transition: opacity 300ms ease; position: static; left: 0">"#,
                r#"</div>"#,
            )
        );
    }

    #[test]
    fn test_load_event_before_fetch_is_ignored() {
        let host = host();
        let (props, loads) = load_counter(AfterImageProps::new("https://x/1"));
        let component = mounted(&host, props);
        host.run_animation_frame();
        let image = component.image().unwrap();

        assert_eq!(host.dispatch_event(image, EventType::Load), 1);
        assert_eq!(component.phase(), LoadPhase::Pending);
        assert_eq!(component.lifecycle(), Lifecycle::Registered);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert_eq!(style(&host, image, "opacity").as_deref(), Some("0"));

        // The real fetch still completes afterwards
        host.report_intersection(component.container().unwrap(), 1.0);
        host.finish_image_load(image).unwrap();
        assert!(component.has_loaded());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_on_load_may_mount_another_component() {
        let host = host();
        let second = Arc::new(Mutex::new(None));

        let inner_host = host.clone();
        let slot = second.clone();
        let component = mounted(
            &host,
            AfterImageProps::new("https://x/1").on_load(move || {
                let next = AfterImage::new(AfterImageProps::new("https://x/2"));
                next.mount(&inner_host, inner_host.body()).unwrap();
                *slot.lock() = Some(next);
            }),
        );
        host.run_animation_frame();
        host.report_intersection(component.container().unwrap(), 1.0);
        host.finish_image_load(component.image().unwrap()).unwrap();

        assert!(component.has_loaded());
        let next = second.lock().take().unwrap();
        assert_eq!(next.lifecycle(), Lifecycle::Mounted);
        let next_image = next.image().unwrap();
        assert_eq!(host.events().read().listener_count(next_image, "load"), 1);

        host.run_animation_frame();
        assert_eq!(next.lifecycle(), Lifecycle::Registered);
    }

    #[test]
    fn test_on_load_may_unmount_its_component() {
        let host = host();
        let slot: Arc<Mutex<Option<AfterImage>>> = Arc::new(Mutex::new(None));

        let inner_host = host.clone();
        let own = slot.clone();
        let component = mounted(
            &host,
            AfterImageProps::new("https://x/1").on_load(move || {
                if let Some(component) = own.lock().take() {
                    component.unmount(&inner_host);
                }
            }),
        );
        *slot.lock() = Some(component.clone());
        host.run_animation_frame();

        let container = component.container().unwrap();
        let image = component.image().unwrap();
        host.report_intersection(container, 1.0);
        host.finish_image_load(image).unwrap();

        assert_eq!(component.lifecycle(), Lifecycle::Destroyed);
        assert!(!host.tree().read().contains(container));
        assert_eq!(host.events().read().listener_count(image, "load"), 0);
        assert!(!host.image_loader_observer().unwrap().is_observing(container));
    }

    #[test]
    fn test_unmount_releases_fetch_state() {
        let host = host();
        let components: Vec<_> = (0..3)
            .map(|n| mounted(&host, AfterImageProps::new(format!("https://x/{n}"))))
            .collect();
        host.run_animation_frame();
        for component in &components {
            host.report_intersection(component.container().unwrap(), 1.0);
            host.finish_image_load(component.image().unwrap()).unwrap();
        }
        assert_eq!(host.settled_count(), 3);

        for component in &components {
            component.unmount(&host);
        }
        assert_eq!(host.settled_count(), 0);
    }
}
