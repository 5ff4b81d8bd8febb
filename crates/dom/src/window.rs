//! DOM Window object implementation.

use bitflags::bitflags;
use indexmap::IndexMap;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

bitflags! {
    /// Platform capabilities exposed on the window.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct WindowFeatures: u32 {
        const INTERSECTION_OBSERVER = 1 << 0;
    }
}

impl Default for WindowFeatures {
    fn default() -> Self {
        WindowFeatures::all()
    }
}

/// Animation frame callback type.
pub type AnimationFrameCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Browser window object.
pub struct Window {
    /// Inner dimensions.
    pub inner_width: u32,
    pub inner_height: u32,
    /// Scroll position.
    pub scroll_x: f64,
    pub scroll_y: f64,
    /// Device pixel ratio.
    pub device_pixel_ratio: f64,
    /// Available platform capabilities.
    features: WindowFeatures,
    /// Animation frames, in request order.
    animation_frames: IndexMap<u32, AnimationFrameCallback>,
    next_frame_id: u32,
    /// Named global slots (`window[key]`).
    globals: HashMap<String, Arc<dyn Any + Send + Sync>>,
    /// Origin of `now()`.
    time_origin: Instant,
}

impl Window {
    pub fn new() -> Self {
        Self {
            inner_width: 1920,
            inner_height: 1080,
            scroll_x: 0.0,
            scroll_y: 0.0,
            device_pixel_ratio: 1.0,
            features: WindowFeatures::default(),
            animation_frames: IndexMap::new(),
            next_frame_id: 1,
            globals: HashMap::new(),
            time_origin: Instant::now(),
        }
    }

    /// Create a window exposing only the given capabilities.
    pub fn with_features(features: WindowFeatures) -> Self {
        Self {
            features,
            ..Self::new()
        }
    }

    /// Check whether the platform exposes a capability.
    pub fn supports(&self, feature: WindowFeatures) -> bool {
        self.features.contains(feature)
    }

    /// Milliseconds since the window was created (`performance.now()`).
    pub fn now(&self) -> f64 {
        self.time_origin.elapsed().as_secs_f64() * 1000.0
    }

    /// Request animation frame.
    pub fn request_animation_frame(&mut self, callback: AnimationFrameCallback) -> u32 {
        let id = self.next_frame_id;
        self.next_frame_id += 1;
        self.animation_frames.insert(id, callback);
        id
    }

    /// Cancel animation frame. Unknown ids are ignored.
    pub fn cancel_animation_frame(&mut self, id: u32) {
        self.animation_frames.shift_remove(&id);
    }

    /// Number of frame callbacks waiting for the next frame.
    pub fn pending_animation_frames(&self) -> usize {
        self.animation_frames.len()
    }

    /// Take the callbacks of the next frame, in request order.
    ///
    /// Callbacks requested while these run belong to the following frame.
    pub fn take_animation_frames(&mut self) -> Vec<AnimationFrameCallback> {
        self.animation_frames.drain(..).map(|(_, cb)| cb).collect()
    }

    /// Read a global slot, if present and of the requested type.
    pub fn global<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.globals
            .get(key)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Write a global slot, replacing any previous value.
    pub fn set_global<T>(&mut self, key: &str, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.globals.insert(key.to_string(), Arc::new(value));
    }

    pub fn has_global(&self, key: &str) -> bool {
        self.globals.contains_key(key)
    }

    /// Scroll to position.
    pub fn scroll_to(&mut self, x: f64, y: f64) {
        self.scroll_x = x.max(0.0);
        self.scroll_y = y.max(0.0);
    }

    /// Resize the viewport.
    pub fn resize_to(&mut self, width: u32, height: u32) {
        self.inner_width = width;
        self.inner_height = height;
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new()
    }
}
