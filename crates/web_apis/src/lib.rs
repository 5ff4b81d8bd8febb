//! Web APIs implementation.
//!
//! This crate provides the platform observers the lazy image component
//! builds on:
//! - Intersection Observer API

pub mod intersection_observer;

pub use intersection_observer::{
    DOMRect, IntersectionCallback, IntersectionNotification, IntersectionObserver,
    IntersectionObserverController, IntersectionObserverEntry, IntersectionObserverOptions,
    ObserverId, RootMargin, Threshold,
};
