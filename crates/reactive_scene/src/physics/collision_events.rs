//! Per-collider collision listeners
//!
//! The world reports pairwise begin/end transitions. Each side of a pair is
//! looked up independently at dispatch time and notified with the other
//! collider's handle, so a listener removed by an earlier callback (or
//! between the step and the drain) is simply skipped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use rapier3d::prelude::{ColliderHandle, CollisionEvent};

/// Callback receiving the handle of the other collider
pub type CollisionCallback = Rc<dyn Fn(ColliderHandle)>;

/// A begin or end of contact between two colliders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionTransition {
    /// First collider of the pair
    pub collider1: ColliderHandle,
    /// Second collider of the pair
    pub collider2: ColliderHandle,
    /// `true` when contact began, `false` when it ended
    pub started: bool,
}

impl From<CollisionEvent> for CollisionTransition {
    fn from(event: CollisionEvent) -> Self {
        Self {
            collider1: event.collider1(),
            collider2: event.collider2(),
            started: event.started(),
        }
    }
}

/// Begin and end callbacks registered for one collider
#[derive(Clone, Default)]
pub struct CollisionListener {
    /// Called when contact with another collider begins
    pub on_start: Option<CollisionCallback>,
    /// Called when contact with another collider ends
    pub on_end: Option<CollisionCallback>,
}

impl CollisionListener {
    /// Whether neither callback is set
    pub fn is_empty(&self) -> bool {
        self.on_start.is_none() && self.on_end.is_none()
    }
}

impl fmt::Debug for CollisionListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollisionListener")
            .field("on_start", &self.on_start.is_some())
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

/// Map from collider handle to its listener
#[derive(Default)]
pub struct CollisionListeners {
    listeners: HashMap<ColliderHandle, CollisionListener>,
}

impl CollisionListeners {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `handle`, replacing any previous one.
    ///
    /// An empty listener removes the registration.
    pub fn register(&mut self, handle: ColliderHandle, listener: CollisionListener) {
        if listener.is_empty() {
            self.listeners.remove(&handle);
        } else {
            self.listeners.insert(handle, listener);
        }
    }

    /// Remove the registration of `handle`
    pub fn unregister(&mut self, handle: ColliderHandle) -> bool {
        self.listeners.remove(&handle).is_some()
    }

    /// Whether `handle` has a registration
    pub fn contains(&self, handle: ColliderHandle) -> bool {
        self.listeners.contains_key(&handle)
    }

    /// Number of registered colliders
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn callback(&self, handle: ColliderHandle, started: bool) -> Option<CollisionCallback> {
        let listener = self.listeners.get(&handle)?;
        if started {
            listener.on_start.clone()
        } else {
            listener.on_end.clone()
        }
    }

    /// Notify both sides of `event`.
    ///
    /// The registry is not borrowed while callbacks run, so callbacks may
    /// register or unregister listeners.
    pub fn dispatch(listeners: &RefCell<Self>, event: CollisionTransition) {
        for (handle, other) in [(event.collider1, event.collider2), (event.collider2, event.collider1)] {
            let callback = listeners.borrow().callback(handle, event.started);
            if let Some(callback) = callback {
                callback(other);
            }
        }
    }
}
