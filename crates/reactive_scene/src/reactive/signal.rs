//! Signals, type-erased sources and component properties
//!
//! Values live in `spark_signals` sources. Every write is treated as a
//! change, so dependents re-run even for equal values; use
//! [`Signal::set_if_changed`] to skip those.

use std::fmt;
use std::rc::{Rc, Weak};

use spark_signals::{never_equals, track_read, AnySource};

use crate::foundation::math::Vec3;

use super::runtime::{Runtime, RuntimeInner};

/// Type-erased handle an effect can depend on
#[derive(Clone)]
pub struct Source(Rc<dyn AnySource>);

impl Source {
    /// Record a read of this source in the running tracking effect
    pub(crate) fn track(&self) {
        track_read(Rc::clone(&self.0));
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Source")
    }
}

/// Shared mutable value that re-runs dependent effects when written
pub struct Signal<T> {
    inner: Rc<spark_signals::Signal<T>>,
    runtime: Weak<RuntimeInner>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            runtime: Weak::clone(&self.runtime),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.with(|value| f.debug_tuple("Signal").field(value).finish())
    }
}

impl<T: 'static> Signal<T> {
    /// Create a signal owned by `runtime`
    pub fn new(runtime: &Runtime, value: T) -> Self {
        Self {
            inner: Rc::new(spark_signals::Signal::new_with_equals(value, never_equals)),
            runtime: Rc::downgrade(&runtime.inner),
        }
    }

    /// Dependency handle for [`Runtime::create_effect`]
    pub fn source(&self) -> Source {
        Source(self.inner.as_any_source())
    }

    /// Borrow the current value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    /// Replace the value and notify dependents
    pub fn set(&self, value: T) {
        self.inner.set(value);
        self.written();
    }

    fn written(&self) {
        if let Some(inner) = self.runtime.upgrade() {
            Runtime { inner }.written();
        }
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Clone out the current value
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Mutate the value in place and notify dependents
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.inner.update(f);
        self.written();
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Write only when the value differs; returns whether dependents were notified
    pub fn set_if_changed(&self, value: T) -> bool {
        if self.inner.with(|current| *current == value) {
            return false;
        }
        self.set(value);
        true
    }
}

/// Component property: either a constant or a reactive signal
#[derive(Clone)]
pub enum Prop<T> {
    /// Fixed value
    Value(T),
    /// Value tracked from a signal
    Signal(Signal<T>),
}

impl<T: Clone + 'static> Prop<T> {
    /// Current value
    pub fn get(&self) -> T {
        match self {
            Self::Value(value) => value.clone(),
            Self::Signal(signal) => signal.get(),
        }
    }

    /// Sources to depend on (empty for constants)
    pub fn sources(&self) -> Vec<Source> {
        match self {
            Self::Value(_) => Vec::new(),
            Self::Signal(signal) => vec![signal.source()],
        }
    }
}

impl<T: Default> Default for Prop<T> {
    fn default() -> Self {
        Self::Value(T::default())
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Prop<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Signal(signal) => f.debug_tuple("Signal").field(signal).finish(),
        }
    }
}

impl<T> From<Signal<T>> for Prop<T> {
    fn from(signal: Signal<T>) -> Self {
        Self::Signal(signal)
    }
}

impl<T> From<&Signal<T>> for Prop<T> {
    fn from(signal: &Signal<T>) -> Self {
        Self::Signal(signal.clone())
    }
}

impl From<Vec3> for Prop<Vec3> {
    fn from(value: Vec3) -> Self {
        Self::Value(value)
    }
}

impl From<[f32; 3]> for Prop<Vec3> {
    fn from(value: [f32; 3]) -> Self {
        Self::Value(Vec3::from(value))
    }
}

impl From<&str> for Prop<String> {
    fn from(value: &str) -> Self {
        Self::Value(value.to_owned())
    }
}

impl From<String> for Prop<String> {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}
