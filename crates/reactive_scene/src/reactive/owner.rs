//! Ownership tree for mounted components
//!
//! Every mounted component gets an [`Owner`]. Effects and cleanup callbacks
//! are registered on it, and disposing it tears everything down
//! synchronously: child owners first (newest first), then effects, then
//! cleanups in reverse registration order. Cleanups are held by a detached
//! `spark_signals` effect scope. Dropping the last handle of an owner
//! disposes it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::{effect_scope, on_scope_dispose, EffectScope};

use crate::foundation::collections::EffectId;

use super::runtime::Runtime;
use super::signal::{Signal, Source};

struct OwnerInner {
    runtime: Runtime,
    effects: RefCell<Vec<EffectId>>,
    cleanups: EffectScope,
    children: RefCell<Vec<Owner>>,
    disposed: Cell<bool>,
}

impl OwnerInner {
    fn teardown(&self) {
        if self.disposed.replace(true) {
            return;
        }

        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children.iter().rev() {
            child.dispose();
        }

        let effects = std::mem::take(&mut *self.effects.borrow_mut());
        for id in effects {
            self.runtime.dispose_effect(id);
        }

        self.cleanups.stop();
    }
}

impl Drop for OwnerInner {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Lifetime scope of a mounted component
#[derive(Clone)]
pub struct Owner {
    inner: Rc<OwnerInner>,
}

impl Owner {
    /// Create a root owner
    pub fn root(runtime: &Runtime) -> Self {
        Self {
            inner: Rc::new(OwnerInner {
                runtime: runtime.clone(),
                effects: RefCell::new(Vec::new()),
                cleanups: effect_scope(true),
                children: RefCell::new(Vec::new()),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Create an owner disposed together with this one
    pub fn child(&self) -> Self {
        let child = Self::root(&self.inner.runtime);
        if self.is_disposed() {
            child.dispose();
        } else {
            let mut children = self.inner.children.borrow_mut();
            children.retain(|existing| !existing.is_disposed());
            children.push(child.clone());
        }
        child
    }

    /// Runtime this owner registers effects with
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Register an effect whose lifetime is bound to this owner
    pub fn effect(&self, sources: &[Source], callback: impl FnMut() + 'static) -> EffectId {
        let id = self.inner.runtime.create_effect(sources, callback);
        self.adopt(id);
        id
    }

    /// Register a memo whose recomputation is bound to this owner
    pub fn memo<T>(&self, sources: &[Source], compute: impl Fn() -> T + 'static) -> Signal<T>
    where
        T: Clone + PartialEq + 'static,
    {
        let (derived, id) = self.inner.runtime.memo(sources, compute);
        self.adopt(id);
        derived
    }

    fn adopt(&self, id: EffectId) {
        if self.is_disposed() {
            self.inner.runtime.dispose_effect(id);
        } else {
            self.inner.effects.borrow_mut().push(id);
        }
    }

    /// Run `f` when this owner is disposed (immediately if it already is)
    pub fn on_cleanup(&self, f: impl FnOnce() + 'static) {
        let mut cleanup = Some(f);
        self.inner.cleanups.run(|| {
            if let Some(f) = cleanup.take() {
                on_scope_dispose(f);
            }
        });
        if let Some(f) = cleanup {
            f();
        }
    }

    /// Whether [`Owner::dispose`] has run
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Tear down children, effects and cleanups
    pub fn dispose(&self) {
        self.inner.teardown();
    }
}
