//! Effect scheduling
//!
//! Effects are registered against an explicit list of [`Source`]s. Each one
//! is backed by a `spark_signals` effect that reads those sources and marks
//! the callback pending when they change. Callbacks themselves run outside
//! any tracking context: once immediately, then from [`Runtime`]'s queue in
//! registration order, synchronously after the write that made them pending
//! or when the outermost [`Runtime::batch`] closes.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::foundation::collections::{EffectId, SlotMap};

use super::signal::{Signal, Source};

struct EffectSlot {
    order: u64,
    callback: Option<Box<dyn FnMut()>>,
    tracker: Option<Box<dyn FnOnce()>>,
}

pub(crate) struct RuntimeInner {
    effects: RefCell<SlotMap<EffectId, EffectSlot>>,
    pending: RefCell<BTreeMap<u64, EffectId>>,
    next_order: Cell<u64>,
    batch_depth: Cell<u32>,
    flushing: Cell<bool>,
}

/// Handle to the reactive runtime shared by one scene
#[derive(Clone)]
pub struct Runtime {
    pub(crate) inner: Rc<RuntimeInner>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create an empty runtime
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                effects: RefCell::new(SlotMap::with_key()),
                pending: RefCell::new(BTreeMap::new()),
                next_order: Cell::new(0),
                batch_depth: Cell::new(0),
                flushing: Cell::new(false),
            }),
        }
    }

    /// Create a signal bound to this runtime
    pub fn signal<T: 'static>(&self, value: T) -> Signal<T> {
        Signal::new(self, value)
    }

    /// Register an effect that runs now and after every change of `sources`
    pub fn create_effect(&self, sources: &[Source], callback: impl FnMut() + 'static) -> EffectId {
        let order = self.inner.next_order.get();
        self.inner.next_order.set(order + 1);

        let id = self.inner.effects.borrow_mut().insert(EffectSlot {
            order,
            callback: Some(Box::new(callback)),
            tracker: None,
        });

        if !sources.is_empty() {
            let tracker = track_sources(sources.to_vec(), Rc::downgrade(&self.inner), id);
            if let Some(slot) = self.inner.effects.borrow_mut().get_mut(id) {
                slot.tracker = Some(Box::new(tracker));
            }
        }

        self.run_effect(id);
        id
    }

    /// Derived signal recomputed whenever one of `sources` changes
    ///
    /// Dependents are only notified when the computed value differs from the
    /// previous one.
    pub fn memo<T>(&self, sources: &[Source], compute: impl Fn() -> T + 'static) -> (Signal<T>, EffectId)
    where
        T: Clone + PartialEq + 'static,
    {
        let derived = self.signal(compute());
        let target = derived.clone();
        let mut first = true;
        let id = self.create_effect(sources, move || {
            if first {
                first = false;
                return;
            }
            target.set_if_changed(compute());
        });
        (derived, id)
    }

    /// Run `f` with effect re-runs deferred until it returns
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let depth = self.inner.batch_depth.get();
        self.inner.batch_depth.set(depth + 1);
        let result = spark_signals::batch(f);
        self.inner.batch_depth.set(depth);
        if depth == 0 {
            self.flush();
        }
        result
    }

    /// Stop tracking and drop an effect
    pub fn dispose_effect(&self, id: EffectId) {
        let removed = self.inner.effects.borrow_mut().remove(id);
        if let Some(slot) = removed {
            self.inner.pending.borrow_mut().remove(&slot.order);
            if let Some(release) = slot.tracker {
                release();
            }
        }
    }

    /// Number of live effects
    pub fn effect_count(&self) -> usize {
        self.inner.effects.borrow().len()
    }

    /// A signal of this runtime was written
    pub(crate) fn written(&self) {
        if self.inner.batch_depth.get() == 0 {
            self.flush();
        }
    }

    fn mark_pending(&self, id: EffectId) {
        let order = self.inner.effects.borrow().get(id).map(|slot| slot.order);
        if let Some(order) = order {
            self.inner.pending.borrow_mut().insert(order, id);
        }
    }

    fn flush(&self) {
        if self.inner.flushing.replace(true) {
            return;
        }
        loop {
            let next = self.inner.pending.borrow_mut().pop_first();
            match next {
                Some((_, id)) => self.run_effect(id),
                None => break,
            }
        }
        self.inner.flushing.set(false);
    }

    fn run_effect(&self, id: EffectId) {
        // A running effect is taken out of its slot so it can freely touch
        // the runtime, including disposing itself.
        let callback = self
            .inner
            .effects
            .borrow_mut()
            .get_mut(id)
            .and_then(|slot| slot.callback.take());
        let Some(mut callback) = callback else {
            return;
        };

        callback();

        if let Some(slot) = self.inner.effects.borrow_mut().get_mut(id) {
            if slot.callback.is_none() {
                slot.callback = Some(callback);
            }
        }
    }
}

/// Spark effect subscribed to `sources`; returns its dispose function
///
/// The first run only records the dependencies. Later runs mark `id`
/// pending on the runtime, which stays weakly referenced.
fn track_sources(sources: Vec<Source>, runtime: Weak<RuntimeInner>, id: EffectId) -> impl FnOnce() {
    let mut subscribed = false;
    spark_signals::effect_sync(move || {
        for source in &sources {
            source.track();
        }
        if std::mem::replace(&mut subscribed, true) {
            if let Some(inner) = runtime.upgrade() {
                Runtime { inner }.mark_pending(id);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_runs_immediately_and_on_change() {
        let rt = Runtime::new();
        let count = rt.signal(1);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = seen.clone();
        let reader = count.clone();
        rt.create_effect(&[count.source()], move || log.borrow_mut().push(reader.get()));

        count.set(2);
        count.set(3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_disposed_effect_stops_running() {
        let rt = Runtime::new();
        let value = rt.signal(0);
        let runs = Rc::new(Cell::new(0));

        let counter = runs.clone();
        let id = rt.create_effect(&[value.source()], move || counter.set(counter.get() + 1));
        rt.dispose_effect(id);
        value.set(1);

        assert_eq!(runs.get(), 1);
        assert_eq!(rt.effect_count(), 0);
    }

    #[test]
    fn test_batch_runs_dependents_once_in_registration_order() {
        let rt = Runtime::new();
        let a = rt.signal(0);
        let b = rt.signal(0);
        let order = Rc::new(RefCell::new(Vec::new()));

        let log = order.clone();
        rt.create_effect(&[b.source()], move || log.borrow_mut().push("first"));
        let log = order.clone();
        rt.create_effect(&[a.source(), b.source()], move || log.borrow_mut().push("second"));
        order.borrow_mut().clear();

        rt.batch(|| {
            a.set(1);
            b.set(1);
            a.set(2);
        });
        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_memo_only_notifies_on_new_value() {
        let rt = Runtime::new();
        let n = rt.signal(3);
        let source = n.clone();
        let (parity, _) = rt.memo(&[n.source()], move || source.get() % 2);
        let runs = Rc::new(Cell::new(0));

        let counter = runs.clone();
        rt.create_effect(&[parity.source()], move || counter.set(counter.get() + 1));
        n.set(5);
        assert_eq!(runs.get(), 1);
        n.set(6);
        assert_eq!(runs.get(), 2);
        assert_eq!(parity.get(), 0);
    }

    #[test]
    fn test_effect_may_write_signals_observed_by_later_effects() {
        let rt = Runtime::new();
        let input = rt.signal(1);
        let doubled = rt.signal(0);

        let (reader, writer) = (input.clone(), doubled.clone());
        rt.create_effect(&[input.source()], move || writer.set(reader.get() * 2));
        let observed = Rc::new(Cell::new(0));
        let (sink, reader) = (observed.clone(), doubled.clone());
        rt.create_effect(&[doubled.source()], move || sink.set(reader.get()));

        input.set(21);
        assert_eq!(observed.get(), 42);
    }

    #[test]
    fn test_effect_created_inside_effect_outlives_outer_rerun() {
        let rt = Runtime::new();
        let outer = rt.signal(0);
        let inner = rt.signal(0);
        let inner_runs = Rc::new(Cell::new(0));

        let (runtime, source, counter) = (rt.clone(), inner.clone(), inner_runs.clone());
        let mut created = false;
        rt.create_effect(&[outer.source()], move || {
            if !std::mem::replace(&mut created, true) {
                let counter = counter.clone();
                runtime.create_effect(&[source.source()], move || counter.set(counter.get() + 1));
            }
        });

        outer.set(1);
        inner.set(1);
        assert_eq!(inner_runs.get(), 2);
        assert_eq!(rt.effect_count(), 2);
    }
}
