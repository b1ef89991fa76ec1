//! Frame clock
//!
//! A single per-frame tick broadcast in ordered phases. Callbacks receive the
//! elapsed milliseconds of the frame. Within a phase, callbacks run in the
//! order they subscribed. A callback may subscribe or unsubscribe others, or
//! itself, while the tick is running; new subscribers first run on the next
//! tick of their phase.

use std::cell::RefCell;
use std::rc::Rc;

use crate::foundation::collections::{FrameKey, SlotMap};

use super::owner::Owner;

/// Ordered phases of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FramePhase {
    /// Physics step, collision dispatch and body mirroring
    Physics,
    /// Spring integration and other animation drivers
    Animation,
    /// Last chance to touch the scene before it is handed to the renderer
    BeforeRender,
    /// After the renderer consumed the frame
    AfterRender,
}

impl FramePhase {
    /// All phases in execution order
    pub const ALL: [Self; 4] = [Self::Physics, Self::Animation, Self::BeforeRender, Self::AfterRender];
}

type FrameCallback = Box<dyn FnMut(f32)>;

struct FrameEntry {
    phase: FramePhase,
    order: u64,
    callback: Option<FrameCallback>,
}

#[derive(Default)]
struct ClockInner {
    entries: SlotMap<FrameKey, FrameEntry>,
    next_order: u64,
}

/// Shared handle to the per-frame callback registry
#[derive(Clone, Default)]
pub struct FrameClock {
    inner: Rc<RefCell<ClockInner>>,
}

impl FrameClock {
    /// Create an empty clock
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` to run once per frame in `phase`
    pub fn subscribe(&self, phase: FramePhase, callback: impl FnMut(f32) + 'static) -> FrameKey {
        let mut inner = self.inner.borrow_mut();
        let order = inner.next_order;
        inner.next_order += 1;
        inner.entries.insert(FrameEntry {
            phase,
            order,
            callback: Some(Box::new(callback)),
        })
    }

    /// Remove a registration; returns whether it existed
    pub fn unsubscribe(&self, key: FrameKey) -> bool {
        self.inner.borrow_mut().entries.remove(key).is_some()
    }

    /// Whether `key` is still registered
    pub fn is_subscribed(&self, key: FrameKey) -> bool {
        self.inner.borrow().entries.contains_key(key)
    }

    /// Number of registered callbacks across all phases
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every callback of `phase`
    pub fn tick(&self, phase: FramePhase, delta_ms: f32) {
        let mut keys: Vec<(u64, FrameKey)> = self
            .inner
            .borrow()
            .entries
            .iter()
            .filter(|(_, entry)| entry.phase == phase)
            .map(|(key, entry)| (entry.order, key))
            .collect();
        keys.sort_unstable_by_key(|(order, _)| *order);

        for (_, key) in keys {
            let callback = self
                .inner
                .borrow_mut()
                .entries
                .get_mut(key)
                .and_then(|entry| entry.callback.take());
            let Some(mut callback) = callback else {
                continue;
            };

            callback(delta_ms);

            if let Some(entry) = self.inner.borrow_mut().entries.get_mut(key) {
                entry.callback = Some(callback);
            }
        }
    }
}

/// Run `callback` every frame in `phase` until `owner` is disposed
pub fn create_frame_effect(
    owner: &Owner,
    clock: &FrameClock,
    phase: FramePhase,
    callback: impl FnMut(f32) + 'static,
) -> FrameKey {
    let key = clock.subscribe(phase, callback);
    let clock = clock.clone();
    owner.on_cleanup(move || {
        clock.unsubscribe(key);
    });
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Runtime;
    use std::cell::Cell;

    #[test]
    fn test_phases_run_in_order_with_registration_order_inside() {
        let clock = FrameClock::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (phase, label) in [
            (FramePhase::AfterRender, "after"),
            (FramePhase::Animation, "anim-1"),
            (FramePhase::Physics, "physics"),
            (FramePhase::Animation, "anim-2"),
        ] {
            let log = log.clone();
            clock.subscribe(phase, move |_| log.borrow_mut().push(label));
        }

        for phase in FramePhase::ALL {
            clock.tick(phase, 16.0);
        }
        assert_eq!(*log.borrow(), vec!["physics", "anim-1", "anim-2", "after"]);
    }

    #[test]
    fn test_callback_can_unsubscribe_itself() {
        let clock = FrameClock::new();
        let runs = Rc::new(Cell::new(0));
        let key_slot: Rc<Cell<Option<FrameKey>>> = Rc::new(Cell::new(None));

        let (counter, slot, handle) = (runs.clone(), key_slot.clone(), clock.clone());
        let key = clock.subscribe(FramePhase::Animation, move |_| {
            counter.set(counter.get() + 1);
            if let Some(key) = slot.get() {
                handle.unsubscribe(key);
            }
        });
        key_slot.set(Some(key));

        for phase in FramePhase::ALL {
            clock.tick(phase, 16.0);
        }
        for phase in FramePhase::ALL {
            clock.tick(phase, 16.0);
        }
        assert_eq!(runs.get(), 1);
        assert!(clock.is_empty());
    }

    #[test]
    fn test_frame_effect_removed_with_owner() {
        let rt = Runtime::new();
        let owner = Owner::root(&rt);
        let clock = FrameClock::new();
        let elapsed = Rc::new(Cell::new(0.0));

        let total = elapsed.clone();
        create_frame_effect(&owner, &clock, FramePhase::BeforeRender, move |dt| total.set(total.get() + dt));
        clock.tick(FramePhase::BeforeRender, 10.0);
        owner.dispose();
        clock.tick(FramePhase::BeforeRender, 10.0);

        assert!((elapsed.get() - 10.0).abs() < f32::EPSILON);
        assert!(clock.is_empty());
    }
}
