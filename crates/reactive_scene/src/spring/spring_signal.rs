//! Reactive springs
//!
//! A [`SpringSignals`] publishes its channel values and velocities as
//! signals. It is dormant while at rest. Changing the target subscribes one
//! frame callback in [`FramePhase::Animation`] which steps the spring by the
//! frame delta and unsubscribes itself once every channel rests again.
//! Frame deltas are clamped to a maximum step (0.1 s unless configured)
//! and integrated in sub-steps of at most 1/60 s.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::foundation::collections::FrameKey;
use crate::reactive::{FrameClock, FramePhase, Owner, Runtime, Signal};

use super::stepper::{SpringParams, SpringState};

/// Longest time a spring integrates in one frame, in seconds
pub const DEFAULT_MAX_STEP_SECS: f32 = 0.1;

const SUBSTEP_SECS: f32 = 1.0 / 60.0;

/// Frame delta in seconds, clamped to `[0, max_step]`
fn step_secs(delta_ms: f32, max_step: f32) -> f32 {
    let dt = delta_ms / 1000.0;
    if dt.is_nan() {
        return 0.0;
    }
    dt.clamp(0.0, max_step)
}

/// Spring over `N` channels driven by the frame clock
pub struct SpringSignals<const N: usize> {
    values: Signal<[f32; N]>,
    velocities: Signal<[f32; N]>,
    state: Rc<RefCell<SpringState<N>>>,
    driver: Rc<Cell<Option<FrameKey>>>,
    max_step: Rc<Cell<f32>>,
    clock: FrameClock,
    runtime: Runtime,
}

/// Single-channel spring
pub type Spring = SpringSignals<1>;

impl<const N: usize> SpringSignals<N> {
    /// Create a resting spring whose driver is released with `owner`
    pub fn new(owner: &Owner, clock: &FrameClock, initial: [f32; N], params: SpringParams) -> Self {
        Self::from_state(owner, clock, SpringState::new(initial, params))
    }

    /// Create a spring from explicit state (per-channel params, initial velocities)
    pub fn from_state(owner: &Owner, clock: &FrameClock, state: SpringState<N>) -> Self {
        let runtime = owner.runtime().clone();
        let spring = Self {
            values: runtime.signal(state.values),
            velocities: runtime.signal(state.velocities),
            state: Rc::new(RefCell::new(state)),
            driver: Rc::new(Cell::new(None)),
            max_step: Rc::new(Cell::new(DEFAULT_MAX_STEP_SECS)),
            clock: clock.clone(),
            runtime,
        };

        let (driver, clock) = (Rc::clone(&spring.driver), clock.clone());
        owner.on_cleanup(move || {
            if let Some(key) = driver.take() {
                clock.unsubscribe(key);
            }
        });

        if !spring.state.borrow().is_at_rest() {
            spring.wake();
        }
        spring
    }

    /// Channel values
    pub fn values(&self) -> &Signal<[f32; N]> {
        &self.values
    }

    /// Channel velocities
    pub fn velocities(&self) -> &Signal<[f32; N]> {
        &self.velocities
    }

    /// Current targets
    pub fn targets(&self) -> [f32; N] {
        self.state.borrow().targets
    }

    /// Bound the step taken on long frames
    pub fn set_max_step(&self, secs: f32) {
        self.max_step.set(secs.max(0.0));
    }

    /// Whether a frame callback is currently driving the spring
    pub fn is_active(&self) -> bool {
        self.driver.get().is_some()
    }

    /// Retarget the spring; a no-op when the targets are unchanged
    #[allow(clippy::float_cmp)]
    pub fn set_target(&self, targets: [f32; N]) {
        {
            let mut state = self.state.borrow_mut();
            if state.targets == targets {
                return;
            }
            state.targets = targets;
        }
        self.wake();
    }

    fn wake(&self) {
        if self.driver.get().is_some() {
            return;
        }

        let state = Rc::clone(&self.state);
        let driver = Rc::clone(&self.driver);
        let max_step = Rc::clone(&self.max_step);
        let clock = self.clock.clone();
        let runtime = self.runtime.clone();
        let (values, velocities) = (self.values.clone(), self.velocities.clone());

        let key = self.clock.subscribe(FramePhase::Animation, move |delta_ms| {
            let (next_values, next_velocities, at_rest) = {
                let mut state = state.borrow_mut();
                let at_rest = advance(&mut state, step_secs(delta_ms, max_step.get()));
                (state.values, state.velocities, at_rest)
            };
            runtime.batch(|| {
                values.set(next_values);
                velocities.set(next_velocities);
            });
            if at_rest {
                if let Some(key) = driver.take() {
                    clock.unsubscribe(key);
                }
            }
        });
        self.driver.set(Some(key));
    }
}

/// Integrate `dt` seconds in sub-steps; stops early once every channel rests
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn advance<const N: usize>(state: &mut SpringState<N>, dt: f32) -> bool {
    // A 60 Hz frame must stay a single step despite rounding.
    let substeps = ((dt / SUBSTEP_SECS) - 1e-3).ceil().max(1.0) as u32;
    let h = dt / substeps as f32;
    for _ in 0..substeps {
        if state.step(h) {
            return true;
        }
    }
    false
}

impl SpringSignals<1> {
    /// Current value
    pub fn value(&self) -> f32 {
        self.values.get()[0]
    }

    /// Retarget the single channel
    pub fn set(&self, target: f32) {
        self.set_target([target]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spring::SpringPreset;
    use approx::assert_relative_eq;

    fn setup() -> (Runtime, Owner, FrameClock) {
        let runtime = Runtime::new();
        let owner = Owner::root(&runtime);
        (runtime, owner, FrameClock::new())
    }

    #[test]
    fn test_dormant_until_target_changes() {
        let (_rt, owner, clock) = setup();
        let spring = Spring::new(&owner, &clock, [0.0], SpringParams::default());
        assert!(!spring.is_active());
        assert!(clock.is_empty());

        spring.set(0.0);
        assert!(!spring.is_active());

        spring.set(1.0);
        assert!(spring.is_active());
        assert_eq!(clock.len(), 1);
    }

    #[test]
    fn test_settles_and_deregisters() {
        let (_rt, owner, clock) = setup();
        let spring = Spring::new(&owner, &clock, [0.0], SpringPreset::Wobbly.params());
        spring.set(5.0);

        for _ in 0..300 {
            clock.tick(FramePhase::Animation, 1000.0 / 60.0);
        }
        assert_relative_eq!(spring.value(), 5.0);
        assert_eq!(spring.velocities().get(), [0.0]);
        assert!(!spring.is_active());
        assert!(clock.is_empty());
    }

    #[test]
    fn test_value_and_velocity_published_together() {
        let (rt, owner, clock) = setup();
        let spring = SpringSignals::<3>::new(&owner, &clock, [0.0; 3], SpringParams::default());
        let runs = Rc::new(Cell::new(0));

        let counter = runs.clone();
        rt.create_effect(&[spring.values().source(), spring.velocities().source()], move || {
            counter.set(counter.get() + 1);
        });
        spring.set_target([1.0, 2.0, 3.0]);
        clock.tick(FramePhase::Animation, 16.0);

        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_owner_dispose_removes_driver() {
        let (_rt, owner, clock) = setup();
        let spring = Spring::new(&owner, &clock, [0.0], SpringParams::default());
        spring.set(10.0);
        owner.dispose();

        assert!(clock.is_empty());
        clock.tick(FramePhase::Animation, 16.0);
        assert_relative_eq!(spring.value(), 0.0);
    }

    #[test]
    fn test_initial_velocity_starts_driver() {
        let (_rt, owner, clock) = setup();
        let state = SpringState::new([0.0], SpringParams::default()).with_velocities([3.0]);
        let spring = Spring::from_state(&owner, &clock, state);
        assert!(spring.is_active());

        clock.tick(FramePhase::Animation, 16.0);
        assert!(spring.value() > 0.0);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let (_rt, owner, clock) = setup();
        let spring = Spring::new(&owner, &clock, [0.0], SpringParams::default());
        spring.set(1.0);
        clock.tick(FramePhase::Animation, 1000.0 / 60.0);
        clock.tick(FramePhase::Animation, 1000.0 / 60.0);

        clock.tick(FramePhase::Animation, 1000.0);
        assert!(spring.value().abs() <= 2.0, "value {} after a 1 s frame", spring.value());
    }

    #[test]
    fn test_sixty_hz_frame_is_one_step() {
        let params = SpringPreset::Wobbly.params();
        let mut stepped = SpringState::new([0.0], params);
        stepped.targets = [3.0];
        let mut single = stepped.clone();

        advance(&mut stepped, step_secs(1000.0 / 60.0, DEFAULT_MAX_STEP_SECS));
        single.step(1000.0 / 60.0 / 1000.0);
        assert_relative_eq!(stepped.values[0], single.values[0]);
    }

    #[test]
    fn test_step_secs_bounds() {
        assert_relative_eq!(step_secs(16.0, 0.1), 0.016);
        assert_relative_eq!(step_secs(5000.0, 0.1), 0.1);
        assert_relative_eq!(step_secs(-3.0, 0.1), 0.0);
        assert_relative_eq!(step_secs(f32::NAN, 0.1), 0.0);
    }
}
