//! Spring integrator
//!
//! Deterministic damped springs used to animate scene values. The pure
//! stepping lives in [`stepper`]; [`spring_signal`] wraps it in signals
//! driven by the frame clock.

pub mod spring_signal;
pub mod stepper;

pub use spring_signal::{Spring, SpringSignals, DEFAULT_MAX_STEP_SECS};
pub use stepper::{step, SpringParams, SpringPreset, SpringState};
