//! Reactive effect adapter
//!
//! A push-based layer over `spark_signals`: [`Signal`]s hold values in spark
//! sources, effects declare the signals they depend on and re-run
//! synchronously in registration order when those change, and [`Owner`]s
//! bind effects and cleanups to the lifetime of a mounted component. The
//! [`FrameClock`] provides the "run once per frame" primitive used by
//! physics and springs.

pub mod frame;
pub mod owner;
pub mod runtime;
pub mod signal;

pub use frame::{create_frame_effect, FrameClock, FramePhase};
pub use owner::Owner;
pub use runtime::Runtime;
pub use signal::{Prop, Signal, Source};
