//! Foundation module
//!
//! Shared building blocks for the rest of the crate: nalgebra aliases and
//! transforms, slotmap handle types for the node, effect, frame and physics
//! registries, a frame timer and `env_logger` setup.

pub mod collections;
pub mod logging;
pub mod math;
pub mod time;
