//! Physics bridge
//!
//! Wraps a rapier world and keeps it in step with the scene graph: clamped
//! single-step timestep, pairwise collision begin/end dispatch, mirroring of
//! dynamic bodies into (possibly parented) nodes, kinematic character
//! controllers and static triangle-mesh colliders that follow their meshes.

pub mod bridge;
pub mod collision_events;
pub mod descriptors;
pub mod managed_body;
pub mod world;

use thiserror::Error;

pub use bridge::{mirror_pose, CharacterDriver, CharacterHook, PhysicsBridge, PhysicsHandle};
pub use collision_events::{CollisionCallback, CollisionListener, CollisionListeners, CollisionTransition};
pub use descriptors::{BodyDesc, BodyKind, ColliderDesc, ColliderShape};
pub use managed_body::{BodyState, ManagedBody};
pub use world::PhysicsWorld;

pub use rapier3d::control::KinematicCharacterController;
pub use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};

/// Physics errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhysicsError {
    /// The rigid body handle does not resolve
    #[error("Rigid body not found")]
    BodyNotFound,

    /// The collider handle does not resolve
    #[error("Collider not found")]
    ColliderNotFound,

    /// Collider geometry was rejected by the physics engine
    #[error("Invalid collider geometry: {0}")]
    InvalidGeometry(String),
}
