//! # Reactive Scene
//!
//! Declarative scene descriptions kept in sync with a scene graph and a
//! rapier physics world.
//!
//! ## Features
//!
//! - **Components**: groups, meshes, rigid bodies, character controllers,
//!   spring-smoothed groups and asset instances, mounted as a tree
//! - **Reactive props**: any prop may be a [`Signal`](reactive::Signal);
//!   changes are applied in place without remounting
//! - **Physics bridge**: clamped stepping, pairwise collision callbacks and
//!   body mirroring into parented nodes
//! - **Springs**: deterministic damped springs that sleep when at rest
//! - **Assets**: single-flight memoized loading and filtered instantiation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reactive_scene::prelude::*;
//!
//! fn main() -> Result<(), MountError> {
//!     let mut canvas = Canvas::new();
//!     let drop_height = canvas.runtime().signal(Vec3::new(0.0, 4.0, 0.0));
//!
//!     canvas.mount(|scope| {
//!         Physics::new()
//!             .children(move |scope| {
//!                 StaticBody::new()
//!                     .children(|scope| {
//!                         Mesh::cuboid(Vec3::new(5.0, 0.5, 5.0)).mount(scope)?;
//!                         Ok(())
//!                     })
//!                     .mount(scope)?;
//!                 DynamicBody::new(ColliderDesc::ball(0.5))
//!                     .position(&drop_height)
//!                     .mount(scope)?;
//!                 Ok(())
//!             })
//!             .mount(scope)
//!     })?;
//!
//!     for _ in 0..120 {
//!         canvas.frame(1000.0 / 60.0);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod components;
pub mod config;
pub mod foundation;
pub mod physics;
pub mod reactive;
pub mod scene;
pub mod spring;

/// Common imports for scene authors
pub mod prelude {
    pub use crate::{
        assets::{AssetContainer, AssetLoader, AssetNode, AssetStore, InMemoryAssetLoader, RonAssetLoader},
        components::{
            AssetStoreProvider, Canvas, CharacterController, DynamicBody, Group, Mesh, MeshAsset, MountError, Mounted,
            Physics, SpringGroup, StaticBody,
        },
        config::{Config, SceneConfig},
        foundation::math::{Quat, Transform, Vec3},
        physics::{BodyDesc, ColliderDesc},
        reactive::{FramePhase, Prop, Signal},
        scene::{MaterialDesc, MeshData, Scope},
        spring::{Spring, SpringParams, SpringPreset},
    };
}
