//! Declarative scene components
//!
//! Each component is a plain props struct with builder methods and a
//! `mount` method. Mounting creates whatever the component manages under a
//! fresh child owner of the given [`Scope`], wires effects from its props,
//! mounts its children with an adjusted scope and returns a [`Mounted`]
//! handle. Unmounting disposes the owner, which tears everything down in one
//! synchronous pass.

pub mod asset_provider;
pub mod canvas;
pub mod character_controller;
pub mod dynamic_body;
pub mod group;
pub mod mesh;
pub mod mesh_asset;
pub mod physics;
pub mod spring_group;
pub mod static_body;

#[cfg(test)]
mod tests;

use thiserror::Error;

use crate::foundation::collections::NodeId;
use crate::physics::PhysicsError;
use crate::reactive::{Owner, Prop};
use crate::scene::{ContextError, NodeKind, SceneError, Scope};

pub use asset_provider::AssetStoreProvider;
pub use canvas::Canvas;
pub use character_controller::CharacterController;
pub use dynamic_body::DynamicBody;
pub use group::Group;
pub use mesh::Mesh;
pub use mesh_asset::{MeshAsset, MountedAsset};
pub use physics::Physics;
pub use spring_group::SpringGroup;
pub use static_body::StaticBody;

/// Mount failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MountError {
    /// Scope misuse
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Scene graph failure
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Physics failure
    #[error(transparent)]
    Physics(#[from] PhysicsError),
}

/// Children of a component, mounted with the scope the component provides
pub type Children = Box<dyn FnOnce(&Scope) -> Result<(), MountError>>;

/// Handle of a mounted component
#[derive(Clone)]
pub struct Mounted {
    owner: Owner,
    node: Option<NodeId>,
}

impl Mounted {
    pub(crate) fn new(owner: Owner, node: Option<NodeId>) -> Self {
        Self { owner, node }
    }

    /// Node created by the component, if it has one
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Owner of everything the component created
    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Whether the component has been unmounted
    pub fn is_unmounted(&self) -> bool {
        self.owner.is_disposed()
    }

    /// Tear the component and its children down
    pub fn unmount(&self) {
        self.owner.dispose();
    }
}

/// Create a node named after `name`, or `{prefix}_{uid}` without one
pub(crate) fn create_named_node(scope: &Scope, name: Option<&Prop<String>>, prefix: &str, kind: NodeKind) -> NodeId {
    let node = {
        let mut graph = scope.graph().borrow_mut();
        let node = graph.create_node(prefix, kind);
        let uid = graph.uid(node).unwrap_or_default();
        if let Err(err) = graph.set_name(node, format!("{prefix}_{uid}")) {
            log::warn!("{prefix}: {err}");
        }
        node
    };
    if let Some(name) = name {
        scope.bind_name(node, name);
    }
    node
}

/// Dispose `node` with the owner of `scope`
pub(crate) fn dispose_node_on_cleanup(scope: &Scope, node: NodeId, label: &'static str) {
    let graph = scope.graph().clone();
    scope.owner().on_cleanup(move || {
        let mut graph = graph.borrow_mut();
        if !graph.contains(node) {
            return;
        }
        if let Err(err) = graph.dispose(node) {
            log::warn!("{label}: cannot dispose node: {err}");
        }
    });
}

pub(crate) fn mount_children(children: Option<Children>, scope: &Scope) -> Result<(), MountError> {
    match children {
        Some(children) => scope.runtime().batch(|| children(scope)),
        None => Ok(()),
    }
}

/// Run `mount` under a fresh child owner, tearing it down again on failure
pub(crate) fn mount_scoped<T>(scope: &Scope, mount: impl FnOnce(&Scope) -> Result<T, MountError>) -> Result<T, MountError> {
    let child = scope.child();
    let result = mount(&child);
    if let Err(err) = &result {
        log::debug!("Mount failed, disposing partial state: {err}");
        child.owner().dispose();
    }
    result
}
