//! Managed rigid body
//!
//! A [`ManagedBody`] owns everything that has to go away together when a
//! body component unmounts: the rapier body, its collider, the collider's
//! listener registration, the frame mirror and the mirrored node. The body
//! itself moves through a small state machine:
//!
//! ```text
//! Uninitialized --sync--> Created --swap--> Created (new handle) --dispose--> Removed
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};

use crate::foundation::collections::{BridgeKey, NodeId};
use crate::foundation::math::{Quat, Vec3};
use crate::scene::SceneGraph;

use super::bridge::PhysicsHandle;
use super::collision_events::CollisionListener;
use super::descriptors::{BodyDesc, BodyKind, ColliderDesc};
use super::PhysicsError;

/// Lifecycle state of a managed body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    /// No body has been created yet
    Uninitialized,
    /// A body exists in the world
    Created {
        /// Current rapier handle
        handle: RigidBodyHandle,
        /// Kind the body was first created with
        kind: BodyKind,
    },
    /// Disposed; no further changes are accepted
    Removed,
}

/// Body, collider, listener, mirror and node with a single teardown
pub struct ManagedBody {
    bridge: PhysicsHandle,
    graph: Rc<RefCell<SceneGraph>>,
    node: NodeId,
    label: &'static str,
    expected_kind: Option<BodyKind>,
    state: BodyState,
    desc: Option<BodyDesc>,
    collider_desc: Option<ColliderDesc>,
    collider: Option<ColliderHandle>,
    listener: CollisionListener,
    mirror: Option<BridgeKey>,
}

impl ManagedBody {
    /// Manage a body mirrored into `node`.
    ///
    /// `expected_kind` is the kind the owning component is designed for; a
    /// descriptor of another kind is logged and used anyway.
    pub fn new(
        bridge: PhysicsHandle,
        graph: Rc<RefCell<SceneGraph>>,
        node: NodeId,
        label: &'static str,
        expected_kind: Option<BodyKind>,
    ) -> Self {
        Self {
            bridge,
            graph,
            node,
            label,
            expected_kind,
            state: BodyState::Uninitialized,
            desc: None,
            collider_desc: None,
            collider: None,
            listener: CollisionListener::default(),
            mirror: None,
        }
    }

    /// Current state
    pub fn state(&self) -> BodyState {
        self.state
    }

    /// Current body handle
    pub fn body(&self) -> Option<RigidBodyHandle> {
        match self.state {
            BodyState::Created { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// Current collider handle
    pub fn collider(&self) -> Option<ColliderHandle> {
        self.collider
    }

    /// Mirrored node
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Bring body and collider in line with the given descriptors.
    ///
    /// Unchanged descriptors are a no-op. A new body descriptor recreates
    /// the body (and therefore the collider); a new collider descriptor only
    /// recreates the collider.
    pub fn sync(&mut self, desc: &BodyDesc, collider_desc: &ColliderDesc) -> Result<(), PhysicsError> {
        if self.state == BodyState::Removed {
            log::warn!("{}: ignoring descriptor change after removal", self.label);
            return Ok(());
        }
        let body_changed = self.desc.as_ref() != Some(desc);
        if body_changed {
            self.sync_descriptor(desc);
        }
        if body_changed || self.collider_desc.as_ref() != Some(collider_desc) {
            self.rebuild_collider(collider_desc)?;
        }
        Ok(())
    }

    fn sync_descriptor(&mut self, desc: &BodyDesc) {
        let mut next = desc.clone();
        match self.state {
            BodyState::Uninitialized => {
                if let Some(expected) = self.expected_kind {
                    if desc.kind != expected {
                        log::error!(
                            "{}: body descriptor is {:?} but {:?} was expected; continuing with {:?}",
                            self.label,
                            desc.kind,
                            expected,
                            desc.kind
                        );
                    }
                }
            }
            BodyState::Created { handle, kind } => {
                if desc.kind != kind {
                    log::error!(
                        "{}: body kind cannot change from {kind:?} to {:?}; keeping {kind:?}",
                        self.label,
                        desc.kind
                    );
                    next.kind = kind;
                }
                let mut world = self.bridge.world_mut();
                if let Some(pose) = world.body_pose(handle) {
                    next.translation = pose.translation.vector;
                    next.rotation = pose.rotation;
                }
                world.remove_body(handle);
                drop(world);
                if let Some(collider) = self.collider.take() {
                    self.bridge.unregister_listener(collider);
                }
                log::debug!("{}: descriptor swapped, recreating body", self.label);
            }
            BodyState::Removed => return,
        }

        let handle = self.bridge.world_mut().create_body(&next);
        let kind = match self.state {
            BodyState::Created { kind, .. } => kind,
            _ => next.kind,
        };
        self.state = BodyState::Created { handle, kind };
        if let Some(mirror) = self.mirror {
            self.bridge.retarget_mirror(mirror, handle);
        }
        self.desc = Some(desc.clone());
    }

    fn rebuild_collider(&mut self, collider_desc: &ColliderDesc) -> Result<(), PhysicsError> {
        let Some(body) = self.body() else {
            return Ok(());
        };
        if let Some(old) = self.collider.take() {
            self.bridge.unregister_listener(old);
            self.bridge.world_mut().remove_collider(old);
        }
        self.collider_desc = Some(collider_desc.clone());

        let collider = self.bridge.world_mut().create_collider(collider_desc, body)?;
        self.collider = Some(collider);
        self.bridge.register_listener(collider, self.listener.clone())
    }

    /// Replace the collision callbacks of the collider
    pub fn set_listener(&mut self, listener: CollisionListener) -> Result<(), PhysicsError> {
        self.listener = listener;
        match self.collider {
            Some(collider) => self.bridge.register_listener(collider, self.listener.clone()),
            None => Ok(()),
        }
    }

    /// Mirror the body into the node every frame
    pub fn enable_mirroring(&mut self) {
        if self.mirror.is_some() {
            return;
        }
        if let Some(body) = self.body() {
            self.mirror = Some(self.bridge.add_mirror(body, self.node));
        }
    }

    /// Teleport the body
    pub fn teleport(&self, translation: Option<Vec3>, rotation: Option<Quat>, wake_up: bool) -> Result<(), PhysicsError> {
        let body = self.body().ok_or(PhysicsError::BodyNotFound)?;
        self.bridge.world_mut().teleport_body(body, translation, rotation, wake_up)
    }

    /// Remove body, collider, listener and mirror, then detach and free the node
    pub fn dispose(&mut self) {
        if self.state == BodyState::Removed {
            return;
        }
        if let Some(collider) = self.collider.take() {
            self.bridge.unregister_listener(collider);
        }
        if let Some(mirror) = self.mirror.take() {
            self.bridge.remove_mirror(mirror);
        }
        if let Some(body) = self.body() {
            self.bridge.world_mut().remove_body(body);
        }
        self.state = BodyState::Removed;

        let mut graph = self.graph.borrow_mut();
        if graph.contains(self.node) {
            if let Err(err) = graph.dispose(self.node) {
                log::warn!("{}: failed to dispose node: {err}", self.label);
            }
        }
        log::debug!("{}: disposed", self.label);
    }
}
