//! Mount scopes
//!
//! A [`Scope`] is what a component receives when it mounts: the shared scene
//! context, the owner its effects and cleanups belong to, the enclosing node
//! and whatever providers (physics, assets) an ancestor installed. Scopes
//! are passed down explicitly; a child scope only differs from its parent in
//! the values an ancestor chose to override.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use futures::executor::LocalSpawner;
use futures::future::{abortable, FutureExt};
use futures::task::LocalSpawnExt;
use thiserror::Error;

use crate::assets::AssetStore;
use crate::config::SceneConfig;
use crate::foundation::collections::{EffectId, FrameKey, NodeId};
use crate::foundation::math::Vec3;
use crate::physics::PhysicsHandle;
use crate::reactive::{create_frame_effect, FrameClock, FramePhase, Owner, Prop, Runtime, Signal, Source};

use super::scene_graph::SceneGraph;

/// Misuse of the scope context
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// A provider component is missing above the caller
    #[error("{0} can only be used inside its provider")]
    MissingProvider(&'static str),

    /// The local executor is gone
    #[error("Cannot spawn task: {0}")]
    Spawn(String),
}

/// State shared by every scope of one canvas
#[derive(Clone)]
pub struct SceneContext {
    /// Reactive runtime
    pub runtime: Runtime,
    /// Scene graph
    pub graph: Rc<RefCell<SceneGraph>>,
    /// Frame clock
    pub clock: FrameClock,
    /// Spawner of the canvas' local executor
    pub spawner: LocalSpawner,
    /// Scene configuration
    pub config: Rc<SceneConfig>,
}

/// Transform properties shared by node-creating components
#[derive(Debug, Clone)]
pub struct TransformProps {
    /// Local position
    pub position: Prop<Vec3>,
    /// Local Euler rotation in radians (Y-X-Z order)
    pub rotation: Prop<Vec3>,
    /// Local scale
    pub scale: Prop<Vec3>,
}

impl Default for TransformProps {
    fn default() -> Self {
        Self {
            position: Prop::Value(Vec3::zeros()),
            rotation: Prop::Value(Vec3::zeros()),
            scale: Prop::Value(Vec3::new(1.0, 1.0, 1.0)),
        }
    }
}

impl TransformProps {
    /// Set the position property
    pub fn position(mut self, position: impl Into<Prop<Vec3>>) -> Self {
        self.position = position.into();
        self
    }

    /// Set the rotation property
    pub fn rotation(mut self, rotation: impl Into<Prop<Vec3>>) -> Self {
        self.rotation = rotation.into();
        self
    }

    /// Set the scale property
    pub fn scale(mut self, scale: impl Into<Prop<Vec3>>) -> Self {
        self.scale = scale.into();
        self
    }
}

/// Mount-time environment of a component
#[derive(Clone)]
pub struct Scope {
    context: SceneContext,
    owner: Owner,
    parent: Signal<Option<NodeId>>,
    collector: Option<Signal<Vec<NodeId>>>,
    physics: Option<PhysicsHandle>,
    assets: Option<AssetStore>,
}

impl Scope {
    /// Root scope: no enclosing node, no providers
    pub fn root(context: SceneContext, owner: Owner) -> Self {
        let parent = context.runtime.signal(None);
        Self {
            context,
            owner,
            parent,
            collector: None,
            physics: None,
            assets: None,
        }
    }

    /// Same environment with `owner` as the lifetime
    pub fn with_owner(&self, owner: Owner) -> Self {
        Self {
            owner,
            ..self.clone()
        }
    }

    /// Same environment under a fresh child owner
    pub fn child(&self) -> Self {
        self.with_owner(self.owner.child())
    }

    /// Descendants attach to whatever `parent` holds
    pub fn with_parent(&self, parent: Signal<Option<NodeId>>) -> Self {
        Self {
            parent,
            ..self.clone()
        }
    }

    /// Descendants attach to `node`
    pub fn with_node_parent(&self, node: NodeId) -> Self {
        self.with_parent(self.context.runtime.signal(Some(node)))
    }

    /// Descendants announce their nodes into `collector`
    pub fn with_collector(&self, collector: Signal<Vec<NodeId>>) -> Self {
        Self {
            collector: Some(collector),
            ..self.clone()
        }
    }

    /// Descendants use `physics`
    pub fn with_physics(&self, physics: PhysicsHandle) -> Self {
        Self {
            physics: Some(physics),
            ..self.clone()
        }
    }

    /// Descendants use `assets`
    pub fn with_assets(&self, assets: AssetStore) -> Self {
        Self {
            assets: Some(assets),
            ..self.clone()
        }
    }

    /// Shared scene context
    pub fn context(&self) -> &SceneContext {
        &self.context
    }

    /// Lifetime owner
    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Reactive runtime
    pub fn runtime(&self) -> &Runtime {
        &self.context.runtime
    }

    /// Scene graph
    pub fn graph(&self) -> &Rc<RefCell<SceneGraph>> {
        &self.context.graph
    }

    /// Frame clock
    pub fn clock(&self) -> &FrameClock {
        &self.context.clock
    }

    /// Scene configuration
    pub fn config(&self) -> &SceneConfig {
        &self.context.config
    }

    /// Enclosing node, read-only
    pub fn parent(&self) -> &Signal<Option<NodeId>> {
        &self.parent
    }

    /// Nearest physics provider
    pub fn physics(&self) -> Result<PhysicsHandle, ContextError> {
        self.physics.clone().ok_or(ContextError::MissingProvider("Physics"))
    }

    /// Nearest asset store
    pub fn assets(&self) -> Result<AssetStore, ContextError> {
        self.assets.clone().ok_or(ContextError::MissingProvider("AssetStore"))
    }

    /// Effect bound to this scope's owner
    pub fn effect(&self, sources: &[Source], callback: impl FnMut() + 'static) -> EffectId {
        self.owner.effect(sources, callback)
    }

    /// Run `callback` every frame in `phase` while this scope is mounted
    pub fn frame_effect(&self, phase: FramePhase, callback: impl FnMut(f32) + 'static) -> FrameKey {
        create_frame_effect(&self.owner, &self.context.clock, phase, callback)
    }

    /// Drive `future` on the canvas executor; it is aborted on unmount
    pub fn spawn_local(&self, future: impl Future<Output = ()> + 'static) -> Result<(), ContextError> {
        let (future, handle) = abortable(future);
        self.owner.on_cleanup(move || handle.abort());
        self.context
            .spawner
            .spawn_local(future.map(|_| ()))
            .map_err(|e| ContextError::Spawn(e.to_string()))
    }

    /// Keep `node` attached to the enclosing node
    pub fn bind_parent(&self, node: NodeId) -> EffectId {
        let (graph, parent) = (Rc::clone(&self.context.graph), self.parent.clone());
        self.effect(&[self.parent.source()], move || {
            let target = parent.get();
            let mut graph = graph.borrow_mut();
            if !graph.contains(node) {
                return;
            }
            if let Err(err) = graph.attach(node, target) {
                log::error!("Cannot parent node {node:?}: {err}");
            }
        })
    }

    /// Keep the name of `node` in line with `name`
    pub fn bind_name(&self, node: NodeId, name: &Prop<String>) -> EffectId {
        let (graph, name) = (Rc::clone(&self.context.graph), name.clone());
        self.effect(&name.sources(), move || {
            let value = name.get();
            if let Err(err) = graph.borrow_mut().set_name(node, value) {
                log::warn!("Cannot rename node: {err}");
            }
        })
    }

    /// Push position, rotation and scale into `node` whenever they change
    pub fn bind_transform(&self, node: NodeId, props: &TransformProps) {
        self.bind_field(node, &props.position, |graph, node, value| graph.set_position(node, value));
        self.bind_field(node, &props.rotation, |graph, node, value| graph.set_rotation_euler(node, value));
        self.bind_field(node, &props.scale, |graph, node, value| graph.set_scale(node, value));
    }

    fn bind_field(
        &self,
        node: NodeId,
        prop: &Prop<Vec3>,
        apply: impl Fn(&mut SceneGraph, NodeId, Vec3) -> Result<(), super::SceneError> + 'static,
    ) {
        let (graph, prop) = (Rc::clone(&self.context.graph), prop.clone());
        self.effect(&prop.sources(), move || {
            let value = prop.get();
            let mut graph = graph.borrow_mut();
            if !graph.contains(node) {
                return;
            }
            if let Err(err) = apply(&mut graph, node, value) {
                log::warn!("Cannot update transform of {node:?}: {err}");
            }
        });
    }

    /// Report `node` to the nearest collector until unmount
    pub fn announce(&self, node: NodeId) {
        let Some(collector) = self.collector.clone() else {
            return;
        };
        collector.update(|nodes| nodes.push(node));
        self.owner.on_cleanup(move || {
            collector.update(|nodes| nodes.retain(|n| *n != node));
        });
    }
}
