//! Static triangle-mesh body

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::foundation::collections::{BridgeKey, NodeId};
use crate::physics::{
    BodyDesc, BodyKind, ColliderDesc, ColliderHandle, CollisionCallback, CollisionListener, PhysicsHandle,
    RigidBodyHandle,
};
use crate::reactive::Prop;
use crate::scene::{SceneGraph, Scope};

use super::{mount_children, mount_scoped, Children, MountError, Mounted};

/// Adjusts the generated trimesh collider of each mesh
pub type ColliderMapper = Rc<dyn Fn(ColliderDesc) -> ColliderDesc>;

struct StaticEntry {
    collider: ColliderHandle,
    sync: BridgeKey,
}

struct StaticColliders {
    bridge: PhysicsHandle,
    body: Cell<Option<(RigidBodyHandle, BodyDesc)>>,
    entries: RefCell<Vec<StaticEntry>>,
    mapper: Option<ColliderMapper>,
    listener: CollisionListener,
}

impl StaticColliders {
    fn sync_body(&self, desc: &BodyDesc) -> RigidBodyHandle {
        let current = self.body.take();
        if let Some((handle, current_desc)) = current {
            if current_desc == *desc {
                self.body.set(Some((handle, current_desc)));
                return handle;
            }
            self.clear_entries();
            self.bridge.world_mut().remove_body(handle);
        }
        if desc.kind != BodyKind::Fixed {
            log::error!("StaticBody: provided body descriptor is {:?}, not a fixed body", desc.kind);
        }
        let handle = self.bridge.world_mut().create_body(desc);
        self.body.set(Some((handle, desc.clone())));
        handle
    }

    fn clear_entries(&self) {
        for entry in self.entries.borrow_mut().drain(..) {
            self.bridge.unregister_listener(entry.collider);
            self.bridge.remove_static_collider(entry.sync);
            self.bridge.world_mut().remove_collider(entry.collider);
        }
    }

    fn rebuild(&self, body: RigidBodyHandle, meshes: &[NodeId], graph: &SceneGraph) {
        self.clear_entries();
        let mut entries = Vec::with_capacity(meshes.len());
        for &mesh in meshes {
            let Some(desc) = graph.mesh_data(mesh).and_then(ColliderDesc::trimesh) else {
                log::warn!(
                    "StaticBody: mesh `{}` has no vertices or indices, skipping its collider",
                    graph.name(mesh).unwrap_or_default()
                );
                continue;
            };
            let desc = match &self.mapper {
                Some(mapper) => mapper(desc),
                None => desc,
            };
            let collider = match self.bridge.world_mut().create_collider(&desc, body) {
                Ok(collider) => collider,
                Err(err) => {
                    log::warn!("StaticBody: mesh `{}`: {err}", graph.name(mesh).unwrap_or_default());
                    continue;
                }
            };
            if let Err(err) = self.bridge.register_listener(collider, self.listener.clone()) {
                log::warn!("StaticBody: {err}");
            }
            let sync = self.bridge.add_static_collider(collider, mesh, graph);
            entries.push(StaticEntry { collider, sync });
        }
        log::debug!("StaticBody: {} trimesh colliders for {} meshes", entries.len(), meshes.len());
        *self.entries.borrow_mut() = entries;
    }

    fn dispose(&self) {
        self.clear_entries();
        if let Some((handle, _)) = self.body.take() {
            self.bridge.world_mut().remove_body(handle);
        }
    }
}

/// Fixed body giving every mesh among its children a trimesh collider.
///
/// The component has no node of its own. Colliders follow the world
/// matrices of their meshes and are rebuilt whenever the set of mounted
/// children changes.
pub struct StaticBody {
    body_desc: Prop<BodyDesc>,
    mapper: Option<ColliderMapper>,
    listener: CollisionListener,
    children: Option<Children>,
}

impl Default for StaticBody {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticBody {
    /// Fixed body at the origin
    pub fn new() -> Self {
        Self {
            body_desc: Prop::Value(BodyDesc::fixed()),
            mapper: None,
            listener: CollisionListener::default(),
            children: None,
        }
    }

    /// Body descriptor, expected to be fixed
    pub fn body_desc(mut self, desc: impl Into<Prop<BodyDesc>>) -> Self {
        self.body_desc = desc.into();
        self
    }

    /// Adjust each generated collider (friction, sensor, ...)
    pub fn collider_mapper(mut self, mapper: impl Fn(ColliderDesc) -> ColliderDesc + 'static) -> Self {
        self.mapper = Some(Rc::new(mapper));
        self
    }

    /// Called with the other collider when a contact begins
    pub fn on_start_collide(mut self, callback: impl Fn(ColliderHandle) + 'static) -> Self {
        self.listener.on_start = Some(Rc::new(callback) as CollisionCallback);
        self
    }

    /// Called with the other collider when a contact ends
    pub fn on_end_collide(mut self, callback: impl Fn(ColliderHandle) + 'static) -> Self {
        self.listener.on_end = Some(Rc::new(callback) as CollisionCallback);
        self
    }

    /// Components whose meshes become colliders
    pub fn children(mut self, children: impl FnOnce(&Scope) -> Result<(), MountError> + 'static) -> Self {
        self.children = Some(Box::new(children));
        self
    }

    /// Mount under `scope`; fails outside [`Physics`](super::Physics)
    pub fn mount(self, scope: &Scope) -> Result<Mounted, MountError> {
        let bridge = scope.physics()?;
        mount_scoped(scope, move |scope| {
            let colliders = Rc::new(StaticColliders {
                bridge,
                body: Cell::new(None),
                entries: RefCell::new(Vec::new()),
                mapper: self.mapper,
                listener: self.listener,
            });
            {
                let colliders = Rc::clone(&colliders);
                scope.owner().on_cleanup(move || colliders.dispose());
            }

            let collector = scope.runtime().signal(Vec::<NodeId>::new());
            let (graph, nodes) = (Rc::clone(scope.graph()), collector.clone());
            let meshes = scope.owner().memo(&[collector.source()], move || {
                let graph = graph.borrow();
                let mut meshes: Vec<NodeId> = Vec::new();
                for node in nodes.get() {
                    for mesh in graph.descendant_meshes(node) {
                        if !meshes.contains(&mesh) {
                            meshes.push(mesh);
                        }
                    }
                }
                meshes
            });

            let mut sources = self.body_desc.sources();
            sources.push(meshes.source());
            let (graph, desc) = (Rc::clone(scope.graph()), self.body_desc);
            scope.effect(&sources, move || {
                let body = colliders.sync_body(&desc.get());
                colliders.rebuild(body, &meshes.get(), &graph.borrow());
            });

            mount_children(self.children, &scope.with_collector(collector))?;
            Ok(Mounted::new(scope.owner().clone(), None))
        })
    }
}
