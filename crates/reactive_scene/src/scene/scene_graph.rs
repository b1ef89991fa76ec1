//! Scene graph
//!
//! Nodes live in a slot map and reference each other by [`NodeId`]. A node's
//! world matrix is its parent's world matrix times its own local matrix.
//! Queries such as [`SceneGraph::world_matrix`] always walk the current
//! hierarchy; [`SceneGraph::refresh_world_matrices`] additionally caches the
//! result per node, bumps a revision counter when it changed and pushes the
//! new transform of drawables to the renderer.

use thiserror::Error;

use crate::foundation::collections::{NodeId, SlotMap};
use crate::foundation::math::{matrix_translation, quat_from_euler, Mat4, Point3, Quat, Transform, Vec3};

use super::node::{MaterialDesc, MeshData, Node, NodeFlags, NodeKind};
use super::renderer::{NullRenderer, RenderBackend};

/// Scene graph errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The node was disposed or never existed
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Attaching would make a node its own ancestor
    #[error("Attaching {node:?} under {parent:?} would create a cycle")]
    CycleDetected {
        /// Node being attached
        node: NodeId,
        /// Requested parent
        parent: NodeId,
    },

    /// World matrix of the parent cannot be inverted (zero scale)
    #[error("Parent of {0:?} has a singular world matrix")]
    SingularParent(NodeId),
}

/// Mutable hierarchy of named, transformed nodes
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
    next_uid: u64,
    renderer: Box<dyn RenderBackend>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new(Box::new(NullRenderer::default()))
    }
}

impl SceneGraph {
    /// Create an empty graph reporting to `renderer`
    pub fn new(renderer: Box<dyn RenderBackend>) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            next_uid: 1,
            renderer,
        }
    }

    /// Create a root node
    pub fn create_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let uid = self.next_uid;
        self.next_uid += 1;
        let name = name.into();
        let drawable = kind.is_drawable();
        let id = self.nodes.insert(Node::new(name, uid, kind));

        if drawable {
            let node = &self.nodes[id];
            self.renderer.create_node(id, &node.name, &node.kind);
        }
        log::trace!("SceneGraph: created node {id:?}");
        id
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Borrow a node
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    fn node_ref(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Node name
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id).map(Node::name)
    }

    /// Rename a node
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), SceneError> {
        self.node_mut(id)?.name = name.into();
        Ok(())
    }

    /// Stable numeric id of a node
    pub fn uid(&self, id: NodeId) -> Option<u64> {
        self.nodes.get(id).map(Node::uid)
    }

    /// Node kind
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(Node::kind)
    }

    /// Geometry of a mesh node
    pub fn mesh_data(&self, id: NodeId) -> Option<&MeshData> {
        match self.kind(id)? {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(Node::parent)
    }

    /// Children of a node, in attach order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], Node::children)
    }

    /// Nodes without a parent
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// First node with the given name
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|(_, node)| node.name == name).map(|(id, _)| id)
    }

    /// Whether `ancestor` is `node` or lies above it
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Set or clear the parent of `node`, keeping its local transform
    pub fn attach(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        let old_parent = self.node_ref(node)?.parent;
        if old_parent == parent {
            return Ok(());
        }
        if let Some(parent) = parent {
            self.node_ref(parent)?;
            if self.is_ancestor(node, parent) {
                return Err(SceneError::CycleDetected { node, parent });
            }
        }

        if let Some(old) = old_parent.and_then(|id| self.nodes.get_mut(id)) {
            old.children.retain(|child| *child != node);
        }
        if let Some(new) = parent.and_then(|id| self.nodes.get_mut(id)) {
            new.children.push(node);
        }

        let entry = self.node_mut(node)?;
        entry.parent = parent;
        entry.flags.insert(NodeFlags::LOCAL_DIRTY);
        Ok(())
    }

    /// Remove `node` from its parent
    pub fn detach(&mut self, node: NodeId) -> Result<(), SceneError> {
        self.attach(node, None)
    }

    /// Local transform
    pub fn local(&self, id: NodeId) -> Result<&Transform, SceneError> {
        Ok(&self.node_ref(id)?.local)
    }

    fn local_mut(&mut self, id: NodeId) -> Result<&mut Transform, SceneError> {
        let node = self.node_mut(id)?;
        node.flags.insert(NodeFlags::LOCAL_DIRTY);
        Ok(&mut node.local)
    }

    /// Set the local position
    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> Result<(), SceneError> {
        self.local_mut(id)?.position = position;
        Ok(())
    }

    /// Set the local rotation
    pub fn set_rotation(&mut self, id: NodeId, rotation: Quat) -> Result<(), SceneError> {
        self.local_mut(id)?.rotation = rotation;
        Ok(())
    }

    /// Set the local rotation from Euler angles (radians, yaw-pitch-roll order)
    pub fn set_rotation_euler(&mut self, id: NodeId, euler: Vec3) -> Result<(), SceneError> {
        self.set_rotation(id, quat_from_euler(euler))
    }

    /// Set the local scale
    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) -> Result<(), SceneError> {
        self.local_mut(id)?.scale = scale;
        Ok(())
    }

    /// Write position, Euler rotation and scale in one call
    pub fn apply_transform(&mut self, id: NodeId, position: Vec3, rotation: Vec3, scale: Vec3) -> Result<(), SceneError> {
        let local = self.local_mut(id)?;
        local.position = position;
        local.rotation = quat_from_euler(rotation);
        local.scale = scale;
        Ok(())
    }

    /// World matrix computed from the current hierarchy
    pub fn world_matrix(&self, id: NodeId) -> Result<Mat4, SceneError> {
        let node = self.node_ref(id)?;
        let mut world = node.local.to_matrix();
        let mut current = node.parent;
        while let Some(parent_id) = current {
            let parent = self.node_ref(parent_id)?;
            world = parent.local.to_matrix() * world;
            current = parent.parent;
        }
        Ok(world)
    }

    /// World-space position
    pub fn absolute_position(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(matrix_translation(&self.world_matrix(id)?))
    }

    /// World-space rotation
    pub fn world_rotation(&self, id: NodeId) -> Result<Quat, SceneError> {
        Ok(Transform::from_matrix(&self.world_matrix(id)?).rotation)
    }

    /// Move a node so that its world position becomes `position`
    pub fn set_absolute_position(&mut self, id: NodeId, position: Vec3) -> Result<(), SceneError> {
        let local_position = match self.node_ref(id)?.parent {
            Some(parent) => {
                let inverse = self
                    .world_matrix(parent)?
                    .try_inverse()
                    .ok_or(SceneError::SingularParent(id))?;
                inverse.transform_point(&Point3::from(position)).coords
            }
            None => position,
        };
        self.set_position(id, local_position)
    }

    /// Recompute cached world matrices of every node whose local transform
    /// or ancestry changed.
    ///
    /// Returns how many nodes ended up with a different world matrix.
    pub fn refresh_world_matrices(&mut self) -> usize {
        let mut stack: Vec<(NodeId, Mat4, bool)> = self
            .roots()
            .into_iter()
            .map(|id| (id, Mat4::identity(), false))
            .collect();
        let mut changed = 0;

        while let Some((id, parent_world, parent_changed)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };

            let mut world_changed = false;
            if parent_changed || node.flags.contains(NodeFlags::LOCAL_DIRTY) {
                let world = parent_world * node.local.to_matrix();
                if world != node.world {
                    node.world = world;
                    node.world_revision += 1;
                    world_changed = true;
                    changed += 1;
                    if node.kind.is_drawable() {
                        self.renderer.set_transform(id, &world);
                    }
                }
                node.flags.remove(NodeFlags::LOCAL_DIRTY);
            }

            let world = node.world;
            stack.extend(node.children.iter().map(|child| (*child, world, world_changed)));
        }

        changed
    }

    /// Revision of the cached world matrix
    pub fn world_revision(&self, id: NodeId) -> Option<u64> {
        self.nodes.get(id).map(Node::world_revision)
    }

    /// Assign a material to a drawable
    pub fn set_material(&mut self, id: NodeId, material: MaterialDesc) -> Result<(), SceneError> {
        let drawable = {
            let node = self.node_mut(id)?;
            node.flags.insert(NodeFlags::HAS_MATERIAL);
            node.kind.is_drawable()
        };
        if drawable {
            self.renderer.set_material(id, &material);
        } else {
            log::warn!("Material `{}` assigned to non-drawable node {id:?}", material.name);
        }
        Ok(())
    }

    /// `node` plus every mesh below it
    pub fn descendant_meshes(&self, id: NodeId) -> Vec<NodeId> {
        let mut meshes = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            if matches!(node.kind, NodeKind::Mesh(_)) {
                meshes.push(current);
            }
            stack.extend(node.children.iter().rev());
        }
        meshes
    }

    /// Detach and free a node
    ///
    /// Remaining children become roots. Mesh and light nodes also release their
    /// drawable; node kinds this graph does not manage are freed with a
    /// warning.
    pub fn dispose(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.detach(id)?;

        let children = std::mem::take(&mut self.node_mut(id)?.children);
        if !children.is_empty() {
            log::debug!("SceneGraph: {} orphaned children of {id:?} become roots", children.len());
        }
        for child in children {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = None;
                node.flags.insert(NodeFlags::LOCAL_DIRTY);
            }
        }

        let node = self.nodes.remove(id).ok_or(SceneError::NodeNotFound(id))?;
        match node.kind {
            NodeKind::Mesh(_) | NodeKind::Light(_) => self.renderer.remove_node(id),
            NodeKind::Transform => {}
            NodeKind::Custom(class) => {
                log::warn!("SceneGraph: dispose of `{}` ({class}) not handled by the renderer", node.name);
            }
        }
        Ok(())
    }
}
