//! Rendering collaborator
//!
//! The scene graph never draws anything itself. It reports drawable
//! lifecycle and world transforms through [`RenderBackend`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::foundation::collections::NodeId;
use crate::foundation::math::Mat4;

use super::node::{MaterialDesc, NodeKind};

/// Narrow interface to whatever actually renders the scene
pub trait RenderBackend {
    /// A drawable node was created
    fn create_node(&mut self, id: NodeId, name: &str, kind: &NodeKind);

    /// A drawable node was disposed
    fn remove_node(&mut self, id: NodeId);

    /// World transform of a drawable changed
    fn set_transform(&mut self, id: NodeId, world: &Mat4);

    /// Material of a drawable changed
    fn set_material(&mut self, id: NodeId, material: &MaterialDesc);
}

/// Everything a [`NullRenderer`] was told
#[derive(Debug, Default)]
pub struct RenderLog {
    /// Drawables created, in order
    pub created: Vec<NodeId>,
    /// Drawables removed, in order
    pub removed: Vec<NodeId>,
    /// Latest world transform per drawable
    pub transforms: HashMap<NodeId, Mat4>,
    /// Latest material per drawable
    pub materials: HashMap<NodeId, MaterialDesc>,
}

impl RenderLog {
    /// Drawables created and not removed yet
    pub fn live(&self) -> usize {
        self.created.len() - self.removed.len()
    }
}

/// Headless renderer that only records calls
#[derive(Default)]
pub struct NullRenderer {
    log: Rc<RefCell<RenderLog>>,
}

impl NullRenderer {
    /// Create a renderer and a handle to its call log
    pub fn with_log() -> (Self, Rc<RefCell<RenderLog>>) {
        let renderer = Self::default();
        let log = Rc::clone(&renderer.log);
        (renderer, log)
    }
}

impl RenderBackend for NullRenderer {
    fn create_node(&mut self, id: NodeId, name: &str, kind: &NodeKind) {
        log::trace!("NullRenderer: create {} `{}`", kind.class_name(), name);
        self.log.borrow_mut().created.push(id);
    }

    fn remove_node(&mut self, id: NodeId) {
        let mut log = self.log.borrow_mut();
        log.removed.push(id);
        log.transforms.remove(&id);
        log.materials.remove(&id);
    }

    fn set_transform(&mut self, id: NodeId, world: &Mat4) {
        self.log.borrow_mut().transforms.insert(id, *world);
    }

    fn set_material(&mut self, id: NodeId, material: &MaterialDesc) {
        self.log.borrow_mut().materials.insert(id, material.clone());
    }
}
