//! Mesh node

use std::rc::Rc;

use crate::foundation::math::Vec3;
use crate::reactive::Prop;
use crate::scene::{MaterialDesc, MeshData, NodeKind, Scope, TransformProps};

use super::{create_named_node, dispose_node_on_cleanup, mount_children, mount_scoped, Children, MountError, Mounted};

/// Drawable mesh node
pub struct Mesh {
    name: Option<Prop<String>>,
    data: MeshData,
    material: Option<Prop<MaterialDesc>>,
    transform: TransformProps,
    children: Option<Children>,
}

impl Mesh {
    /// Mesh with the given geometry
    pub fn new(data: MeshData) -> Self {
        Self {
            name: None,
            data,
            material: None,
            transform: TransformProps::default(),
            children: None,
        }
    }

    /// Box mesh
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(MeshData::cuboid(half_extents))
    }

    /// Node name, `Mesh_{uid}` by default
    pub fn name(mut self, name: impl Into<Prop<String>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Material forwarded to the renderer
    pub fn material(mut self, material: impl Into<Prop<MaterialDesc>>) -> Self {
        self.material = Some(material.into());
        self
    }

    /// Local position
    pub fn position(mut self, position: impl Into<Prop<Vec3>>) -> Self {
        self.transform.position = position.into();
        self
    }

    /// Local Euler rotation
    pub fn rotation(mut self, rotation: impl Into<Prop<Vec3>>) -> Self {
        self.transform.rotation = rotation.into();
        self
    }

    /// Local scale
    pub fn scale(mut self, scale: impl Into<Prop<Vec3>>) -> Self {
        self.transform.scale = scale.into();
        self
    }

    /// Components mounted under this mesh
    pub fn children(mut self, children: impl FnOnce(&Scope) -> Result<(), MountError> + 'static) -> Self {
        self.children = Some(Box::new(children));
        self
    }

    /// Mount under `scope`
    pub fn mount(self, scope: &Scope) -> Result<Mounted, MountError> {
        mount_scoped(scope, move |scope| {
            if !self.data.has_geometry() {
                log::warn!("Mesh: created without geometry");
            }
            let node = create_named_node(scope, self.name.as_ref(), "Mesh", NodeKind::Mesh(self.data));
            scope.bind_parent(node);
            scope.bind_transform(node, &self.transform);

            if let Some(material) = self.material {
                let graph = Rc::clone(scope.graph());
                scope.effect(&material.sources(), move || {
                    if let Err(err) = graph.borrow_mut().set_material(node, material.get()) {
                        log::warn!("Mesh: {err}");
                    }
                });
            }

            scope.announce(node);
            dispose_node_on_cleanup(scope, node, "Mesh");

            mount_children(self.children, &scope.with_node_parent(node))?;
            Ok(Mounted::new(scope.owner().clone(), Some(node)))
        })
    }
}
