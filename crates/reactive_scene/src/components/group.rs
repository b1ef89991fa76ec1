//! Transform group

use crate::foundation::math::Vec3;
use crate::reactive::Prop;
use crate::scene::{NodeKind, Scope, TransformProps};

use super::{create_named_node, dispose_node_on_cleanup, mount_children, mount_scoped, Children, MountError, Mounted};

/// Transform node that attaches to the enclosing node and parents its children
#[derive(Default)]
pub struct Group {
    name: Option<Prop<String>>,
    transform: TransformProps,
    children: Option<Children>,
}

impl Group {
    /// Group at the origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Node name, `Group_{uid}` by default
    pub fn name(mut self, name: impl Into<Prop<String>>) -> Self {
        self.name = Some(name.into());
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

    /// Components mounted under this group
    pub fn children(mut self, children: impl FnOnce(&Scope) -> Result<(), MountError> + 'static) -> Self {
        self.children = Some(Box::new(children));
        self
    }

    /// Mount under `scope`
    pub fn mount(self, scope: &Scope) -> Result<Mounted, MountError> {
        mount_scoped(scope, move |scope| {
            let node = create_named_node(scope, self.name.as_ref(), "Group", NodeKind::Transform);
            scope.bind_parent(node);
            scope.bind_transform(node, &self.transform);
            scope.announce(node);
            dispose_node_on_cleanup(scope, node, "Group");

            mount_children(self.children, &scope.with_node_parent(node))?;
            Ok(Mounted::new(scope.owner().clone(), Some(node)))
        })
    }
}
