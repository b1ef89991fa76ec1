//! Dynamic rigid body

use std::cell::RefCell;
use std::rc::Rc;

use crate::foundation::math::{quat_from_euler, Vec3};
use crate::physics::{
    BodyDesc, BodyKind, ColliderDesc, ColliderHandle, CollisionCallback, CollisionListener, ManagedBody,
};
use crate::reactive::Prop;
use crate::scene::{NodeKind, Scope};

use super::{create_named_node, mount_children, mount_scoped, Children, MountError, Mounted};

/// Transform node whose pose is driven by a simulated dynamic body.
///
/// Changing `position` or `rotation` after mount teleports the body.
/// Swapping `body_desc` recreates the body where the old one was.
pub struct DynamicBody {
    name: Option<Prop<String>>,
    position: Prop<Vec3>,
    rotation: Prop<Vec3>,
    body_desc: Prop<BodyDesc>,
    collider_desc: Prop<ColliderDesc>,
    listener: CollisionListener,
    children: Option<Children>,
}

impl DynamicBody {
    /// Dynamic body with the given collider shape
    pub fn new(collider_desc: impl Into<Prop<ColliderDesc>>) -> Self {
        Self {
            name: None,
            position: Prop::Value(Vec3::zeros()),
            rotation: Prop::Value(Vec3::zeros()),
            body_desc: Prop::Value(BodyDesc::dynamic()),
            collider_desc: collider_desc.into(),
            listener: CollisionListener::default(),
            children: None,
        }
    }

    /// Node name, `DynamicBody_{uid}` by default
    pub fn name(mut self, name: impl Into<Prop<String>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// World position; later changes teleport the body
    pub fn position(mut self, position: impl Into<Prop<Vec3>>) -> Self {
        self.position = position.into();
        self
    }

    /// World Euler rotation; later changes teleport the body
    pub fn rotation(mut self, rotation: impl Into<Prop<Vec3>>) -> Self {
        self.rotation = rotation.into();
        self
    }

    /// Body descriptor, expected to be dynamic
    pub fn body_desc(mut self, desc: impl Into<Prop<BodyDesc>>) -> Self {
        self.body_desc = desc.into();
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

    /// Components attached to the body's node
    pub fn children(mut self, children: impl FnOnce(&Scope) -> Result<(), MountError> + 'static) -> Self {
        self.children = Some(Box::new(children));
        self
    }

    /// Mount under `scope`; fails outside [`Physics`](super::Physics)
    pub fn mount(self, scope: &Scope) -> Result<Mounted, MountError> {
        mount_scoped(scope, move |scope| {
            let bridge = scope.physics()?;
            let node = create_named_node(scope, self.name.as_ref(), "DynamicBody", NodeKind::Transform);
            scope.bind_parent(node);
            scope.announce(node);

            let body = Rc::new(RefCell::new(ManagedBody::new(
                bridge,
                Rc::clone(scope.graph()),
                node,
                "DynamicBody",
                Some(BodyKind::Dynamic),
            )));
            {
                let dispose = Rc::clone(&body);
                scope.owner().on_cleanup(move || dispose.borrow_mut().dispose());
            }
            {
                let mut managed = body.borrow_mut();
                managed.sync(&self.body_desc.get(), &self.collider_desc.get())?;
                managed.set_listener(self.listener)?;
                managed.enable_mirroring();
            }

            let mut sources = self.body_desc.sources();
            sources.extend(self.collider_desc.sources());
            let (descs_body, body_desc, collider_desc) = (Rc::clone(&body), self.body_desc, self.collider_desc);
            scope.effect(&sources, move || {
                if let Err(err) = descs_body.borrow_mut().sync(&body_desc.get(), &collider_desc.get()) {
                    log::error!("DynamicBody: {err}");
                }
            });

            let (position_body, position) = (Rc::clone(&body), self.position);
            scope.effect(&position.sources(), move || {
                if let Err(err) = position_body.borrow().teleport(Some(position.get()), None, true) {
                    log::warn!("DynamicBody: {err}");
                }
            });

            let (rotation_body, rotation) = (Rc::clone(&body), self.rotation);
            scope.effect(&rotation.sources(), move || {
                let rotation = quat_from_euler(rotation.get());
                if let Err(err) = rotation_body.borrow().teleport(None, Some(rotation), true) {
                    log::warn!("DynamicBody: {err}");
                }
            });

            mount_children(self.children, &scope.with_node_parent(node))?;
            Ok(Mounted::new(scope.owner().clone(), Some(node)))
        })
    }
}
