//! Kinematic character controller

use std::rc::Rc;

use rapier3d::control::CharacterLength;

use crate::foundation::math::Vec3;
use crate::physics::{BodyDesc, CharacterDriver, CharacterHook, ColliderDesc, KinematicCharacterController};
use crate::reactive::Prop;
use crate::scene::{NodeKind, Scope};

use super::{create_named_node, mount_children, mount_scoped, Children, MountError, Mounted};

/// Adjusts the default move-and-slide settings
pub type ControllerMapper = Box<dyn FnOnce(KinematicCharacterController) -> KinematicCharacterController>;

/// Transform node moved by a kinematic body with obstacle-aware move-and-slide.
///
/// Every frame the requested `movement` is corrected against obstacles and
/// applied as the body's next kinematic translation. The node follows the
/// body's translation from before the move, so it lags the body by one
/// frame. Changing `position` teleports the body.
pub struct CharacterController {
    name: Option<Prop<String>>,
    collider_desc: ColliderDesc,
    movement: Prop<Vec3>,
    position: Prop<Vec3>,
    mapper: Option<ControllerMapper>,
    on_frame: Option<CharacterHook>,
    children: Option<Children>,
}

impl CharacterController {
    /// Controller using `collider_desc` as its shape
    pub fn new(collider_desc: ColliderDesc) -> Self {
        Self {
            name: None,
            collider_desc,
            movement: Prop::Value(Vec3::zeros()),
            position: Prop::Value(Vec3::zeros()),
            mapper: None,
            on_frame: None,
            children: None,
        }
    }

    /// Node name, `CharacterController_{uid}` by default
    pub fn name(mut self, name: impl Into<Prop<String>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Requested movement per frame
    pub fn movement(mut self, movement: impl Into<Prop<Vec3>>) -> Self {
        self.movement = movement.into();
        self
    }

    /// Body position; later changes teleport the body
    pub fn position(mut self, position: impl Into<Prop<Vec3>>) -> Self {
        self.position = position.into();
        self
    }

    /// Tweak the controller (slopes, autostep, snapping, ...)
    pub fn controller_mapper(
        mut self,
        mapper: impl FnOnce(KinematicCharacterController) -> KinematicCharacterController + 'static,
    ) -> Self {
        self.mapper = Some(Box::new(mapper));
        self
    }

    /// Called after each frame's move with the movement actually applied
    pub fn on_frame(mut self, hook: impl Fn(Vec3) + 'static) -> Self {
        self.on_frame = Some(Rc::new(hook));
        self
    }

    /// Components attached to the character's node
    pub fn children(mut self, children: impl FnOnce(&Scope) -> Result<(), MountError> + 'static) -> Self {
        self.children = Some(Box::new(children));
        self
    }

    /// Mount under `scope`; fails outside [`Physics`](super::Physics)
    pub fn mount(self, scope: &Scope) -> Result<Mounted, MountError> {
        let bridge = scope.physics()?;
        mount_scoped(scope, move |scope| {
            let node = create_named_node(scope, self.name.as_ref(), "CharacterController", NodeKind::Transform);
            scope.bind_parent(node);
            scope.announce(node);

            let body = bridge
                .world_mut()
                .create_body(&BodyDesc::kinematic().with_translation(self.position.get()));
            let graph = Rc::clone(scope.graph());
            {
                let (bridge, graph) = (Rc::clone(&bridge), Rc::clone(&graph));
                scope.owner().on_cleanup(move || {
                    bridge.world_mut().remove_body(body);
                    let mut graph = graph.borrow_mut();
                    if graph.contains(node) {
                        if let Err(err) = graph.dispose(node) {
                            log::warn!("CharacterController: {err}");
                        }
                    }
                });
            }
            let collider = bridge.world_mut().create_collider(&self.collider_desc, body)?;

            let controller = KinematicCharacterController {
                offset: CharacterLength::Absolute(bridge.character_offset()),
                ..KinematicCharacterController::default()
            };
            let controller = match self.mapper {
                Some(mapper) => mapper(controller),
                None => controller,
            };

            let key = bridge.add_character(CharacterDriver {
                controller,
                body,
                collider,
                node,
                movement: self.movement,
                on_frame: self.on_frame,
            });
            {
                let bridge = Rc::clone(&bridge);
                scope.owner().on_cleanup(move || {
                    bridge.remove_character(key);
                });
            }

            let position = self.position;
            scope.effect(&position.sources(), move || {
                let translation = position.get();
                if let Err(err) = bridge.world_mut().teleport_body(body, Some(translation), None, false) {
                    log::warn!("CharacterController: {err}");
                }
                if let Err(err) = graph.borrow_mut().set_position(node, translation) {
                    log::warn!("CharacterController: {err}");
                }
            });

            mount_children(self.children, &scope.with_node_parent(node))?;
            Ok(Mounted::new(scope.owner().clone(), Some(node)))
        })
    }
}
