//! Physics provider

use std::rc::Rc;

use crate::config::PhysicsConfig;
use crate::foundation::math::Vec3;
use crate::physics::{PhysicsBridge, PhysicsHandle};
use crate::reactive::{FramePhase, Prop};
use crate::scene::Scope;

use super::{mount_children, mount_scoped, Children, MountError, Mounted};

/// Creates a physics world stepped once per frame and provides it to its children
#[derive(Default)]
pub struct Physics {
    gravity: Option<Prop<Vec3>>,
    config: Option<PhysicsConfig>,
    children: Option<Children>,
}

impl Physics {
    /// Physics using the scene configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// World gravity, `[0, -9.81, 0]` by default
    pub fn gravity(mut self, gravity: impl Into<Prop<Vec3>>) -> Self {
        self.gravity = Some(gravity.into());
        self
    }

    /// Override the scene's physics configuration
    pub fn config(mut self, config: PhysicsConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Components able to use the physics world
    pub fn children(mut self, children: impl FnOnce(&Scope) -> Result<(), MountError> + 'static) -> Self {
        self.children = Some(Box::new(children));
        self
    }

    /// Mount under `scope`
    pub fn mount(self, scope: &Scope) -> Result<(Mounted, PhysicsHandle), MountError> {
        mount_scoped(scope, move |scope| {
            let config = self.config.unwrap_or_else(|| scope.config().physics.clone());
            let bridge: PhysicsHandle = Rc::new(PhysicsBridge::new(&config));
            log::info!("Physics world created (gravity {:?})", config.gravity);

            if let Some(gravity) = self.gravity {
                let bridge = Rc::clone(&bridge);
                scope.effect(&gravity.sources(), move || bridge.set_gravity(gravity.get()));
            }

            let (frame_bridge, graph) = (Rc::clone(&bridge), Rc::clone(scope.graph()));
            scope.frame_effect(FramePhase::Physics, move |delta_ms| frame_bridge.frame(delta_ms, &graph));
            scope.owner().on_cleanup(|| log::debug!("Physics world disposed"));

            mount_children(self.children, &scope.with_physics(Rc::clone(&bridge)))?;
            Ok((Mounted::new(scope.owner().clone(), None), bridge))
        })
    }
}
