//! Physics bridge
//!
//! Connects one [`PhysicsWorld`] to the scene graph. Once per frame it:
//!
//! 1. clamps the frame delta to `[0, max_timestep]` seconds and steps once,
//! 2. drains collision transitions and notifies both colliders' listeners,
//! 3. mirrors every registered dynamic body into its node, converting the
//!    world pose into the node's parent space,
//! 4. moves every character controller and mirrors it into its node; the
//!    node receives the body's translation from before this frame's move,
//!    so it trails the body by one frame,
//! 5. re-derives static collider poses from their meshes' world matrices
//!    when those changed, plus once on the first frame after creation.
//!
//! No borrow of the world, the registries or the graph is held while user
//! callbacks run, so callbacks may freely mount, unmount or write signals.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use rapier3d::control::KinematicCharacterController;
use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};

use crate::config::PhysicsConfig;
use crate::foundation::collections::{BridgeKey, NodeId, SlotMap};
use crate::foundation::math::{Pose, Transform, Vec3};
use crate::reactive::Prop;
use crate::scene::{SceneError, SceneGraph};

use super::collision_events::{CollisionListener, CollisionListeners};
use super::world::PhysicsWorld;
use super::PhysicsError;

/// Shared handle to a bridge, as provided to descendants of a physics scope
pub type PhysicsHandle = Rc<PhysicsBridge>;

/// Per-frame hook of a character controller, receiving the applied movement
pub type CharacterHook = Rc<dyn Fn(Vec3)>;

struct DynamicMirror {
    body: RigidBodyHandle,
    node: NodeId,
}

/// Kinematic character registration
pub struct CharacterDriver {
    /// Move-and-slide settings
    pub controller: KinematicCharacterController,
    /// Kinematic position-based body
    pub body: RigidBodyHandle,
    /// Collider used for obstacle queries
    pub collider: ColliderHandle,
    /// Node receiving the body's translation
    pub node: NodeId,
    /// Requested movement per frame
    pub movement: Prop<Vec3>,
    /// Optional per-frame hook
    pub on_frame: Option<CharacterHook>,
}

struct StaticColliderSync {
    collider: ColliderHandle,
    mesh: NodeId,
    applied_revision: Option<u64>,
    deferred_pending: bool,
}

/// Frame driver binding a physics world to a scene graph
pub struct PhysicsBridge {
    world: RefCell<PhysicsWorld>,
    listeners: RefCell<CollisionListeners>,
    mirrors: RefCell<SlotMap<BridgeKey, DynamicMirror>>,
    characters: RefCell<SlotMap<BridgeKey, CharacterDriver>>,
    statics: RefCell<SlotMap<BridgeKey, StaticColliderSync>>,
    max_timestep: f32,
    character_offset: f32,
}

impl PhysicsBridge {
    /// Create a bridge around a fresh world
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            world: RefCell::new(PhysicsWorld::new(Vec3::from(config.gravity))),
            listeners: RefCell::new(CollisionListeners::new()),
            mirrors: RefCell::new(SlotMap::with_key()),
            characters: RefCell::new(SlotMap::with_key()),
            statics: RefCell::new(SlotMap::with_key()),
            max_timestep: config.max_timestep_secs,
            character_offset: config.character_offset,
        }
    }

    /// Borrow the world
    pub fn world(&self) -> Ref<'_, PhysicsWorld> {
        self.world.borrow()
    }

    /// Mutably borrow the world
    pub fn world_mut(&self) -> RefMut<'_, PhysicsWorld> {
        self.world.borrow_mut()
    }

    /// Skin width for newly created character controllers
    pub fn character_offset(&self) -> f32 {
        self.character_offset
    }

    /// Clamp a frame delta in milliseconds to a simulation timestep in seconds
    pub fn timestep_for(&self, delta_ms: f32) -> f32 {
        let dt = delta_ms / 1000.0;
        if dt.is_nan() {
            return 0.0;
        }
        dt.clamp(0.0, self.max_timestep)
    }

    /// Replace world gravity
    pub fn set_gravity(&self, gravity: Vec3) {
        self.world.borrow_mut().set_gravity(gravity);
    }

    /// Register collision callbacks for `collider`, replacing previous ones
    pub fn register_listener(&self, collider: ColliderHandle, listener: CollisionListener) -> Result<(), PhysicsError> {
        if !listener.is_empty() {
            self.world.borrow_mut().enable_collision_events(collider)?;
        }
        self.listeners.borrow_mut().register(collider, listener);
        Ok(())
    }

    /// Remove collision callbacks of `collider`
    pub fn unregister_listener(&self, collider: ColliderHandle) -> bool {
        self.listeners.borrow_mut().unregister(collider)
    }

    /// Whether `collider` has collision callbacks
    pub fn has_listener(&self, collider: ColliderHandle) -> bool {
        self.listeners.borrow().contains(collider)
    }

    /// Mirror `body` into `node` every frame
    pub fn add_mirror(&self, body: RigidBodyHandle, node: NodeId) -> BridgeKey {
        self.mirrors.borrow_mut().insert(DynamicMirror { body, node })
    }

    /// Point an existing mirror at a recreated body
    pub fn retarget_mirror(&self, key: BridgeKey, body: RigidBodyHandle) {
        if let Some(mirror) = self.mirrors.borrow_mut().get_mut(key) {
            mirror.body = body;
        }
    }

    /// Stop mirroring
    pub fn remove_mirror(&self, key: BridgeKey) -> bool {
        self.mirrors.borrow_mut().remove(key).is_some()
    }

    /// Drive a character controller every frame
    pub fn add_character(&self, driver: CharacterDriver) -> BridgeKey {
        self.characters.borrow_mut().insert(driver)
    }

    /// Stop driving a character controller
    pub fn remove_character(&self, key: BridgeKey) -> bool {
        self.characters.borrow_mut().remove(key).is_some()
    }

    /// Keep `collider` aligned with the world matrix of `mesh`.
    ///
    /// The pose is written immediately and once more on the next frame.
    pub fn add_static_collider(&self, collider: ColliderHandle, mesh: NodeId, graph: &SceneGraph) -> BridgeKey {
        let revision = graph.world_revision(mesh);
        if let Ok(world) = graph.world_matrix(mesh) {
            if let Err(err) = self.world.borrow_mut().set_collider_pose(collider, Transform::from_matrix(&world).pose()) {
                log::warn!("Static collider for mesh {mesh:?}: {err}");
            }
        }
        self.statics.borrow_mut().insert(StaticColliderSync {
            collider,
            mesh,
            applied_revision: revision,
            deferred_pending: true,
        })
    }

    /// Stop tracking a static collider
    pub fn remove_static_collider(&self, key: BridgeKey) -> bool {
        self.statics.borrow_mut().remove(key).is_some()
    }

    /// Number of mirrored dynamic bodies, driven characters and tracked static colliders
    pub fn registration_counts(&self) -> (usize, usize, usize) {
        (
            self.mirrors.borrow().len(),
            self.characters.borrow().len(),
            self.statics.borrow().len(),
        )
    }

    /// Run one frame of the bridge
    pub fn frame(&self, delta_ms: f32, graph: &RefCell<SceneGraph>) {
        let dt = self.timestep_for(delta_ms);

        let events = {
            let mut world = self.world.borrow_mut();
            world.step(dt);
            world.drain_collision_events()
        };
        for event in events {
            CollisionListeners::dispatch(&self.listeners, event);
        }

        self.mirror_dynamic_bodies(&mut graph.borrow_mut());
        self.drive_characters(dt, graph);
        self.sync_static_colliders(&graph.borrow());
    }

    fn mirror_dynamic_bodies(&self, graph: &mut SceneGraph) {
        let world = self.world.borrow();
        for mirror in self.mirrors.borrow().values() {
            let Some(pose) = world.body_pose(mirror.body) else {
                continue;
            };
            if let Err(err) = mirror_pose(graph, mirror.node, &pose) {
                log::warn!("Cannot mirror body into node {:?}: {err}", mirror.node);
            }
        }
    }

    fn drive_characters(&self, dt: f32, graph: &RefCell<SceneGraph>) {
        let mut hooks = Vec::new();
        {
            let mut world = self.world.borrow_mut();
            let mut graph = graph.borrow_mut();
            for driver in self.characters.borrow().values() {
                let desired = driver.movement.get();
                let computed = match world.move_character(&driver.controller, driver.body, driver.collider, desired, dt) {
                    Ok(computed) => computed,
                    Err(err) => {
                        log::warn!("Character controller skipped: {err}");
                        continue;
                    }
                };
                let Some(current) = world.body_translation(driver.body) else {
                    continue;
                };
                if let Err(err) = world.set_next_kinematic_translation(driver.body, current + computed) {
                    log::warn!("Character controller skipped: {err}");
                    continue;
                }
                // Pre-move translation: the node lags the body by one frame.
                if let Err(err) = graph.set_position(driver.node, current) {
                    log::warn!("Character node {:?}: {err}", driver.node);
                }
                if let Some(hook) = &driver.on_frame {
                    hooks.push((Rc::clone(hook), computed));
                }
            }
        }
        for (hook, computed) in hooks {
            hook(computed);
        }
    }

    fn sync_static_colliders(&self, graph: &SceneGraph) {
        let mut world = self.world.borrow_mut();
        for sync in self.statics.borrow_mut().values_mut() {
            let Some(revision) = graph.world_revision(sync.mesh) else {
                continue;
            };
            if !sync.deferred_pending && sync.applied_revision == Some(revision) {
                continue;
            }
            match graph.world_matrix(sync.mesh) {
                Ok(matrix) => {
                    if let Err(err) = world.set_collider_pose(sync.collider, Transform::from_matrix(&matrix).pose()) {
                        log::warn!("Static collider for mesh {:?}: {err}", sync.mesh);
                    }
                }
                Err(err) => log::warn!("Static collider for mesh {:?}: {err}", sync.mesh),
            }
            sync.applied_revision = Some(revision);
            sync.deferred_pending = false;
        }
    }
}

/// Write a world pose into a node, converting into its parent's space
pub fn mirror_pose(graph: &mut SceneGraph, node: NodeId, pose: &Pose) -> Result<(), SceneError> {
    match graph.parent(node) {
        Some(parent) => {
            let parent_rotation = graph.world_rotation(parent)?;
            graph.set_rotation(node, parent_rotation.inverse() * pose.rotation)?;
            graph.set_absolute_position(node, pose.translation.vector)
        }
        None => {
            graph.set_position(node, pose.translation.vector)?;
            graph.set_rotation(node, pose.rotation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{quat_from_euler, utils::deg_to_rad, Quat, Translation3};
    use crate::physics::{BodyDesc, ColliderDesc};
    use crate::scene::NodeKind;
    use approx::assert_relative_eq;

    #[test]
    fn test_timestep_is_clamped() {
        let bridge = PhysicsBridge::new(&PhysicsConfig::default());
        assert_relative_eq!(bridge.timestep_for(16.0), 0.016);
        assert_relative_eq!(bridge.timestep_for(5000.0), 0.2);
        assert_relative_eq!(bridge.timestep_for(-3.0), 0.0);
        assert_relative_eq!(bridge.timestep_for(f32::NAN), 0.0);
    }

    #[test]
    fn test_mirror_pose_under_rotated_parent_reproduces_world_pose() {
        let mut graph = SceneGraph::default();
        let parent = graph.create_node("parent", NodeKind::Transform);
        let child = graph.create_node("child", NodeKind::Transform);
        graph
            .apply_transform(parent, Vec3::new(2.0, 1.0, 0.0), Vec3::new(0.0, deg_to_rad(45.0), 0.0), Vec3::new(1.0, 1.0, 1.0))
            .unwrap();
        graph.attach(child, Some(parent)).unwrap();

        let rotation = quat_from_euler(Vec3::new(deg_to_rad(10.0), deg_to_rad(80.0), 0.0));
        let pose = Pose::from_parts(Translation3::new(-1.0, 4.0, 3.0), rotation);
        mirror_pose(&mut graph, child, &pose).unwrap();

        assert_relative_eq!(graph.absolute_position(child).unwrap(), Vec3::new(-1.0, 4.0, 3.0), epsilon = 1e-5);
        assert!(graph.world_rotation(child).unwrap().angle_to(&rotation) < 1e-4);
    }

    #[test]
    fn test_mirror_pose_without_parent_copies_pose() {
        let mut graph = SceneGraph::default();
        let node = graph.create_node("node", NodeKind::Transform);
        let pose = Pose::from_parts(Translation3::new(1.0, 2.0, 3.0), Quat::identity());

        mirror_pose(&mut graph, node, &pose).unwrap();
        assert_eq!(graph.local(node).unwrap().position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_frame_mirrors_falling_body() {
        let bridge = PhysicsBridge::new(&PhysicsConfig::default());
        let graph = RefCell::new(SceneGraph::default());
        let node = graph.borrow_mut().create_node("ball", NodeKind::Transform);
        let body = bridge
            .world_mut()
            .create_body(&BodyDesc::dynamic().with_translation(Vec3::new(0.0, 5.0, 0.0)));
        bridge.world_mut().create_collider(&ColliderDesc::ball(0.5), body).unwrap();
        bridge.add_mirror(body, node);

        bridge.frame(16.0, &graph);
        let y = graph.borrow().local(node).unwrap().position.y;
        assert!(y < 5.0 && y > 4.9);
    }

    #[test]
    fn test_static_collider_follows_mesh_world_matrix() {
        let bridge = PhysicsBridge::new(&PhysicsConfig::default());
        let graph = RefCell::new(SceneGraph::default());
        let mesh = graph
            .borrow_mut()
            .create_node("wall", NodeKind::Mesh(crate::scene::MeshData::cuboid(Vec3::new(1.0, 1.0, 1.0))));
        let body = bridge.world_mut().create_body(&BodyDesc::fixed());
        let collider = bridge
            .world_mut()
            .create_collider(&ColliderDesc::cuboid(Vec3::new(1.0, 1.0, 1.0)), body)
            .unwrap();
        bridge.add_static_collider(collider, mesh, &graph.borrow());

        graph.borrow_mut().set_position(mesh, Vec3::new(0.0, 0.0, 7.0)).unwrap();
        graph.borrow_mut().refresh_world_matrices();
        bridge.frame(16.0, &graph);

        let translation = bridge.world().collider(collider).unwrap().position().translation.vector;
        assert_relative_eq!(translation, Vec3::new(0.0, 0.0, 7.0), epsilon = 1e-5);
    }
}
