//! Physics world
//!
//! Owns every rapier structure needed to simulate one scene and exposes the
//! handful of operations the bridge needs: body and collider lifecycle,
//! single stepping with a caller-supplied timestep, collision event
//! draining and kinematic character movement.

use crossbeam_channel::Receiver;
use rapier3d::control::KinematicCharacterController;
use rapier3d::prelude::{
    ActiveCollisionTypes, ActiveEvents, CCDSolver, ChannelEventCollector, Collider, ColliderHandle, ColliderSet,
    CollisionEvent, ContactForceEvent, DefaultBroadPhase, ImpulseJointSet, IntegrationParameters, IslandManager,
    MultibodyJointSet, NarrowPhase, PhysicsPipeline, QueryFilter, QueryPipeline, RigidBody, RigidBodyHandle,
    RigidBodySet,
};

use crate::foundation::math::{Pose, Quat, Vec3};

use super::collision_events::CollisionTransition;
use super::descriptors::{BodyDesc, ColliderDesc};
use super::PhysicsError;

/// A complete rapier simulation
pub struct PhysicsWorld {
    gravity: Vec3,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    event_collector: ChannelEventCollector,
    collision_events: Receiver<CollisionEvent>,
    contact_force_events: Receiver<ContactForceEvent>,
}

impl PhysicsWorld {
    /// Create an empty world
    pub fn new(gravity: Vec3) -> Self {
        let (collision_send, collision_events) = crossbeam_channel::unbounded();
        let (contact_force_send, contact_force_events) = crossbeam_channel::unbounded();

        log::info!("Physics world created with gravity {gravity:?}");
        Self {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            event_collector: ChannelEventCollector::new(collision_send, contact_force_send),
            collision_events,
            contact_force_events,
        }
    }

    /// Current gravity
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Replace gravity
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    /// Timestep used by the last step
    pub fn timestep(&self) -> f32 {
        self.integration_parameters.dt
    }

    /// Advance the simulation by exactly one step of `dt` seconds
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_collector,
        );
    }

    /// Take every collision transition produced since the last drain
    pub fn drain_collision_events(&mut self) -> Vec<CollisionTransition> {
        // Contact force events are never enabled; drop anything that slipped in
        while self.contact_force_events.try_recv().is_ok() {}
        self.collision_events.try_iter().map(CollisionTransition::from).collect()
    }

    /// Insert a rigid body
    pub fn create_body(&mut self, desc: &BodyDesc) -> RigidBodyHandle {
        self.bodies.insert(desc.to_builder().build())
    }

    /// Remove a rigid body together with its colliders
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    /// Borrow a rigid body
    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// World pose of a rigid body
    pub fn body_pose(&self, handle: RigidBodyHandle) -> Option<Pose> {
        self.bodies.get(handle).map(|body| *body.position())
    }

    /// World translation of a rigid body
    pub fn body_translation(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|body| *body.translation())
    }

    /// Teleport a body; fields left `None` are untouched
    pub fn teleport_body(
        &mut self,
        handle: RigidBodyHandle,
        translation: Option<Vec3>,
        rotation: Option<Quat>,
        wake_up: bool,
    ) -> Result<(), PhysicsError> {
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::BodyNotFound)?;
        if let Some(translation) = translation {
            body.set_translation(translation, wake_up);
        }
        if let Some(rotation) = rotation {
            body.set_rotation(rotation, wake_up);
        }
        Ok(())
    }

    /// Target translation of a kinematic body for the next step
    pub fn set_next_kinematic_translation(&mut self, handle: RigidBodyHandle, translation: Vec3) -> Result<(), PhysicsError> {
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::BodyNotFound)?;
        body.set_next_kinematic_translation(translation);
        Ok(())
    }

    /// Number of rigid bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Insert a collider attached to `body`
    pub fn create_collider(&mut self, desc: &ColliderDesc, body: RigidBodyHandle) -> Result<ColliderHandle, PhysicsError> {
        if !self.bodies.contains(body) {
            return Err(PhysicsError::BodyNotFound);
        }
        let collider = desc.to_builder()?.build();
        Ok(self.colliders.insert_with_parent(collider, body, &mut self.bodies))
    }

    /// Remove a collider
    pub fn remove_collider(&mut self, handle: ColliderHandle) -> bool {
        self.colliders
            .remove(handle, &mut self.islands, &mut self.bodies, true)
            .is_some()
    }

    /// Borrow a collider
    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    /// Handles of every collider
    pub fn collider_handles(&self) -> Vec<ColliderHandle> {
        self.colliders.iter().map(|(handle, _)| handle).collect()
    }

    /// Number of colliders
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// Ask the narrow phase to report begin/end events for `handle`
    pub fn enable_collision_events(&mut self, handle: ColliderHandle) -> Result<(), PhysicsError> {
        let collider = self.colliders.get_mut(handle).ok_or(PhysicsError::ColliderNotFound)?;
        collider.set_active_events(ActiveEvents::COLLISION_EVENTS);
        collider.set_active_collision_types(ActiveCollisionTypes::all());
        Ok(())
    }

    /// Place a collider at a world pose, keeping its parent-relative offset consistent
    pub fn set_collider_pose(&mut self, handle: ColliderHandle, pose: Pose) -> Result<(), PhysicsError> {
        let parent_pose = self
            .colliders
            .get(handle)
            .ok_or(PhysicsError::ColliderNotFound)?
            .parent()
            .and_then(|body| self.bodies.get(body))
            .map(|body| *body.position());

        let collider = self.colliders.get_mut(handle).ok_or(PhysicsError::ColliderNotFound)?;
        if let Some(parent_pose) = parent_pose {
            collider.set_position_wrt_parent(parent_pose.inverse() * pose);
        }
        collider.set_position(pose);
        Ok(())
    }

    /// Obstacle-aware translation for a character collider.
    ///
    /// Returns the movement actually allowed for `desired`, excluding
    /// collisions with the character's own body.
    pub fn move_character(
        &self,
        controller: &KinematicCharacterController,
        body: RigidBodyHandle,
        collider: ColliderHandle,
        desired: Vec3,
        dt: f32,
    ) -> Result<Vec3, PhysicsError> {
        let collider = self.colliders.get(collider).ok_or(PhysicsError::ColliderNotFound)?;
        let movement = controller.move_shape(
            dt,
            &self.bodies,
            &self.colliders,
            &self.query_pipeline,
            collider.shape(),
            collider.position(),
            desired,
            QueryFilter::default().exclude_rigid_body(body),
            |_| {},
        );
        Ok(movement.translation)
    }
}
