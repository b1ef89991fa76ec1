//! Rigid body and collider descriptors
//!
//! Plain data describing what to create in the physics world. Components
//! hold descriptors in properties; swapping a descriptor value is what
//! triggers recreation of the underlying body or collider.

use rapier3d::prelude::{ColliderBuilder, RigidBodyBuilder, RigidBodyType};

use crate::foundation::math::{Point3, Pose, Quat, Translation3, Vec3};
use crate::reactive::Prop;
use crate::scene::MeshData;

use super::PhysicsError;

/// Simulation kind of a rigid body, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    /// Never moves
    Fixed,
    /// Moved by the solver
    Dynamic,
    /// Moved by the application through next-position targets
    Kinematic,
}

impl BodyKind {
    fn body_type(self) -> RigidBodyType {
        match self {
            Self::Fixed => RigidBodyType::Fixed,
            Self::Dynamic => RigidBodyType::Dynamic,
            Self::Kinematic => RigidBodyType::KinematicPositionBased,
        }
    }
}

/// Description of a rigid body
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    /// Body kind
    pub kind: BodyKind,
    /// Initial world translation
    pub translation: Vec3,
    /// Initial world rotation
    pub rotation: Quat,
    /// Linear velocity damping
    pub linear_damping: f32,
    /// Angular velocity damping
    pub angular_damping: f32,
    /// Multiplier applied to world gravity
    pub gravity_scale: f32,
    /// Continuous collision detection
    pub ccd_enabled: bool,
    /// Allow the solver to put the body to sleep
    pub can_sleep: bool,
}

impl BodyDesc {
    fn with_kind(kind: BodyKind) -> Self {
        Self {
            kind,
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: 1.0,
            ccd_enabled: false,
            can_sleep: true,
        }
    }

    /// Dynamic body at the origin
    pub fn dynamic() -> Self {
        Self::with_kind(BodyKind::Dynamic)
    }

    /// Fixed body at the origin
    pub fn fixed() -> Self {
        Self::with_kind(BodyKind::Fixed)
    }

    /// Kinematic position-based body at the origin
    pub fn kinematic() -> Self {
        Self::with_kind(BodyKind::Kinematic)
    }

    /// Set the initial translation
    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    /// Set the initial rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set linear damping
    pub fn with_linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }

    /// Set angular damping
    pub fn with_angular_damping(mut self, damping: f32) -> Self {
        self.angular_damping = damping;
        self
    }

    /// Set the gravity multiplier
    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Enable continuous collision detection
    pub fn with_ccd(mut self, enabled: bool) -> Self {
        self.ccd_enabled = enabled;
        self
    }

    /// Allow or forbid sleeping
    pub fn with_can_sleep(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }

    /// Initial pose
    pub fn pose(&self) -> Pose {
        Pose::from_parts(Translation3::from(self.translation), self.rotation)
    }

    pub(crate) fn to_builder(&self) -> RigidBodyBuilder {
        RigidBodyBuilder::new(self.kind.body_type())
            .position(self.pose())
            .linear_damping(self.linear_damping)
            .angular_damping(self.angular_damping)
            .gravity_scale(self.gravity_scale)
            .ccd_enabled(self.ccd_enabled)
            .can_sleep(self.can_sleep)
    }
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self::dynamic()
    }
}

/// Collision geometry
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    /// Sphere
    Ball {
        /// Radius
        radius: f32,
    },
    /// Box
    Cuboid {
        /// Half size along each axis
        half_extents: Vec3,
    },
    /// Capsule aligned with Y
    CapsuleY {
        /// Half height of the cylindrical part
        half_height: f32,
        /// Radius
        radius: f32,
    },
    /// Triangle mesh
    TriMesh {
        /// Vertices in collider space
        vertices: Vec<Point3>,
        /// Triangle indices
        indices: Vec<[u32; 3]>,
    },
}

/// Description of a collider
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderDesc {
    /// Geometry
    pub shape: ColliderShape,
    /// Offset relative to the parent body
    pub offset: Vec3,
    /// Friction coefficient
    pub friction: f32,
    /// Restitution coefficient
    pub restitution: f32,
    /// Mass density
    pub density: f32,
    /// Sensors report collisions without producing contact forces
    pub sensor: bool,
}

impl ColliderDesc {
    /// Collider with default material for `shape`
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            offset: Vec3::zeros(),
            friction: 0.5,
            restitution: 0.0,
            density: 1.0,
            sensor: false,
        }
    }

    /// Sphere collider
    pub fn ball(radius: f32) -> Self {
        Self::new(ColliderShape::Ball { radius })
    }

    /// Box collider
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(ColliderShape::Cuboid { half_extents })
    }

    /// Y-aligned capsule collider
    pub fn capsule_y(half_height: f32, radius: f32) -> Self {
        Self::new(ColliderShape::CapsuleY { half_height, radius })
    }

    /// Triangle mesh collider from mesh geometry; `None` without vertices or indices
    pub fn trimesh(mesh: &MeshData) -> Option<Self> {
        mesh.has_geometry().then(|| {
            Self::new(ColliderShape::TriMesh {
                vertices: mesh.points(),
                indices: mesh.indices.clone(),
            })
        })
    }

    /// Set friction
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Set restitution
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set density
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Make this collider a sensor
    pub fn with_sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    /// Offset relative to the parent body
    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub(crate) fn to_builder(&self) -> Result<ColliderBuilder, PhysicsError> {
        let builder = match &self.shape {
            ColliderShape::Ball { radius } => ColliderBuilder::ball(*radius),
            ColliderShape::Cuboid { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            ColliderShape::CapsuleY { half_height, radius } => ColliderBuilder::capsule_y(*half_height, *radius),
            ColliderShape::TriMesh { vertices, indices } => ColliderBuilder::trimesh(vertices.clone(), indices.clone())
                .map_err(|err| PhysicsError::InvalidGeometry(format!("{err:?}")))?,
        };
        Ok(builder
            .translation(self.offset)
            .friction(self.friction)
            .restitution(self.restitution)
            .density(self.density)
            .sensor(self.sensor))
    }
}

impl Default for ColliderDesc {
    fn default() -> Self {
        Self::ball(0.5)
    }
}

impl From<BodyDesc> for Prop<BodyDesc> {
    fn from(desc: BodyDesc) -> Self {
        Self::Value(desc)
    }
}

impl From<ColliderDesc> for Prop<ColliderDesc> {
    fn from(desc: ColliderDesc) -> Self {
        Self::Value(desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimesh_requires_geometry() {
        assert!(ColliderDesc::trimesh(&MeshData::default()).is_none());

        let desc = ColliderDesc::trimesh(&MeshData::cuboid(Vec3::new(1.0, 1.0, 1.0))).unwrap();
        match desc.shape {
            ColliderShape::TriMesh { vertices, indices } => {
                assert_eq!(vertices.len(), 8);
                assert_eq!(indices.len(), 12);
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn test_builders_override_defaults() {
        let body = BodyDesc::dynamic().with_linear_damping(0.5).with_translation(Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(body.kind, BodyKind::Dynamic);
        assert!((body.linear_damping - 0.5).abs() < f32::EPSILON);
        assert_eq!(body.pose().translation.vector, Vec3::new(0.0, 2.0, 0.0));

        let collider = ColliderDesc::cuboid(Vec3::new(1.0, 0.1, 1.0)).with_friction(0.9).with_sensor(true);
        assert!(collider.sensor);
        assert!((collider.friction - 0.9).abs() < f32::EPSILON);
    }
}
