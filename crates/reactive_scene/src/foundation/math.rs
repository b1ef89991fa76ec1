//! Math utilities and types
//!
//! Vector, matrix and rotation aliases shared by the scene graph, the spring
//! integrator and the physics bridge. Rotations coming from declarative
//! properties are Euler angles in radians using the yaw-pitch-roll (Y, X, Z)
//! convention.

pub use nalgebra::{Isometry3, Matrix3, Matrix4, Quaternion, Translation3, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Rigid pose (translation + rotation) used at the physics boundary
pub type Pose = Isometry3<f32>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in parent space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform from position, Euler rotation and scale
    pub fn from_parts(position: Vec3, rotation_euler: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation: quat_from_euler(rotation_euler),
            scale,
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Decompose a transformation matrix into position, rotation and scale
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let position = Vec3::new(matrix.m14, matrix.m24, matrix.m34);

        let scale_x = Vec3::new(matrix.m11, matrix.m21, matrix.m31).magnitude();
        let scale_y = Vec3::new(matrix.m12, matrix.m22, matrix.m32).magnitude();
        let scale_z = Vec3::new(matrix.m13, matrix.m23, matrix.m33).magnitude();
        let scale = Vec3::new(scale_x, scale_y, scale_z);

        let rotation = if scale_x > f32::EPSILON && scale_y > f32::EPSILON && scale_z > f32::EPSILON {
            let rotation_matrix = Mat3::new(
                matrix.m11 / scale_x, matrix.m12 / scale_y, matrix.m13 / scale_z,
                matrix.m21 / scale_x, matrix.m22 / scale_y, matrix.m23 / scale_z,
                matrix.m31 / scale_x, matrix.m32 / scale_y, matrix.m33 / scale_z,
            );
            Quat::from_matrix(&rotation_matrix)
        } else {
            // Degenerate scale has no recoverable rotation
            Quat::identity()
        };

        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Rigid part of this transform (scale dropped)
    pub fn pose(&self) -> Pose {
        Pose::from_parts(Translation3::from(self.position), self.rotation)
    }
}

/// Build a rotation from Euler angles `(pitch, yaw, roll)` stored as `(x, y, z)`.
///
/// Composition order is yaw about Y, then pitch about X, then roll about Z.
pub fn quat_from_euler(euler: Vec3) -> Quat {
    Quat::from_axis_angle(&Vec3::y_axis(), euler.y)
        * Quat::from_axis_angle(&Vec3::x_axis(), euler.x)
        * Quat::from_axis_angle(&Vec3::z_axis(), euler.z)
}

/// Translation column of an affine matrix
pub fn matrix_translation(matrix: &Mat4) -> Vec3 {
    Vec3::new(matrix.m14, matrix.m24, matrix.m34)
}

/// Math utility functions
pub mod utils {
    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * DEG_TO_RAD
    }
}
