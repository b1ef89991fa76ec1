//! Scene graph nodes and the data they carry

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::foundation::collections::NodeId;
use crate::foundation::math::{Mat4, Point3, Transform, Vec3};
use crate::reactive::Prop;

/// Triangle geometry attached to a mesh node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    /// Vertex positions in mesh-local space
    pub vertices: Vec<[f32; 3]>,
    /// Triangle vertex indices
    pub indices: Vec<[u32; 3]>,
}

impl MeshData {
    /// Build from flat position and index buffers as produced by most decoders.
    ///
    /// Returns `None` when either buffer is empty or not a multiple of three.
    pub fn from_buffers(positions: &[f32], indices: &[u32]) -> Option<Self> {
        if positions.is_empty() || indices.is_empty() || positions.len() % 3 != 0 || indices.len() % 3 != 0 {
            return None;
        }
        Some(Self {
            vertices: positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect(),
            indices: indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect(),
        })
    }

    /// Axis-aligned box centred on the origin
    pub fn cuboid(half_extents: Vec3) -> Self {
        let (x, y, z) = (half_extents.x, half_extents.y, half_extents.z);
        let vertices = vec![
            [-x, -y, -z],
            [x, -y, -z],
            [x, y, -z],
            [-x, y, -z],
            [-x, -y, z],
            [x, -y, z],
            [x, y, z],
            [-x, y, z],
        ];
        // Counter-clockwise when seen from outside
        let indices = vec![
            [0, 2, 1], [0, 3, 2], // -z
            [4, 5, 6], [4, 6, 7], // +z
            [0, 1, 5], [0, 5, 4], // -y
            [3, 6, 2], [3, 7, 6], // +y
            [0, 4, 7], [0, 7, 3], // -x
            [1, 2, 6], [1, 6, 5], // +x
        ];
        Self { vertices, indices }
    }

    /// Whether both vertex and index data are present
    pub fn has_geometry(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    /// Vertex positions as points
    pub fn points(&self) -> Vec<Point3> {
        self.vertices.iter().map(|v| Point3::new(v[0], v[1], v[2])).collect()
    }
}

/// Surface description forwarded to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    /// Material name
    pub name: String,
    /// Linear RGBA base colour
    pub base_color: [f32; 4],
}

impl MaterialDesc {
    /// Opaque material of the given colour
    pub fn solid(name: impl Into<String>, rgb: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            base_color: [rgb[0], rgb[1], rgb[2], 1.0],
        }
    }
}

/// Light source kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    /// Omnidirectional point light
    Point,
    /// Parallel rays along the node's forward axis
    Directional,
    /// Cone along the node's forward axis
    Spot,
    /// Sky/ground ambient term
    Hemispheric,
}

/// Light parameters forwarded to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightDesc {
    /// Kind of light
    pub kind: LightKind,
    /// Linear RGB colour
    pub color: [f32; 3],
    /// Renderer-defined intensity
    pub intensity: f32,
}

impl LightDesc {
    /// White light of unit intensity
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
        }
    }
}

impl From<MaterialDesc> for Prop<MaterialDesc> {
    fn from(material: MaterialDesc) -> Self {
        Self::Value(material)
    }
}

/// Concrete kind of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Pure transform, nothing drawable
    Transform,
    /// Drawable triangle mesh
    Mesh(MeshData),
    /// Light source
    Light(LightDesc),
    /// A node type this crate does not manage (cameras, imported helpers)
    Custom(String),
}

impl NodeKind {
    /// Class name used in diagnostics
    pub fn class_name(&self) -> &str {
        match self {
            Self::Transform => "TransformNode",
            Self::Mesh(_) => "Mesh",
            Self::Light(light) => match light.kind {
                LightKind::Point => "PointLight",
                LightKind::Directional => "DirectionalLight",
                LightKind::Spot => "SpotLight",
                LightKind::Hemispheric => "HemisphericLight",
            },
            Self::Custom(class) => class,
        }
    }

    /// Whether the renderer holds a drawable for this node
    pub fn is_drawable(&self) -> bool {
        matches!(self, Self::Mesh(_) | Self::Light(_))
    }
}

bitflags! {
    /// Per-node change tracking
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeFlags: u8 {
        /// Local transform or parent changed since the last world refresh
        const LOCAL_DIRTY = 1 << 0;
        /// A material was assigned
        const HAS_MATERIAL = 1 << 1;
    }
}

/// A scene graph node
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) uid: u64,
    pub(crate) local: Transform,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
    pub(crate) world: Mat4,
    pub(crate) world_revision: u64,
    pub(crate) flags: NodeFlags,
}

impl Node {
    pub(crate) fn new(name: String, uid: u64, kind: NodeKind) -> Self {
        Self {
            name,
            uid,
            local: Transform::identity(),
            parent: None,
            children: Vec::new(),
            kind,
            world: Mat4::identity(),
            world_revision: 0,
            flags: NodeFlags::LOCAL_DIRTY,
        }
    }

    /// Node name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable numeric id, unique within one graph
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Local transform
    pub fn local(&self) -> &Transform {
        &self.local
    }

    /// Parent node
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Ordered children
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Node kind
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Incremented every time a refresh observes a new world matrix
    pub fn world_revision(&self) -> u64 {
        self.world_revision
    }

    /// Change-tracking flags
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_buffers_rejects_missing_data() {
        assert!(MeshData::from_buffers(&[], &[0, 1, 2]).is_none());
        assert!(MeshData::from_buffers(&[0.0, 0.0, 0.0], &[]).is_none());
        assert!(MeshData::from_buffers(&[0.0, 0.0], &[0, 1, 2]).is_none());

        let mesh = MeshData::from_buffers(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], &[0, 1, 2]).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_cuboid_is_closed() {
        let mesh = MeshData::cuboid(Vec3::new(1.0, 2.0, 3.0));
        assert!(mesh.has_geometry());
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.indices.len(), 12);
        // every edge is shared by exactly two triangles
        let mut edges = std::collections::HashMap::new();
        for tri in &mesh.indices {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        assert!(edges.values().all(|count| *count == 2));
    }
}
