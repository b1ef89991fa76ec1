//! Asset containers
//!
//! A container is a decoded, scene-independent template tree. Instantiating
//! it copies the template into a [`SceneGraph`], optionally keeping only the
//! nodes whose names pass a filter.

use serde::{Deserialize, Serialize};

use crate::foundation::collections::NodeId;
use crate::foundation::math::Vec3;
use crate::scene::{LightDesc, MeshData, NodeKind, SceneGraph};

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

/// Template node of an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetNode {
    /// Node name used by instantiation filters
    pub name: String,
    /// Local position
    #[serde(default)]
    pub position: [f32; 3],
    /// Local Euler rotation in radians
    #[serde(default)]
    pub rotation: [f32; 3],
    /// Local scale
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    /// Geometry; makes the node a mesh
    #[serde(default)]
    pub mesh: Option<MeshData>,
    /// Light parameters; makes the node a light
    #[serde(default)]
    pub light: Option<LightDesc>,
    /// Foreign node class (camera, helper, ...) for anything else
    #[serde(default)]
    pub class: Option<String>,
    /// Child templates
    #[serde(default)]
    pub children: Vec<AssetNode>,
}

impl AssetNode {
    /// Plain transform template
    pub fn transform(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: unit_scale(),
            mesh: None,
            light: None,
            class: None,
            children: Vec::new(),
        }
    }

    /// Mesh template
    pub fn mesh(name: impl Into<String>, mesh: MeshData) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::transform(name)
        }
    }

    /// Light template
    pub fn light(name: impl Into<String>, light: LightDesc) -> Self {
        Self {
            light: Some(light),
            ..Self::transform(name)
        }
    }

    /// Template of a node kind this crate does not manage
    pub fn custom(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            ..Self::transform(name)
        }
    }

    /// Set the local position
    pub fn with_position(mut self, position: [f32; 3]) -> Self {
        self.position = position;
        self
    }

    /// Append a child template
    pub fn with_child(mut self, child: AssetNode) -> Self {
        self.children.push(child);
        self
    }

    fn kind(&self) -> NodeKind {
        match (&self.mesh, &self.light, &self.class) {
            (Some(mesh), _, _) => NodeKind::Mesh(mesh.clone()),
            (None, Some(light), _) => NodeKind::Light(light.clone()),
            (None, None, Some(class)) => NodeKind::Custom(class.clone()),
            (None, None, None) => NodeKind::Transform,
        }
    }
}

/// Decoded asset: one or more template trees
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetContainer {
    /// Top-level templates
    pub roots: Vec<AssetNode>,
}

impl AssetContainer {
    /// Container with the given top-level templates
    pub fn new(roots: Vec<AssetNode>) -> Self {
        Self { roots }
    }

    /// Copy the templates into `graph` and return the new root nodes.
    ///
    /// Templates rejected by `include` are skipped; their included
    /// descendants attach to the nearest included ancestor, or become roots.
    pub fn instantiate(&self, graph: &mut SceneGraph, include: &dyn Fn(&str) -> bool) -> Vec<NodeId> {
        let mut roots = Vec::new();
        for template in &self.roots {
            instantiate_node(template, None, graph, include, &mut roots);
        }
        roots
    }
}

fn instantiate_node(
    template: &AssetNode,
    parent: Option<NodeId>,
    graph: &mut SceneGraph,
    include: &dyn Fn(&str) -> bool,
    roots: &mut Vec<NodeId>,
) {
    let mut next_parent = parent;
    if include(&template.name) {
        let node = graph.create_node(template.name.clone(), template.kind());
        if let Err(err) = graph.apply_transform(
            node,
            Vec3::from(template.position),
            Vec3::from(template.rotation),
            Vec3::from(template.scale),
        ) {
            log::warn!("Asset node `{}`: {err}", template.name);
        }
        match parent {
            Some(parent) => {
                if let Err(err) = graph.attach(node, Some(parent)) {
                    log::warn!("Asset node `{}`: {err}", template.name);
                }
            }
            None => roots.push(node),
        }
        next_parent = Some(node);
    }
    for child in &template.children {
        instantiate_node(child, next_parent, graph, include, roots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ship() -> AssetContainer {
        AssetContainer::new(vec![AssetNode::transform("__root__").with_child(
            AssetNode::mesh("hull", MeshData::cuboid(Vec3::new(1.0, 1.0, 1.0)))
                .with_position([0.0, 2.0, 0.0])
                .with_child(AssetNode::light("light", LightDesc::new(crate::scene::LightKind::Point))),
        )])
    }

    #[test]
    fn test_instantiate_everything_keeps_hierarchy() {
        let mut graph = SceneGraph::default();
        let roots = ship().instantiate(&mut graph, &|_| true);

        assert_eq!(roots.len(), 1);
        assert_eq!(graph.len(), 3);
        let hull = graph.find_by_name("hull").unwrap();
        assert_eq!(graph.parent(hull), Some(roots[0]));
        assert_relative_eq!(graph.absolute_position(hull).unwrap(), Vec3::new(0.0, 2.0, 0.0));
        let light = graph.find_by_name("light").unwrap();
        assert_eq!(graph.kind(light).map(NodeKind::class_name), Some("PointLight"));
    }

    #[test]
    fn test_filtered_nodes_promote_descendants() {
        let mut graph = SceneGraph::default();
        let roots = ship().instantiate(&mut graph, &|name| name != "__root__");

        assert_eq!(roots.len(), 1);
        assert_eq!(graph.name(roots[0]), Some("hull"));
        assert_eq!(graph.parent(roots[0]), None);
    }

    #[test]
    fn test_filtering_siblings_yields_multiple_roots() {
        let mut graph = SceneGraph::default();
        let container = AssetContainer::new(vec![
            AssetNode::transform("a"),
            AssetNode::transform("b"),
            AssetNode::transform("c"),
        ]);
        let roots = container.instantiate(&mut graph, &|name| name != "b");
        let names: Vec<_> = roots.iter().filter_map(|id| graph.name(*id)).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_ron_template_defaults() {
        let container: AssetContainer =
            ron::from_str(r#"(roots: [(name: "crate", position: (1.0, 0.0, 0.0))])"#).unwrap();
        assert_eq!(container.roots[0].scale, [1.0, 1.0, 1.0]);
        assert!(container.roots[0].children.is_empty());
    }
}
