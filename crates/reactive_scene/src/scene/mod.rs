//! Scene graph and mount scopes
//!
//! The imperative half of the crate: a hierarchy of nodes with local
//! transforms, the render collaborator it reports to and the [`Scope`]
//! components use to find their enclosing node and providers.

pub mod node;
pub mod renderer;
pub mod scene_graph;
pub mod scope;

pub use node::{LightDesc, LightKind, MaterialDesc, MeshData, Node, NodeFlags, NodeKind};
pub use renderer::{NullRenderer, RenderBackend, RenderLog};
pub use scene_graph::{SceneError, SceneGraph};
pub use scope::{ContextError, SceneContext, Scope, TransformProps};
