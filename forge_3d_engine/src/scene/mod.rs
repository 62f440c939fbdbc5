//! Scene module
//!
//! Scene graph with transform propagation, render-object extraction into a
//! draw context, visibility culling, and the loaded-scene container the
//! loader fills.

mod culling;
mod draw_context;
mod loaded_scene;
mod scene_graph;

use slotmap::new_key_type;

new_key_type! {
    /// Stable key of a node inside a scene graph
    pub struct NodeKey;
    /// Stable key of a mesh inside a loaded scene
    pub struct MeshKey;
    /// Stable key of a material inside a loaded scene
    pub struct MaterialKey;
}

pub use culling::is_visible;
pub use draw_context::{DrawContext, RenderObject};
pub use loaded_scene::{LoadedScene, LoadedSceneBuilder, MaterialTextures};
pub use scene_graph::{Node, NodeKind, SceneGraph};
