/// Scene graph: node arena, transform propagation and draw traversal.
///
/// Nodes live in a `SlotMap` and refer to each other by `NodeKey`; the parent
/// link is a plain optional key, so there are no reference cycles to manage.
/// World transforms are cached on the nodes and only recomputed by
/// `refresh_transform`, never during traversal.

use glam::Mat4;
use slotmap::SlotMap;
use crate::error::{Error, Result};
use crate::material::MaterialInstance;
use crate::resource::MeshAsset;
use crate::scene::{DrawContext, MaterialKey, MeshKey, NodeKey, RenderObject};

/// What a node contributes when drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeKind {
    /// Transform only
    #[default]
    Plain,
    /// Emits one render object per surface of the mesh
    Mesh(MeshKey),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub local_transform: Mat4,
    pub world_transform: Mat4,
    pub parent: Option<NodeKey>,
    pub children: Vec<NodeKey>,
    pub kind: NodeKind,
}

#[derive(Debug, Default, Clone)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, Node>,
    /// Nodes without a parent, in insertion order
    roots: Vec<NodeKey>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node under `parent` (or as a root)
    ///
    /// The world transform is computed from the parent's current world
    /// transform.
    pub fn add_node(&mut self, parent: Option<NodeKey>, local_transform: Mat4, kind: NodeKind) -> Result<NodeKey> {
        let parent_world = match parent {
            Some(parent_key) => {
                self.nodes
                    .get(parent_key)
                    .ok_or_else(|| Error::InvalidResource("parent node not in scene graph".to_string()))?
                    .world_transform
            }
            None => Mat4::IDENTITY,
        };

        let key = self.nodes.insert(Node {
            local_transform,
            world_transform: parent_world * local_transform,
            parent,
            children: Vec::new(),
            kind,
        });

        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent_node) => parent_node.children.push(key),
            None => self.roots.push(key),
        }
        Ok(key)
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Replace a node's local transform and refresh its subtree
    pub fn set_local_transform(&mut self, key: NodeKey, local_transform: Mat4) -> Result<()> {
        let node = self
            .nodes
            .get_mut(key)
            .ok_or_else(|| Error::InvalidResource("node not in scene graph".to_string()))?;
        node.local_transform = local_transform;
        let parent = node.parent;

        let parent_world = parent
            .and_then(|p| self.nodes.get(p))
            .map(|p| p.world_transform)
            .unwrap_or(Mat4::IDENTITY);
        self.refresh_transform(key, parent_world);
        Ok(())
    }

    /// Recompute `world = parent_matrix * local` for `key` and, top-down, its descendants
    pub fn refresh_transform(&mut self, key: NodeKey, parent_matrix: Mat4) {
        let mut pending = vec![(key, parent_matrix)];
        while let Some((key, parent_matrix)) = pending.pop() {
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };
            node.world_transform = parent_matrix * node.local_transform;
            let world = node.world_transform;
            pending.extend(node.children.iter().map(|&child| (child, world)));
        }
    }

    /// Refresh every root subtree from the identity
    pub fn refresh_all(&mut self) {
        for root in self.roots.clone() {
            self.refresh_transform(root, Mat4::IDENTITY);
        }
    }

    /// Emit render objects for every mesh node, pre-order from the roots
    ///
    /// Surfaces whose material key is missing from `materials` are skipped.
    pub fn draw(
        &self,
        top_matrix: &Mat4,
        meshes: &SlotMap<MeshKey, MeshAsset>,
        materials: &SlotMap<MaterialKey, MaterialInstance>,
        ctx: &mut DrawContext,
    ) {
        let mut pending: Vec<NodeKey> = self.roots.iter().rev().copied().collect();
        while let Some(key) = pending.pop() {
            let Some(node) = self.nodes.get(key) else {
                continue;
            };

            if let NodeKind::Mesh(mesh_key) = node.kind {
                if let Some(mesh) = meshes.get(mesh_key) {
                    let node_matrix = *top_matrix * node.world_transform;
                    for surface in &mesh.surfaces {
                        let Some(material) = materials.get(surface.material) else {
                            continue;
                        };
                        ctx.push(RenderObject {
                            index_count: surface.count,
                            first_index: surface.start_index,
                            index_buffer: mesh.mesh_buffers.index_buffer_handle(),
                            material: *material,
                            bounds: surface.bounds,
                            transform: node_matrix,
                            vertex_buffer_address: mesh.mesh_buffers.vertex_buffer_address,
                        });
                    }
                }
            }

            pending.extend(node.children.iter().rev().copied());
        }
    }
}

#[cfg(test)]
#[path = "scene_graph_tests.rs"]
mod tests;
