/// Flat per-frame draw lists produced by scene traversal

use glam::Mat4;
use crate::graphics_device::Buffer;
use crate::material::MaterialInstance;
use crate::resource::Bounds;

/// Everything needed to record one indexed draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderObject {
    pub index_count: u32,
    pub first_index: u32,
    pub index_buffer: Buffer,
    pub material: MaterialInstance,
    pub bounds: Bounds,
    pub transform: Mat4,
    pub vertex_buffer_address: u64,
}

/// Render objects of one frame, split by pass
#[derive(Debug, Default, Clone)]
pub struct DrawContext {
    pub opaque_surfaces: Vec<RenderObject>,
    pub transparent_surfaces: Vec<RenderObject>,
}

impl DrawContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty both lists, keeping their capacity
    pub fn clear(&mut self) {
        self.opaque_surfaces.clear();
        self.transparent_surfaces.clear();
    }

    /// Append to the transparent list if the material is transparent, else to the opaque list
    pub fn push(&mut self, object: RenderObject) {
        if object.material.pass.is_transparent() {
            self.transparent_surfaces.push(object);
        } else {
            self.opaque_surfaces.push(object);
        }
    }

    pub fn len(&self) -> usize {
        self.opaque_surfaces.len() + self.transparent_surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "draw_context_tests.rs"]
mod tests;
