//! Mesh data shared by the loader, the resource manager and the geometry pass.
//!
//! Vertices are pulled in the vertex shader through a buffer device address,
//! so `Vertex` is laid out for a std430 storage buffer: the two uv components
//! fill the padding after position and normal.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use crate::graphics_device::Buffer;
use crate::resource::AllocatedBuffer;
use crate::scene::MaterialKey;

/// One vertex as stored on the GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub uv_x: f32,
    pub normal: Vec3,
    pub uv_y: f32,
    pub color: Vec4,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            uv_x: 0.0,
            normal: Vec3::X,
            uv_y: 0.0,
            color: Vec4::ONE,
        }
    }
}

/// Index and vertex buffers of one uploaded mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuMeshBuffers {
    pub index_buffer: AllocatedBuffer,
    pub vertex_buffer: AllocatedBuffer,
    /// Device address of `vertex_buffer`, pushed with every draw
    pub vertex_buffer_address: u64,
}

impl GpuMeshBuffers {
    pub fn index_buffer_handle(&self) -> Buffer {
        self.index_buffer.buffer
    }
}

/// Axis-aligned bounding box plus enclosing sphere radius, in mesh space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub origin: Vec3,
    pub extents: Vec3,
    pub sphere_radius: f32,
}

impl Bounds {
    /// Bounds of a set of positions (zero-sized at the origin when empty)
    pub fn from_positions<I>(positions: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut iter = positions.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        let extents = (max - min) / 2.0;
        Self {
            origin: (max + min) / 2.0,
            extents,
            sphere_radius: extents.length(),
        }
    }

    /// The 8 corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let o = self.origin;
        let e = self.extents;
        [
            o + e * Vec3::new(1.0, 1.0, 1.0),
            o + e * Vec3::new(1.0, 1.0, -1.0),
            o + e * Vec3::new(1.0, -1.0, 1.0),
            o + e * Vec3::new(1.0, -1.0, -1.0),
            o + e * Vec3::new(-1.0, 1.0, 1.0),
            o + e * Vec3::new(-1.0, 1.0, -1.0),
            o + e * Vec3::new(-1.0, -1.0, 1.0),
            o + e * Vec3::new(-1.0, -1.0, -1.0),
        ]
    }
}

/// Index range of a mesh drawn with one material
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoSurface {
    pub start_index: u32,
    pub count: u32,
    pub bounds: Bounds,
    pub material: MaterialKey,
}

/// Named mesh: surfaces sharing one pair of GPU buffers
#[derive(Debug, Clone)]
pub struct MeshAsset {
    pub name: String,
    pub surfaces: Vec<GeoSurface>,
    pub mesh_buffers: GpuMeshBuffers,
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
