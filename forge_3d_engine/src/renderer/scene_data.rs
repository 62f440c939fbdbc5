/// GPU-facing data blocks: scene uniforms and push constants
///
/// All of these are uploaded as raw bytes, so they are `#[repr(C)]` and `Pod`
/// with any padding spelled out.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// Per-frame scene uniform buffer (set 0, binding 0)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuSceneData {
    pub view: Mat4,
    pub proj: Mat4,
    pub viewproj: Mat4,
    pub ambient_color: Vec4,
    /// xyz direction, w sun power
    pub sunlight_direction: Vec4,
    pub sunlight_color: Vec4,
}

impl Default for GpuSceneData {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            viewproj: Mat4::IDENTITY,
            ambient_color: Vec4::splat(0.1),
            sunlight_direction: Vec4::new(0.0, 1.0, 0.5, 1.0),
            sunlight_color: Vec4::new(0.5, 0.5, 0.5, 1.0),
        }
    }
}

/// Per-draw push constants of the mesh pipelines (vertex stage)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuDrawPushConstants {
    pub world_matrix: Mat4,
    /// Device address of the vertex buffer the shader pulls from
    pub vertex_buffer: u64,
    pub _padding: u64,
}

impl GpuDrawPushConstants {
    pub fn new(world_matrix: Mat4, vertex_buffer: u64) -> Self {
        Self { world_matrix, vertex_buffer, _padding: 0 }
    }
}

/// Free-form parameters of a background compute effect
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ComputePushConstants {
    pub data1: Vec4,
    pub data2: Vec4,
    pub data3: Vec4,
    pub data4: Vec4,
}

/// Perspective projection used by the geometry pass
///
/// 70 degree vertical field of view, near 0.1, far 10000, Y flipped so +Y
/// points up in clip space.
pub fn scene_projection(aspect_ratio: f32) -> Mat4 {
    let mut proj = Mat4::perspective_rh(70f32.to_radians(), aspect_ratio, 0.1, 10000.0);
    proj.y_axis.y *= -1.0;
    proj
}

#[cfg(test)]
#[path = "scene_data_tests.rs"]
mod tests;
