/// Forward geometry pass
///
/// Turns the frame's draw context into indexed draws into the draw image.
/// Opaque objects are frustum culled; transparent objects are drawn after
/// them, unculled, in traversal order. State changes are filtered: the
/// pipeline (with the scene set, viewport and scissor) is rebound only when it
/// changes, the material set only when the material instance changes, and
/// the index buffer only when a different one is needed.

use std::time::Instant;
use crate::descriptor::{DescriptorLayoutBuilder, DescriptorWriter};
use crate::error::Result;
use crate::frame::FrameContext;
use crate::graphics_device::{
    Buffer, BufferDesc, BufferUsage, CommandBuffer, DescriptorSetLayout, DescriptorType, Extent2D,
    GraphicsDevice, ImageView, MemoryLocation, Pipeline, PipelineBindPoint, RenderingInfo,
    ShaderStages,
};
use crate::material::MaterialInstance;
use crate::renderer::{GpuDrawPushConstants, GpuSceneData};
use crate::scene::{is_visible, DrawContext, RenderObject};

/// Per-frame counters shown by the harness
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineStats {
    pub frame_time_ms: f32,
    pub scene_update_time_ms: f32,
    pub mesh_draw_time_ms: f32,
    pub triangle_count: u32,
    pub drawcall_count: u32,
}

/// Attachments the pass renders into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryTargets {
    pub color_view: ImageView,
    pub depth_view: ImageView,
    pub extent: Extent2D,
}

/// Indices of the opaque objects that survive culling, in submission order
pub fn visible_opaque_order(ctx: &DrawContext, viewproj: &glam::Mat4, sort: bool) -> Vec<usize> {
    let mut order: Vec<usize> = ctx
        .opaque_surfaces
        .iter()
        .enumerate()
        .filter(|(_, object)| is_visible(object, viewproj))
        .map(|(index, _)| index)
        .collect();

    if sort {
        // Stable, so equal keys keep traversal order
        order.sort_by_key(|&index| {
            let object = &ctx.opaque_surfaces[index];
            (object.material.material_set, object.index_buffer)
        });
    }
    order
}

/// Last bound state inside one rendering scope
#[derive(Default)]
struct BoundState {
    pipeline: Option<Pipeline>,
    material: Option<MaterialInstance>,
    index_buffer: Option<Buffer>,
}

#[derive(Debug, Clone, Copy)]
pub struct GeometryPass {
    scene_layout: DescriptorSetLayout,
    sort_opaque_draws: bool,
}

impl GeometryPass {
    /// Create the scene-data set layout (one uniform buffer, vertex + fragment)
    pub fn new(device: &dyn GraphicsDevice, sort_opaque_draws: bool) -> Result<Self> {
        let scene_layout = DescriptorLayoutBuilder::new()
            .add_binding(0, DescriptorType::UniformBuffer)
            .build(device, ShaderStages::VERTEX | ShaderStages::FRAGMENT)?;
        Ok(Self { scene_layout, sort_opaque_draws })
    }

    pub fn scene_layout(&self) -> DescriptorSetLayout {
        self.scene_layout
    }

    /// Record the pass
    ///
    /// The scene uniform buffer is created fresh for this frame and its
    /// destruction queued on `frame`, so it lives until the slot's fence has
    /// signaled again. The scene set comes from the frame's transient
    /// allocator.
    pub fn record(
        &self,
        device: &dyn GraphicsDevice,
        cmd: CommandBuffer,
        frame: &mut FrameContext,
        targets: &GeometryTargets,
        ctx: &DrawContext,
        scene_data: &GpuSceneData,
        stats: &mut EngineStats,
    ) -> Result<()> {
        let start = Instant::now();
        stats.drawcall_count = 0;
        stats.triangle_count = 0;

        let opaque_order = visible_opaque_order(ctx, &scene_data.viewproj, self.sort_opaque_draws);

        let scene_buffer_size = std::mem::size_of::<GpuSceneData>() as u64;
        let scene_buffer = device.create_buffer(&BufferDesc {
            size: scene_buffer_size,
            usage: BufferUsage::UNIFORM,
            location: MemoryLocation::CpuToGpu,
        })?;
        frame.deletion_queue.push(move |device| device.destroy_buffer(scene_buffer));
        device.write_buffer(scene_buffer, 0, bytemuck::bytes_of(scene_data))?;

        let scene_set = frame.descriptors.allocate(device, self.scene_layout)?;
        DescriptorWriter::new()
            .write_buffer(0, scene_buffer, scene_buffer_size, 0, DescriptorType::UniformBuffer)
            .update_set(device, scene_set);

        device.cmd_begin_rendering(
            cmd,
            &RenderingInfo {
                color_view: targets.color_view,
                clear_color: None,
                depth_view: Some(targets.depth_view),
                extent: targets.extent,
            },
        );

        let mut bound = BoundState::default();
        let mut draw = |object: &RenderObject| {
            if bound.material != Some(object.material) {
                bound.material = Some(object.material);
                let pipeline = object.material.pipeline;

                if bound.pipeline != Some(pipeline.pipeline) {
                    bound.pipeline = Some(pipeline.pipeline);
                    device.cmd_bind_pipeline(cmd, PipelineBindPoint::Graphics, pipeline.pipeline);
                    device.cmd_bind_descriptor_sets(cmd, PipelineBindPoint::Graphics, pipeline.layout, 0, &[scene_set]);
                    device.cmd_set_viewport(cmd, targets.extent);
                    device.cmd_set_scissor(cmd, targets.extent);
                }

                device.cmd_bind_descriptor_sets(
                    cmd,
                    PipelineBindPoint::Graphics,
                    pipeline.layout,
                    1,
                    &[object.material.material_set],
                );
            }

            if bound.index_buffer != Some(object.index_buffer) {
                bound.index_buffer = Some(object.index_buffer);
                device.cmd_bind_index_buffer(cmd, object.index_buffer, 0);
            }

            let push = GpuDrawPushConstants::new(object.transform, object.vertex_buffer_address);
            device.cmd_push_constants(
                cmd,
                object.material.pipeline.layout,
                ShaderStages::VERTEX,
                0,
                bytemuck::bytes_of(&push),
            );
            device.cmd_draw_indexed(cmd, object.index_count, 1, object.first_index, 0, 0);

            stats.drawcall_count += 1;
            stats.triangle_count += object.index_count / 3;
        };

        for &index in &opaque_order {
            draw(&ctx.opaque_surfaces[index]);
        }
        for object in &ctx.transparent_surfaces {
            draw(object);
        }

        device.cmd_end_rendering(cmd);

        stats.mesh_draw_time_ms = start.elapsed().as_secs_f32() * 1000.0;
        Ok(())
    }

    pub fn destroy(&self, device: &dyn GraphicsDevice) {
        device.destroy_descriptor_set_layout(self.scene_layout);
    }
}

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod tests;
