/// CommandRecorder implementation for VulkanDevice
///
/// Barriers and blits use synchronization2, rendering uses dynamic rendering.

use ash::vk;
use ash::vk::Handle;
use forge_3d_engine::forge3d::device::*;

use crate::vulkan_conversions::*;
use crate::vulkan_device::VulkanDevice;

fn cmd_raw(cmd: CommandBuffer) -> vk::CommandBuffer {
    vk::CommandBuffer::from_raw(cmd.raw())
}

fn full_rect(extent: Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: vk::Extent2D { width: extent.width, height: extent.height },
    }
}

fn color_layers(mip_level: u32) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Aspect of a transition: depth for depth images, or any image moved into a depth layout
pub(crate) fn barrier_aspect(format: Option<Format>, new_layout: ImageLayout) -> vk::ImageAspectFlags {
    match format {
        Some(format) => aspect_for_format(format),
        None if new_layout == ImageLayout::DepthAttachment => vk::ImageAspectFlags::DEPTH,
        None => vk::ImageAspectFlags::COLOR,
    }
}

impl CommandRecorder for VulkanDevice {
    fn cmd_transition_image(&self, cmd: CommandBuffer, barrier: &ImageBarrier) {
        let aspect_mask = barrier_aspect(self.image_format(barrier.image), barrier.new_layout);

        // Full pipeline barrier: simple and correct, not the cheapest
        let image_barrier = vk::ImageMemoryBarrier2::default()
            .src_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
            .src_access_mask(vk::AccessFlags2::MEMORY_WRITE)
            .dst_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
            .dst_access_mask(vk::AccessFlags2::MEMORY_WRITE | vk::AccessFlags2::MEMORY_READ)
            .old_layout(image_layout_to_vk(barrier.old_layout))
            .new_layout(image_layout_to_vk(barrier.new_layout))
            .image(vk::Image::from_raw(barrier.image.raw()))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: barrier.base_mip,
                level_count: barrier.mip_count.unwrap_or(vk::REMAINING_MIP_LEVELS),
                base_array_layer: 0,
                layer_count: vk::REMAINING_ARRAY_LAYERS,
            });

        let barriers = [image_barrier];
        let dependency = vk::DependencyInfo::default().image_memory_barriers(&barriers);
        unsafe { self.device.cmd_pipeline_barrier2(cmd_raw(cmd), &dependency) }
    }

    fn cmd_blit_image(&self, cmd: CommandBuffer, region: &BlitRegion) {
        let blit = vk::ImageBlit2::default()
            .src_subresource(color_layers(region.src_mip))
            .src_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: region.src_extent.width as i32,
                    y: region.src_extent.height as i32,
                    z: 1,
                },
            ])
            .dst_subresource(color_layers(region.dst_mip))
            .dst_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: region.dst_extent.width as i32,
                    y: region.dst_extent.height as i32,
                    z: 1,
                },
            ]);

        let regions = [blit];
        let info = vk::BlitImageInfo2::default()
            .src_image(vk::Image::from_raw(region.src.raw()))
            .src_image_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
            .dst_image(vk::Image::from_raw(region.dst.raw()))
            .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .filter(vk::Filter::LINEAR)
            .regions(&regions);
        unsafe { self.device.cmd_blit_image2(cmd_raw(cmd), &info) }
    }

    fn cmd_copy_buffer(&self, cmd: CommandBuffer, src: Buffer, dst: Buffer, regions: &[BufferCopy]) {
        let vk_regions: Vec<vk::BufferCopy> = regions
            .iter()
            .map(|r| vk::BufferCopy {
                src_offset: r.src_offset,
                dst_offset: r.dst_offset,
                size: r.size,
            })
            .collect();
        unsafe {
            self.device.cmd_copy_buffer(
                cmd_raw(cmd),
                vk::Buffer::from_raw(src.raw()),
                vk::Buffer::from_raw(dst.raw()),
                &vk_regions,
            )
        }
    }

    fn cmd_copy_buffer_to_image(&self, cmd: CommandBuffer, src: Buffer, dst: Image, extent: Extent3D) {
        let region = vk::BufferImageCopy {
            buffer_offset: 0,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: color_layers(0),
            image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            image_extent: vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: extent.depth.max(1),
            },
        };
        unsafe {
            self.device.cmd_copy_buffer_to_image(
                cmd_raw(cmd),
                vk::Buffer::from_raw(src.raw()),
                vk::Image::from_raw(dst.raw()),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            )
        }
    }

    fn cmd_bind_pipeline(&self, cmd: CommandBuffer, bind_point: PipelineBindPoint, pipeline: Pipeline) {
        unsafe {
            self.device.cmd_bind_pipeline(
                cmd_raw(cmd),
                bind_point_to_vk(bind_point),
                vk::Pipeline::from_raw(pipeline.raw()),
            )
        }
    }

    fn cmd_bind_descriptor_sets(
        &self,
        cmd: CommandBuffer,
        bind_point: PipelineBindPoint,
        layout: PipelineLayout,
        first_set: u32,
        sets: &[DescriptorSet],
    ) {
        let vk_sets: Vec<vk::DescriptorSet> = sets
            .iter()
            .map(|set| vk::DescriptorSet::from_raw(set.raw()))
            .collect();
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                cmd_raw(cmd),
                bind_point_to_vk(bind_point),
                vk::PipelineLayout::from_raw(layout.raw()),
                first_set,
                &vk_sets,
                &[],
            )
        }
    }

    fn cmd_push_constants(
        &self,
        cmd: CommandBuffer,
        layout: PipelineLayout,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    ) {
        unsafe {
            self.device.cmd_push_constants(
                cmd_raw(cmd),
                vk::PipelineLayout::from_raw(layout.raw()),
                shader_stages_to_vk(stages),
                offset,
                data,
            )
        }
    }

    fn cmd_dispatch(&self, cmd: CommandBuffer, x: u32, y: u32, z: u32) {
        unsafe { self.device.cmd_dispatch(cmd_raw(cmd), x, y, z) }
    }

    fn cmd_begin_rendering(&self, cmd: CommandBuffer, info: &RenderingInfo) {
        let load_op = if info.clear_color.is_some() {
            vk::AttachmentLoadOp::CLEAR
        } else {
            vk::AttachmentLoadOp::LOAD
        };
        let clear = vk::ClearValue {
            color: vk::ClearColorValue {
                float32: info.clear_color.unwrap_or([0.0; 4]),
            },
        };
        let color_attachments = [vk::RenderingAttachmentInfo::default()
            .image_view(vk::ImageView::from_raw(info.color_view.raw()))
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(load_op)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(clear)];

        // Depth is always cleared to the far plane
        let depth_attachment = info.depth_view.map(|view| {
            vk::RenderingAttachmentInfo::default()
                .image_view(vk::ImageView::from_raw(view.raw()))
                .image_layout(vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::STORE)
                .clear_value(vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
                })
        });

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(full_rect(info.extent))
            .layer_count(1)
            .color_attachments(&color_attachments);
        if let Some(depth) = depth_attachment.as_ref() {
            rendering_info = rendering_info.depth_attachment(depth);
        }

        unsafe { self.device.cmd_begin_rendering(cmd_raw(cmd), &rendering_info) }
    }

    fn cmd_end_rendering(&self, cmd: CommandBuffer) {
        unsafe { self.device.cmd_end_rendering(cmd_raw(cmd)) }
    }

    fn cmd_set_viewport(&self, cmd: CommandBuffer, extent: Extent2D) {
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        unsafe { self.device.cmd_set_viewport(cmd_raw(cmd), 0, &[viewport]) }
    }

    fn cmd_set_scissor(&self, cmd: CommandBuffer, extent: Extent2D) {
        unsafe { self.device.cmd_set_scissor(cmd_raw(cmd), 0, &[full_rect(extent)]) }
    }

    fn cmd_bind_index_buffer(&self, cmd: CommandBuffer, buffer: Buffer, offset: u64) {
        unsafe {
            self.device.cmd_bind_index_buffer(
                cmd_raw(cmd),
                vk::Buffer::from_raw(buffer.raw()),
                offset,
                vk::IndexType::UINT32,
            )
        }
    }

    fn cmd_draw_indexed(
        &self,
        cmd: CommandBuffer,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.cmd_draw_indexed(
                cmd_raw(cmd),
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            )
        }
    }
}
