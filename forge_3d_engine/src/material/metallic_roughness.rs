/// glTF metallic-roughness material family
///
/// Builds the opaque and transparent mesh pipelines that share one material
/// descriptor layout, and stamps material instances out of per-material
/// resources.

use std::path::PathBuf;
use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use crate::config::EngineConfig;
use crate::descriptor::{DescriptorAllocatorGrowable, DescriptorLayoutBuilder, DescriptorWriter};
use crate::error::Result;
use crate::graphics_device::{
    Buffer, CompareOp, CullMode, DescriptorBinding, DescriptorSetLayout, DescriptorType, Format,
    FrontFace, GraphicsDevice, ImageLayout, PipelineLayoutDesc, PolygonMode, PrimitiveTopology,
    PushConstantRange, Sampler, ShaderModule, ShaderStages,
};
use crate::material::{MaterialInstance, MaterialPass, MaterialPipeline};
use crate::renderer::{GpuDrawPushConstants, PipelineBuilder};
use crate::resource::{load_shader_module, AllocatedImage};
use crate::engine_info;

pub const MATERIAL_VERTEX_SHADER: &str = "mesh.vert.spv";
pub const MATERIAL_FRAGMENT_SHADER: &str = "mesh.frag.spv";

/// Material uniform block (binding 0 of the material set)
///
/// Padded to 256 bytes so consecutive materials can share one buffer at
/// offsets that satisfy any uniform-buffer alignment.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialConstants {
    pub color_factors: Vec4,
    pub metal_rough_factors: Vec4,
    pub extra: [Vec4; 14],
}

impl Default for MaterialConstants {
    fn default() -> Self {
        Self {
            color_factors: Vec4::ONE,
            metal_rough_factors: Vec4::new(1.0, 0.5, 0.0, 0.0),
            extra: [Vec4::ZERO; 14],
        }
    }
}

/// Textures and uniform data of one material
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialResources {
    pub color_image: AllocatedImage,
    pub color_sampler: Sampler,
    pub metal_rough_image: AllocatedImage,
    pub metal_rough_sampler: Sampler,
    pub data_buffer: Buffer,
    pub data_buffer_offset: u64,
}

/// Inputs of `GltfMetallicRoughness::build_pipelines`
#[derive(Debug, Clone)]
pub struct MaterialPipelineDesc {
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub push_constant_size: u32,
    /// Bindings of the material set
    pub bindings: Vec<DescriptorBinding>,
    /// Layouts bound before the material set (the scene set at set 0)
    pub external_layouts: Vec<DescriptorSetLayout>,
    pub color_format: Format,
    pub depth_format: Format,
}

impl MaterialPipelineDesc {
    /// Standard metallic-roughness setup: uniform block plus two sampled textures
    pub fn metallic_roughness(
        config: &EngineConfig,
        scene_layout: DescriptorSetLayout,
        color_format: Format,
        depth_format: Format,
    ) -> Self {
        Self {
            vertex_shader: config.shader_path(MATERIAL_VERTEX_SHADER),
            fragment_shader: config.shader_path(MATERIAL_FRAGMENT_SHADER),
            push_constant_size: std::mem::size_of::<GpuDrawPushConstants>() as u32,
            bindings: vec![
                DescriptorBinding { binding: 0, ty: DescriptorType::UniformBuffer },
                DescriptorBinding { binding: 1, ty: DescriptorType::CombinedImageSampler },
                DescriptorBinding { binding: 2, ty: DescriptorType::CombinedImageSampler },
            ],
            external_layouts: vec![scene_layout],
            color_format,
            depth_format,
        }
    }
}

/// Opaque and transparent pipelines of the metallic-roughness family
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GltfMetallicRoughness {
    pub opaque_pipeline: MaterialPipeline,
    pub transparent_pipeline: MaterialPipeline,
    pub material_layout: DescriptorSetLayout,
}

impl GltfMetallicRoughness {
    /// Load the mesh shaders and build both pipelines
    ///
    /// Opaque: depth test and write, no blending. Transparent: additive
    /// blending, depth tested but not written. The shader modules are released
    /// once both pipelines exist.
    pub fn build_pipelines(device: &dyn GraphicsDevice, desc: &MaterialPipelineDesc) -> Result<Self> {
        let vertex_shader = load_shader_module(device, &desc.vertex_shader)?;
        let fragment_shader = match load_shader_module(device, &desc.fragment_shader) {
            Ok(module) => module,
            Err(e) => {
                device.destroy_shader_module(vertex_shader);
                return Err(e);
            }
        };

        let result = Self::build_with_shaders(device, desc, vertex_shader, fragment_shader);

        device.destroy_shader_module(vertex_shader);
        device.destroy_shader_module(fragment_shader);

        if result.is_ok() {
            engine_info!("forge3d::GltfMetallicRoughness", "Material pipelines built");
        }
        result
    }

    fn build_with_shaders(
        device: &dyn GraphicsDevice,
        desc: &MaterialPipelineDesc,
        vertex_shader: ShaderModule,
        fragment_shader: ShaderModule,
    ) -> Result<Self> {
        let mut layout_builder = DescriptorLayoutBuilder::new();
        for binding in &desc.bindings {
            layout_builder.add_binding(binding.binding, binding.ty);
        }
        let material_layout =
            layout_builder.build(device, ShaderStages::VERTEX | ShaderStages::FRAGMENT)?;

        let mut set_layouts = desc.external_layouts.clone();
        set_layouts.push(material_layout);
        let layout = match device.create_pipeline_layout(&PipelineLayoutDesc {
            set_layouts,
            push_constants: vec![PushConstantRange {
                stages: ShaderStages::VERTEX,
                offset: 0,
                size: desc.push_constant_size,
            }],
        }) {
            Ok(layout) => layout,
            Err(e) => {
                device.destroy_descriptor_set_layout(material_layout);
                return Err(e);
            }
        };

        let mut builder = PipelineBuilder::new(layout);
        builder
            .set_shaders(vertex_shader, fragment_shader)
            .set_input_topology(PrimitiveTopology::TriangleList)
            .set_polygon_mode(PolygonMode::Fill)
            .set_cull_mode(CullMode::None, FrontFace::Clockwise)
            .disable_blending()
            .enable_depthtest(true, CompareOp::Less)
            .set_color_attachment_format(desc.color_format)
            .set_depth_format(desc.depth_format);

        let release_layouts = |device: &dyn GraphicsDevice| {
            device.destroy_pipeline_layout(layout);
            device.destroy_descriptor_set_layout(material_layout);
        };

        let opaque = match builder.build(device) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                release_layouts(device);
                return Err(e);
            }
        };

        builder.enable_blending_additive().enable_depthtest(false, CompareOp::Less);
        let transparent = match builder.build(device) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                device.destroy_pipeline(opaque);
                release_layouts(device);
                return Err(e);
            }
        };

        Ok(Self {
            opaque_pipeline: MaterialPipeline { pipeline: opaque, layout },
            transparent_pipeline: MaterialPipeline { pipeline: transparent, layout },
            material_layout,
        })
    }

    /// Allocate and fill a material set for `resources`
    pub fn write_material(
        &self,
        device: &dyn GraphicsDevice,
        pass: MaterialPass,
        resources: &MaterialResources,
        allocator: &mut DescriptorAllocatorGrowable,
    ) -> Result<MaterialInstance> {
        let pipeline = if pass.is_transparent() {
            self.transparent_pipeline
        } else {
            self.opaque_pipeline
        };
        let material_set = allocator.allocate(device, self.material_layout)?;

        let mut writer = DescriptorWriter::new();
        writer
            .write_buffer(
                0,
                resources.data_buffer,
                std::mem::size_of::<MaterialConstants>() as u64,
                resources.data_buffer_offset,
                DescriptorType::UniformBuffer,
            )
            .write_image(
                1,
                resources.color_image.view,
                resources.color_sampler,
                ImageLayout::ShaderReadOnly,
                DescriptorType::CombinedImageSampler,
            )
            .write_image(
                2,
                resources.metal_rough_image.view,
                resources.metal_rough_sampler,
                ImageLayout::ShaderReadOnly,
                DescriptorType::CombinedImageSampler,
            );
        writer.update_set(device, material_set);

        Ok(MaterialInstance { pipeline, material_set, pass })
    }

    /// Destroy the layouts and both pipelines (the pipeline layout is shared)
    pub fn clear_resources(&self, device: &dyn GraphicsDevice) {
        device.destroy_descriptor_set_layout(self.material_layout);
        device.destroy_pipeline_layout(self.opaque_pipeline.layout);
        device.destroy_pipeline(self.opaque_pipeline.pipeline);
        device.destroy_pipeline(self.transparent_pipeline.pipeline);
    }
}

#[cfg(test)]
#[path = "metallic_roughness_tests.rs"]
mod tests;
