/// Graphics pipeline builder
///
/// Accumulates fixed-function state with chained setters and produces a
/// `GraphicsPipelineDesc` for `GraphicsDevice::create_graphics_pipeline`.
/// The builder can be reused: change a few settings and build again to get a
/// variant sharing the rest of the state.

use crate::error::Result;
use crate::graphics_device::{
    BlendMode, CompareOp, CullMode, DepthState, Format, FrontFace, GraphicsDevice,
    GraphicsPipelineDesc, Pipeline, PipelineLayout, PolygonMode, PrimitiveTopology, ShaderModule,
};
use crate::engine_bail;

#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    pub layout: PipelineLayout,
    vertex_shader: ShaderModule,
    fragment_shader: ShaderModule,
    topology: PrimitiveTopology,
    polygon_mode: PolygonMode,
    cull_mode: CullMode,
    front_face: FrontFace,
    blend: BlendMode,
    depth: DepthState,
    color_format: Format,
    depth_format: Option<Format>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            layout: PipelineLayout::NULL,
            vertex_shader: ShaderModule::NULL,
            fragment_shader: ShaderModule::NULL,
            topology: PrimitiveTopology::TriangleList,
            polygon_mode: PolygonMode::Fill,
            cull_mode: CullMode::None,
            front_face: FrontFace::Clockwise,
            blend: BlendMode::Disabled,
            depth: DepthState::DISABLED,
            color_format: Format::R16G16B16A16_SFLOAT,
            depth_format: None,
        }
    }
}

impl PipelineBuilder {
    pub fn new(layout: PipelineLayout) -> Self {
        Self { layout, ..Default::default() }
    }

    pub fn set_shaders(&mut self, vertex: ShaderModule, fragment: ShaderModule) -> &mut Self {
        self.vertex_shader = vertex;
        self.fragment_shader = fragment;
        self
    }

    pub fn set_input_topology(&mut self, topology: PrimitiveTopology) -> &mut Self {
        self.topology = topology;
        self
    }

    pub fn set_polygon_mode(&mut self, mode: PolygonMode) -> &mut Self {
        self.polygon_mode = mode;
        self
    }

    pub fn set_cull_mode(&mut self, cull_mode: CullMode, front_face: FrontFace) -> &mut Self {
        self.cull_mode = cull_mode;
        self.front_face = front_face;
        self
    }

    pub fn disable_blending(&mut self) -> &mut Self {
        self.blend = BlendMode::Disabled;
        self
    }

    pub fn enable_blending_additive(&mut self) -> &mut Self {
        self.blend = BlendMode::Additive;
        self
    }

    pub fn enable_blending_alphablend(&mut self) -> &mut Self {
        self.blend = BlendMode::AlphaBlend;
        self
    }

    pub fn set_color_attachment_format(&mut self, format: Format) -> &mut Self {
        self.color_format = format;
        self
    }

    pub fn set_depth_format(&mut self, format: Format) -> &mut Self {
        self.depth_format = Some(format);
        self
    }

    pub fn disable_depthtest(&mut self) -> &mut Self {
        self.depth = DepthState::DISABLED;
        self
    }

    /// Depth test always on; `write_enable` controls depth writes
    pub fn enable_depthtest(&mut self, write_enable: bool, compare_op: CompareOp) -> &mut Self {
        self.depth = DepthState { test_enable: true, write_enable, compare_op };
        self
    }

    /// Snapshot of the current state
    pub fn desc(&self) -> Result<GraphicsPipelineDesc> {
        if self.layout.is_null() {
            engine_bail!("forge3d::PipelineBuilder", "Pipeline layout not set");
        }
        if self.vertex_shader.is_null() || self.fragment_shader.is_null() {
            engine_bail!("forge3d::PipelineBuilder", "Vertex and fragment shaders must both be set");
        }
        Ok(GraphicsPipelineDesc {
            layout: self.layout,
            vertex_shader: self.vertex_shader,
            fragment_shader: self.fragment_shader,
            topology: self.topology,
            polygon_mode: self.polygon_mode,
            cull_mode: self.cull_mode,
            front_face: self.front_face,
            blend: self.blend,
            depth: self.depth,
            color_format: self.color_format,
            depth_format: self.depth_format,
        })
    }

    pub fn build(&self, device: &dyn GraphicsDevice) -> Result<Pipeline> {
        device.create_graphics_pipeline(&self.desc()?)
    }
}

#[cfg(test)]
#[path = "pipeline_builder_tests.rs"]
mod tests;
