/// Compute background effects
///
/// Each effect is a compute pipeline writing the draw image (bound as a
/// storage image at set 0) with its own push-constant parameters. All effects
/// share one pipeline layout.

use glam::Vec4;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::graphics_device::{
    CommandBuffer, DescriptorSet, DescriptorSetLayout, Extent2D, GraphicsDevice, Pipeline,
    PipelineBindPoint, PipelineLayout, PipelineLayoutDesc, PushConstantRange, ShaderStages,
};
use crate::renderer::ComputePushConstants;
use crate::resource::load_shader_module;
use crate::engine_info;

pub const GRADIENT_SHADER: &str = "gradient_color.comp.spv";
pub const SKY_SHADER: &str = "sky.comp.spv";

/// Compute workgroup edge in pixels
const WORKGROUP_SIZE: u32 = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct ComputeEffect {
    pub name: String,
    pub pipeline: Pipeline,
    pub layout: PipelineLayout,
    pub data: ComputePushConstants,
}

#[derive(Debug, Clone)]
pub struct BackgroundEffects {
    layout: PipelineLayout,
    effects: Vec<ComputeEffect>,
    current: usize,
}

impl BackgroundEffects {
    /// Build the gradient and sky effects against the draw-image layout
    pub fn new(
        device: &dyn GraphicsDevice,
        config: &EngineConfig,
        draw_image_layout: DescriptorSetLayout,
    ) -> Result<Self> {
        let layout = device.create_pipeline_layout(&PipelineLayoutDesc {
            set_layouts: vec![draw_image_layout],
            push_constants: vec![PushConstantRange {
                stages: ShaderStages::COMPUTE,
                offset: 0,
                size: std::mem::size_of::<ComputePushConstants>() as u32,
            }],
        })?;

        let mut background = Self { layout, effects: Vec::new(), current: 0 };
        let specs = [
            (
                "gradient",
                GRADIENT_SHADER,
                ComputePushConstants {
                    data1: Vec4::new(1.0, 0.0, 0.0, 1.0),
                    data2: Vec4::new(0.0, 0.0, 1.0, 1.0),
                    ..Default::default()
                },
            ),
            (
                "sky",
                SKY_SHADER,
                ComputePushConstants {
                    data1: Vec4::new(0.1, 0.2, 0.4, 0.97),
                    ..Default::default()
                },
            ),
        ];
        for (name, file, data) in specs {
            if let Err(e) = background.add_effect(device, config, name, file, data) {
                background.destroy(device);
                return Err(e);
            }
        }

        engine_info!("forge3d::BackgroundEffects", "{} background effects ready", background.effects.len());
        Ok(background)
    }

    fn add_effect(
        &mut self,
        device: &dyn GraphicsDevice,
        config: &EngineConfig,
        name: &str,
        file: &str,
        data: ComputePushConstants,
    ) -> Result<()> {
        let shader = load_shader_module(device, &config.shader_path(file))?;
        let pipeline = device.create_compute_pipeline(self.layout, shader);
        device.destroy_shader_module(shader);
        self.effects.push(ComputeEffect {
            name: name.to_string(),
            pipeline: pipeline?,
            layout: self.layout,
            data,
        });
        Ok(())
    }

    pub fn effects(&self) -> &[ComputeEffect] {
        &self.effects
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Select the effect drawn from now on; out-of-range indices are ignored
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.effects.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    pub fn current_mut(&mut self) -> Option<&mut ComputeEffect> {
        self.effects.get_mut(self.current)
    }

    /// Feed the window size and render scale to the first effect (data3.xyz)
    pub fn update_window_params(&mut self, width: u32, height: u32, render_scale: f32) {
        if let Some(effect) = self.effects.first_mut() {
            effect.data.data3.x = width as f32;
            effect.data.data3.y = height as f32;
            effect.data.data3.z = render_scale;
        }
    }

    /// Record the selected effect over `draw_extent` (draw image in General layout)
    pub fn record(
        &self,
        device: &dyn GraphicsDevice,
        cmd: CommandBuffer,
        draw_image_set: DescriptorSet,
        draw_extent: Extent2D,
    ) {
        let Some(effect) = self.effects.get(self.current) else {
            return;
        };
        device.cmd_bind_pipeline(cmd, PipelineBindPoint::Compute, effect.pipeline);
        device.cmd_bind_descriptor_sets(cmd, PipelineBindPoint::Compute, self.layout, 0, &[draw_image_set]);
        device.cmd_push_constants(cmd, self.layout, ShaderStages::COMPUTE, 0, bytemuck::bytes_of(&effect.data));
        device.cmd_dispatch(
            cmd,
            draw_extent.width.div_ceil(WORKGROUP_SIZE),
            draw_extent.height.div_ceil(WORKGROUP_SIZE),
            1,
        );
    }

    pub fn destroy(&self, device: &dyn GraphicsDevice) {
        device.destroy_pipeline_layout(self.layout);
        for effect in &self.effects {
            device.destroy_pipeline(effect.pipeline);
        }
    }
}

#[cfg(test)]
#[path = "background_tests.rs"]
mod tests;
