/// Descriptor set layout builder

use crate::error::Result;
use crate::graphics_device::{
    DescriptorBinding, DescriptorSetLayout, DescriptorType, GraphicsDevice, ShaderStages,
};

/// Accumulates bindings, then creates one layout visible to the given stages
#[derive(Debug, Default, Clone)]
pub struct DescriptorLayoutBuilder {
    bindings: Vec<DescriptorBinding>,
}

impl DescriptorLayoutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_binding(&mut self, binding: u32, ty: DescriptorType) -> &mut Self {
        self.bindings.push(DescriptorBinding { binding, ty });
        self
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn bindings(&self) -> &[DescriptorBinding] {
        &self.bindings
    }

    pub fn build(&self, device: &dyn GraphicsDevice, stages: ShaderStages) -> Result<DescriptorSetLayout> {
        device.create_descriptor_set_layout(&self.bindings, stages)
    }
}
