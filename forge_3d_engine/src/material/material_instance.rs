/// Material instance types shared by the loader and the geometry pass

use crate::graphics_device::{DescriptorSet, Pipeline, PipelineLayout};

/// Which list a material's surfaces are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaterialPass {
    #[default]
    MainColor,
    Transparent,
    Other,
}

impl MaterialPass {
    pub fn is_transparent(self) -> bool {
        self == MaterialPass::Transparent
    }
}

/// Pipeline and the layout its descriptor sets are bound through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MaterialPipeline {
    pub pipeline: Pipeline,
    pub layout: PipelineLayout,
}

/// What a render object needs to draw with a material
///
/// A plain value: copying it into every render object is cheaper than
/// sharing it, and equality drives redundant-bind filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MaterialInstance {
    pub pipeline: MaterialPipeline,
    /// Material set, bound at set 1
    pub material_set: DescriptorSet,
    pub pass: MaterialPass,
}
