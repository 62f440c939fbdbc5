//! Material module
//!
//! Material pipelines (one pipeline + layout per pass) and the small material
//! instances render objects carry around. The glTF metallic-roughness model is
//! the only material family the engine ships.

mod material_instance;
mod metallic_roughness;

pub use material_instance::{MaterialInstance, MaterialPass, MaterialPipeline};
pub use metallic_roughness::{
    GltfMetallicRoughness, MaterialConstants, MaterialPipelineDesc, MaterialResources,
    MATERIAL_FRAGMENT_SHADER, MATERIAL_VERTEX_SHADER,
};
