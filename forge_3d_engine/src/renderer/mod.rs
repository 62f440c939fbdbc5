/// Renderer module - GPU data blocks, pipeline building and the frame's passes

pub mod scene_data;
pub mod pipeline_builder;
pub mod background;
pub mod geometry;

pub use scene_data::*;
pub use pipeline_builder::PipelineBuilder;
pub use background::{BackgroundEffects, ComputeEffect, GRADIENT_SHADER, SKY_SHADER};
pub use geometry::{visible_opaque_order, EngineStats, GeometryPass, GeometryTargets};
