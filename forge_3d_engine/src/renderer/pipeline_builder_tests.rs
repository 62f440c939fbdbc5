use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::*;
use super::*;

#[test]
fn test_desc_requires_layout_and_shaders() {
    let builder = PipelineBuilder::default();
    assert!(builder.desc().is_err());

    let mut builder = PipelineBuilder::new(PipelineLayout(1));
    assert!(builder.desc().is_err());

    builder.set_shaders(ShaderModule(2), ShaderModule(3));
    assert!(builder.desc().is_ok());
}

#[test]
fn test_variant_keeps_shared_state() {
    let mut builder = PipelineBuilder::new(PipelineLayout(1));
    builder
        .set_shaders(ShaderModule(2), ShaderModule(3))
        .set_cull_mode(CullMode::None, FrontFace::Clockwise)
        .disable_blending()
        .enable_depthtest(true, CompareOp::Less)
        .set_color_attachment_format(Format::R16G16B16A16_SFLOAT)
        .set_depth_format(Format::D32_SFLOAT);
    let opaque = builder.desc().unwrap();

    builder.enable_blending_additive().enable_depthtest(false, CompareOp::Less);
    let transparent = builder.desc().unwrap();

    assert_eq!(opaque.blend, BlendMode::Disabled);
    assert!(opaque.depth.write_enable);
    assert_eq!(transparent.blend, BlendMode::Additive);
    assert!(transparent.depth.test_enable);
    assert!(!transparent.depth.write_enable);
    assert_eq!(transparent.layout, opaque.layout);
    assert_eq!(transparent.depth_format, Some(Format::D32_SFLOAT));
}

#[test]
fn test_build_creates_pipeline_on_device() {
    let device = MockGraphicsDevice::new();
    let mut builder = PipelineBuilder::new(PipelineLayout(7));
    builder.set_shaders(ShaderModule(8), ShaderModule(9));

    let pipeline = builder.build(&device).unwrap();
    assert!(!pipeline.is_null());
    assert_eq!(device.live_count("pipeline"), 1);
}
