use crate::config::EngineConfig;
use crate::graphics_device::mock_graphics_device::{shader_dir_with, MockGraphicsDevice};
use crate::graphics_device::*;
use super::*;

fn setup(tag: &str) -> (MockGraphicsDevice, BackgroundEffects) {
    let device = MockGraphicsDevice::new();
    let config = EngineConfig {
        shader_dir: shader_dir_with(tag, &[GRADIENT_SHADER, SKY_SHADER]),
        ..Default::default()
    };
    let layout = device
        .create_descriptor_set_layout(
            &[DescriptorBinding { binding: 0, ty: DescriptorType::StorageImage }],
            ShaderStages::COMPUTE,
        )
        .unwrap();
    let background = BackgroundEffects::new(&device, &config, layout).unwrap();
    (device, background)
}

#[test]
fn test_effects_share_layout_and_release_shaders() {
    let (device, background) = setup("background_build");
    let names: Vec<&str> = background.effects().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["gradient", "sky"]);
    assert_eq!(background.effects()[0].layout, background.effects()[1].layout);
    assert_eq!(device.live_count("shader_module"), 0);
    assert_eq!(device.live_count("pipeline"), 2);
}

#[test]
fn test_missing_shader_fails_without_leaks() {
    let device = MockGraphicsDevice::new();
    let config = EngineConfig {
        shader_dir: shader_dir_with("background_missing", &[GRADIENT_SHADER]),
        ..Default::default()
    };
    assert!(BackgroundEffects::new(&device, &config, DescriptorSetLayout(1)).is_err());
    assert_eq!(device.live_count("pipeline"), 0);
    assert_eq!(device.live_count("pipeline_layout"), 0);
}

#[test]
fn test_record_dispatches_over_draw_extent() {
    let (device, mut background) = setup("background_record");
    background.update_window_params(1700, 900, 0.5);
    assert_eq!(background.effects()[0].data.data3.z, 0.5);
    device.clear_calls();

    background.record(&device, CommandBuffer(5), DescriptorSet(6), Extent2D::new(1700, 900));

    let calls = device.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls[0].starts_with("bind_pipeline(5, Compute"));
    assert!(calls[1].contains("set 0, [6]"));
    assert_eq!(calls[3], "dispatch(5, 107, 57, 1)");
}

#[test]
fn test_select_ignores_out_of_range() {
    let (_device, mut background) = setup("background_select");
    assert!(background.select(1));
    assert_eq!(background.current_index(), 1);
    assert!(!background.select(2));
    assert_eq!(background.current_index(), 1);
    background.current_mut().unwrap().data.data4.w = 3.0;
    assert_eq!(background.effects()[1].data.data4.w, 3.0);
}
