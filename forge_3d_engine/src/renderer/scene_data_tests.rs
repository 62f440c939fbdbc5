use glam::{Mat4, Vec4};
use super::*;

#[test]
fn test_gpu_block_sizes() {
    assert_eq!(std::mem::size_of::<GpuSceneData>(), 3 * 64 + 3 * 16);
    assert_eq!(std::mem::size_of::<GpuDrawPushConstants>(), 80);
    assert_eq!(std::mem::size_of::<ComputePushConstants>(), 64);
}

#[test]
fn test_scene_data_default_lighting() {
    let data = GpuSceneData::default();
    assert_eq!(data.ambient_color, Vec4::splat(0.1));
    assert_eq!(data.sunlight_direction, Vec4::new(0.0, 1.0, 0.5, 1.0));
    assert_eq!(data.sunlight_color, Vec4::new(0.5, 0.5, 0.5, 1.0));
    assert_eq!(data.viewproj, Mat4::IDENTITY);
}

#[test]
fn test_push_constants_bytes_start_with_matrix() {
    let push = GpuDrawPushConstants::new(Mat4::from_scale(glam::Vec3::splat(2.0)), 0xABCD);
    let bytes = bytemuck::bytes_of(&push);
    assert_eq!(&bytes[0..4], &2.0f32.to_ne_bytes());
    assert_eq!(&bytes[64..72], &0xABCDu64.to_ne_bytes());
}

#[test]
fn test_scene_projection_flips_y() {
    let proj = scene_projection(16.0 / 9.0);
    let reference = Mat4::perspective_rh(70f32.to_radians(), 16.0 / 9.0, 0.1, 10000.0);
    assert_eq!(proj.y_axis.y, -reference.y_axis.y);
    assert_eq!(proj.x_axis, reference.x_axis);

    // A point above the view axis lands at negative clip-space y
    let clip = proj * Vec4::new(0.0, 1.0, -5.0, 1.0);
    assert!(clip.y / clip.w < 0.0);
}
