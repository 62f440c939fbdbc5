use glam::{Mat4, Vec3};
use crate::camera::Camera;
use crate::graphics_device::Buffer;
use crate::material::MaterialInstance;
use crate::renderer::scene_projection;
use crate::resource::Bounds;
use super::*;

fn unit_box_at(position: Vec3) -> RenderObject {
    RenderObject {
        index_count: 36,
        first_index: 0,
        index_buffer: Buffer(1),
        material: MaterialInstance::default(),
        bounds: Bounds { origin: Vec3::ZERO, extents: Vec3::splat(0.5), sphere_radius: 0.87 },
        transform: Mat4::from_translation(position),
        vertex_buffer_address: 0,
    }
}

/// Camera at (0, 0, 5) looking down -Z at the origin
fn viewproj() -> Mat4 {
    let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0));
    scene_projection(16.0 / 9.0) * camera.view_matrix()
}

#[test]
fn test_box_at_look_at_point_is_visible() {
    assert!(is_visible(&unit_box_at(Vec3::ZERO), &viewproj()));
}

#[test]
fn test_box_behind_camera_is_culled() {
    assert!(!is_visible(&unit_box_at(Vec3::new(0.0, 0.0, 10.0)), &viewproj()));
}

#[test]
fn test_box_far_to_the_side_is_culled() {
    assert!(!is_visible(&unit_box_at(Vec3::new(50.0, 0.0, 0.0)), &viewproj()));
    assert!(!is_visible(&unit_box_at(Vec3::new(0.0, -50.0, 0.0)), &viewproj()));
}

#[test]
fn test_box_beyond_far_plane_is_culled() {
    assert!(!is_visible(&unit_box_at(Vec3::new(0.0, 0.0, -20000.0)), &viewproj()));
}

#[test]
fn test_box_straddling_eye_is_kept() {
    // Corners on both sides of the camera plane
    assert!(is_visible(&unit_box_at(Vec3::new(0.0, 0.0, 5.0)), &viewproj()));
}

#[test]
fn test_partially_visible_box_is_kept() {
    // Centre just outside the right edge, extents reaching inside
    let mut object = unit_box_at(Vec3::new(7.0, 0.0, 0.0));
    object.bounds.extents = Vec3::splat(1.5);
    assert!(is_visible(&object, &viewproj()));
}
