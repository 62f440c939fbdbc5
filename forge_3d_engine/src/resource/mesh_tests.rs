//! Unit tests for mesh.rs

use crate::resource::mesh::{Bounds, Vertex};
use glam::Vec3;

#[test]
fn test_vertex_layout_is_std430_friendly() {
    assert_eq!(std::mem::size_of::<Vertex>(), 48);
    let v = Vertex::default();
    let bytes: &[u8] = bytemuck::bytes_of(&v);
    assert_eq!(bytes.len(), 48);
}

#[test]
fn test_bounds_from_positions() {
    let bounds = Bounds::from_positions([
        Vec3::new(-1.0, 0.0, 2.0),
        Vec3::new(3.0, 4.0, 2.0),
        Vec3::new(1.0, 2.0, 6.0),
    ]);
    assert_eq!(bounds.origin, Vec3::new(1.0, 2.0, 4.0));
    assert_eq!(bounds.extents, Vec3::new(2.0, 2.0, 2.0));
    assert!((bounds.sphere_radius - 12.0f32.sqrt()).abs() < 1e-6);
}

#[test]
fn test_bounds_from_nothing() {
    let bounds = Bounds::from_positions(std::iter::empty());
    assert_eq!(bounds, Bounds::default());
}

#[test]
fn test_corners_span_the_box() {
    let bounds = Bounds { origin: Vec3::ONE, extents: Vec3::new(1.0, 2.0, 3.0), sphere_radius: 0.0 };
    let corners = bounds.corners();
    let min = corners.iter().fold(Vec3::splat(f32::MAX), |a, c| a.min(*c));
    let max = corners.iter().fold(Vec3::splat(f32::MIN), |a, c| a.max(*c));
    assert_eq!(min, Vec3::new(0.0, -1.0, -2.0));
    assert_eq!(max, Vec3::new(2.0, 3.0, 4.0));
}
