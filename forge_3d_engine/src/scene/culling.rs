/// Clip-space bounding box visibility test

use glam::{Mat4, Vec3};
use crate::scene::RenderObject;

/// Whether the object's bounding box overlaps the view volume
///
/// Projects the 8 box corners through `viewproj * transform`, takes the
/// clip-space extent after the perspective divide and rejects boxes entirely
/// outside x/y in [-1, 1] or z in [0, 1]. Corners behind the eye (w <= 0) do
/// not project meaningfully: a box with every corner behind is culled, a box
/// straddling the eye plane is kept.
pub fn is_visible(object: &RenderObject, viewproj: &Mat4) -> bool {
    let matrix = *viewproj * object.transform;

    let mut min = Vec3::splat(1.5);
    let mut max = Vec3::splat(-1.5);
    let mut behind = 0;

    for corner in object.bounds.corners() {
        let clip = matrix * corner.extend(1.0);
        if clip.w <= 0.0 {
            behind += 1;
            continue;
        }
        let ndc = clip.truncate() / clip.w;
        min = min.min(ndc);
        max = max.max(ndc);
    }

    match behind {
        0 => {}
        8 => return false,
        _ => return true,
    }

    !(min.z > 1.0 || max.z < 0.0 || min.x > 1.0 || max.x < -1.0 || min.y > 1.0 || max.y < -1.0)
}

#[cfg(test)]
#[path = "culling_tests.rs"]
mod tests;
