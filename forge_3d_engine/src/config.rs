//! Engine configuration

use std::path::PathBuf;

/// Number of overlapped frame contexts in the frame ring
pub const FRAME_OVERLAP: usize = 2;

/// Upper bound for the per-pool set count of a growable descriptor allocator
pub const MAX_SETS_PER_POOL: u32 = 4092;

/// Engine configuration
///
/// Plain settings consumed once by `Engine::init`. Every field has a usable
/// default, so callers usually start from `EngineConfig::default()` and
/// override what they need.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Application name passed to the graphics API
    pub app_name: String,

    /// Initial window / swapchain width in pixels
    pub width: u32,

    /// Initial window / swapchain height in pixels
    pub height: u32,

    /// Extent of the offscreen draw and depth images (rendering happens here, then
    /// the result is blitted into the swapchain image)
    pub draw_image_width: u32,
    pub draw_image_height: u32,

    /// Scale applied to the draw extent (0.3..=1.0)
    pub render_scale: f32,

    /// Enable API validation layers (debug messenger)
    pub enable_validation: bool,

    /// Bounded wait on a frame's render fence, in nanoseconds
    pub fence_timeout_ns: u64,

    /// Bounded wait for swapchain image acquisition, in nanoseconds
    pub acquire_timeout_ns: u64,

    /// Wait on the immediate-submission fence, in nanoseconds
    pub immediate_timeout_ns: u64,

    /// Set capacity of the engine-global descriptor allocator
    pub global_descriptor_sets: u32,

    /// Initial set capacity of each frame's growable descriptor allocator
    pub frame_descriptor_sets: u32,

    /// Sort culled opaque draws by (material set, index buffer) before submission
    pub sort_opaque_draws: bool,

    /// Directory holding the prebuilt SPIR-V shader binaries
    pub shader_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_name: "Forge3D Application".to_string(),
            width: 1700,
            height: 900,
            draw_image_width: 2560,
            draw_image_height: 1440,
            render_scale: 1.0,
            enable_validation: cfg!(debug_assertions),
            fence_timeout_ns: 1_000_000_000,
            acquire_timeout_ns: 1_000_000_000,
            immediate_timeout_ns: 9_999_999_999,
            global_descriptor_sets: 10,
            frame_descriptor_sets: 1000,
            sort_opaque_draws: false,
            shader_dir: PathBuf::from("shaders"),
        }
    }
}

impl EngineConfig {
    /// Full path of a shader binary inside `shader_dir`
    pub fn shader_path(&self, file_name: &str) -> PathBuf {
        self.shader_dir.join(file_name)
    }

    /// Render scale clamped to the supported range
    pub fn clamped_render_scale(&self) -> f32 {
        self.render_scale.clamp(0.3, 1.0)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
