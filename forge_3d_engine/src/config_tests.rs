//! Unit tests for config.rs

use crate::config::{EngineConfig, FRAME_OVERLAP, MAX_SETS_PER_POOL};
use std::path::PathBuf;

#[test]
fn test_default_timeouts() {
    let config = EngineConfig::default();
    assert_eq!(config.fence_timeout_ns, 1_000_000_000);
    assert_eq!(config.acquire_timeout_ns, 1_000_000_000);
    assert_eq!(config.immediate_timeout_ns, 9_999_999_999);
}

#[test]
fn test_default_descriptor_capacities() {
    let config = EngineConfig::default();
    assert_eq!(config.global_descriptor_sets, 10);
    assert_eq!(config.frame_descriptor_sets, 1000);
    assert!(!config.sort_opaque_draws);
}

#[test]
fn test_constants() {
    assert_eq!(FRAME_OVERLAP, 2);
    assert_eq!(MAX_SETS_PER_POOL, 4092);
}

#[test]
fn test_shader_path() {
    let config = EngineConfig {
        shader_dir: PathBuf::from("assets/spv"),
        ..Default::default()
    };
    assert_eq!(config.shader_path("sky.comp.spv"), PathBuf::from("assets/spv/sky.comp.spv"));
}

#[test]
fn test_render_scale_clamp() {
    let mut config = EngineConfig::default();
    config.render_scale = 0.1;
    assert_eq!(config.clamped_render_scale(), 0.3);
    config.render_scale = 2.0;
    assert_eq!(config.clamped_render_scale(), 1.0);
    config.render_scale = 0.75;
    assert_eq!(config.clamped_render_scale(), 0.75);
}
