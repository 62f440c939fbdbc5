//! Unit tests for shader.rs

use crate::error::Error;
use crate::graphics_device::mock_graphics_device::{LogCapture, MockGraphicsDevice};
use serial_test::serial;
use crate::resource::shader::{load_shader_module, parse_spirv, SPIRV_MAGIC};
use std::path::Path;

fn spirv_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[test]
fn test_parse_valid_module() {
    let words = parse_spirv(&spirv_bytes(&[SPIRV_MAGIC, 0x0001_0500, 0, 12, 0])).unwrap();
    assert_eq!(words.len(), 5);
    assert_eq!(words[0], SPIRV_MAGIC);
}

#[test]
fn test_parse_big_endian_module() {
    let bytes: Vec<u8> = [SPIRV_MAGIC, 7].iter().flat_map(|w| w.to_be_bytes()).collect();
    let words = parse_spirv(&bytes).unwrap();
    assert_eq!(words, vec![SPIRV_MAGIC, 7]);
}

#[test]
fn test_parse_rejects_truncated_binary() {
    let mut bytes = spirv_bytes(&[SPIRV_MAGIC, 1]);
    bytes.pop();
    assert!(matches!(parse_spirv(&bytes), Err(Error::ShaderLoadFailed(_))));
    assert!(parse_spirv(&[]).is_err());
}

#[test]
fn test_parse_rejects_bad_magic() {
    assert!(matches!(parse_spirv(&spirv_bytes(&[0xDEAD_BEEF, 1])), Err(Error::ShaderLoadFailed(_))));
}

#[test]
fn test_load_missing_file_fails() {
    let device = MockGraphicsDevice::new();
    let result = load_shader_module(&device, Path::new("does/not/exist.spv"));
    assert!(matches!(result, Err(Error::ShaderLoadFailed(_))));
    assert_eq!(device.count_calls("create_shader_module"), 0);
}

#[test]
fn test_load_from_disk_creates_module() {
    let device = MockGraphicsDevice::new();
    let path = std::env::temp_dir().join(format!("forge3d_shader_test_{}.spv", std::process::id()));
    std::fs::write(&path, spirv_bytes(&[SPIRV_MAGIC, 0x0001_0000, 0, 1, 0])).unwrap();

    let result = load_shader_module(&device, &path);
    std::fs::remove_file(&path).ok();

    assert!(result.is_ok());
    assert_eq!(device.count_calls("create_shader_module"), 1);
}

#[test]
#[serial]
fn test_load_failures_are_logged_as_shader_errors() {
    let missing = std::env::temp_dir().join(format!("forge3d_missing_{}.spv", std::process::id()));
    let garbage = std::env::temp_dir().join(format!("forge3d_garbage_{}.spv", std::process::id()));
    std::fs::write(&garbage, [1u8, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    let device = MockGraphicsDevice::new();
    let capture = LogCapture::install();

    let read_failure = load_shader_module(&device, &missing);
    let magic_failure = load_shader_module(&device, &garbage);
    crate::log::reset_logger();
    std::fs::remove_file(&garbage).ok();

    assert!(matches!(read_failure, Err(Error::ShaderLoadFailed(_))));
    assert!(matches!(magic_failure, Err(Error::ShaderLoadFailed(_))));
    let errors = capture.errors_from("forge3d::Shader");
    let mentions = |path: &Path, prefix: &str| {
        errors.iter().any(|e| e.message.starts_with(prefix) && e.message.contains(&*path.to_string_lossy()))
    };
    assert!(mentions(&missing, "Failed to read shader"));
    assert!(mentions(&garbage, "Rejected shader"));
}
