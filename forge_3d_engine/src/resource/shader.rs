/// SPIR-V shader binary loading

use std::path::Path;
use crate::error::{Error, Result};
use crate::graphics_device::{GraphicsDevice, ShaderModule};
use crate::engine_error;

/// First word of every SPIR-V module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Decode a SPIR-V binary into words
///
/// # Errors
///
/// `Error::ShaderLoadFailed` when the length is not a multiple of 4 or the
/// magic number is missing (in either byte order).
pub fn parse_spirv(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() < 4 || bytes.len() % 4 != 0 {
        return Err(Error::ShaderLoadFailed(format!(
            "SPIR-V size {} is not a non-zero multiple of 4", bytes.len()
        )));
    }
    let mut words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    if words[0] == SPIRV_MAGIC.swap_bytes() {
        for word in &mut words {
            *word = word.swap_bytes();
        }
    }
    if words[0] != SPIRV_MAGIC {
        return Err(Error::ShaderLoadFailed(format!("bad SPIR-V magic {:#010x}", words[0])));
    }
    Ok(words)
}

/// Read a prebuilt shader binary from disk and create a module from it
///
/// # Errors
///
/// Fails if the file cannot be read, is not SPIR-V, or the device rejects it.
pub fn load_shader_module(device: &dyn GraphicsDevice, path: &Path) -> Result<ShaderModule> {
    let bytes = std::fs::read(path).map_err(|e| {
        engine_error!("forge3d::Shader", "Failed to read shader '{}': {}", path.display(), e);
        Error::ShaderLoadFailed(format!("{}: {}", path.display(), e))
    })?;
    let words = parse_spirv(&bytes).map_err(|e| {
        engine_error!("forge3d::Shader", "Rejected shader '{}': {}", path.display(), e);
        e
    })?;
    device.create_shader_module(&words)
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
