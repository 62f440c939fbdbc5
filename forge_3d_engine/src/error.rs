//! Error types for the Forge3D engine
//!
//! This module defines the error types used throughout the engine,
//! including device bootstrap, frame submission, and resource management.

use std::fmt;

/// Result type for Forge3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Forge3D engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (Vulkan, mock device, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (image, buffer, shader, handle, etc.)
    InvalidResource(String),

    /// Initialization failed (engine, device, subsystems)
    InitializationFailed(String),

    /// A bounded wait (fence, image acquire) expired
    Timeout(String),

    /// A descriptor pool has no room left (out of pool memory or fragmented)
    PoolExhausted,

    /// A shader binary could not be read or was rejected
    ShaderLoadFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::PoolExhausted => write!(f, "Descriptor pool exhausted"),
            Error::ShaderLoadFailed(msg) => write!(f, "Shader load failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
