/// Graphics device module - GPU abstraction used by every engine subsystem

pub mod handles;
pub mod types;
pub mod graphics_device;

pub use handles::*;
pub use types::*;
pub use graphics_device::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
