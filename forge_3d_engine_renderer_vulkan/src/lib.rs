/*!
# Forge 3D Engine - Vulkan Backend

Vulkan implementation of the `GraphicsDevice` and `CommandRecorder` traits
of `forge_3d_engine`, built on Ash for the API bindings and gpu-allocator for
memory management.

Requires Vulkan 1.3 (dynamic rendering, synchronization2, buffer device
address, descriptor indexing).

# Example

```no_run
use std::sync::Arc;
use forge_3d_engine::forge3d::{Engine, EngineConfig};
use forge_3d_engine_renderer_vulkan::VulkanDevice;
# fn run(window: &winit::window::Window) -> forge_3d_engine::forge3d::Result<()> {
let config = EngineConfig::default();
let device = VulkanDevice::new(window, &config)?;
let mut engine = Engine::init(Arc::new(device), config)?;
engine.draw()?;
# Ok(())
# }
```
*/

mod debug;
mod vulkan_commands;
mod vulkan_conversions;
mod vulkan_device;
mod vulkan_swapchain;

pub use vulkan_device::VulkanDevice;

// Validation layer reporting
pub use debug::{get_validation_stats, print_validation_stats_report, ValidationConfig, ValidationStats};
