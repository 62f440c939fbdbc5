/*!
# Forge 3D Engine

Core of the Forge3D real-time renderer.

This crate is GPU-API agnostic: every subsystem talks to the GPU through the
`GraphicsDevice` trait (object creation, synchronization, presentation) and
its `CommandRecorder` supertrait (command recording). Backends such as
`forge_3d_engine_renderer_vulkan` implement both traits.

## Architecture

- **Engine**: owns the device and every subsystem, runs the frame loop
- **FrameRing**: double-buffered frame contexts (command buffer, fence,
  semaphores, deletion queue, transient descriptor allocator)
- **DeletionQueue**: deferred, LIFO release of GPU objects
- **Descriptor allocators**: fixed and growable pool sets, set writer
- **ResourceManager**: buffers, images, mesh uploads, immediate submission
- **SwapchainManager**: acquire / present with resize-on-out-of-date
- **Scene**: node arena, draw context, frustum culling, loaded scenes
- **Renderer**: compute background effects and the forward geometry pass
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod graphics_device;
pub mod deletion_queue;
pub mod descriptor;
pub mod frame;
pub mod swapchain;
pub mod resource;
pub mod material;
pub mod scene;
pub mod renderer;
pub mod camera;
pub mod window;

// Main forge3d namespace module
pub mod forge3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine and its frame loop types
    pub use crate::engine::{
        DefaultResources, Engine, FrameOutcome, OverlayHook, UpdateHook, DEPTH_IMAGE_FORMAT,
        DRAW_IMAGE_FORMAT, GLOBAL_POOL_RATIOS,
    };
    pub use crate::config::{EngineConfig, FRAME_OVERLAP, MAX_SETS_PER_POOL};
    pub use crate::window::{InputState, WindowSource};
    pub use crate::camera::Camera;

    // Logging sub-module (types and logger slot, NOT macros)
    pub mod log {
        pub use crate::log::{reset_logger, set_logger, DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // GPU abstraction: traits, handles, descriptors
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Frame synchronization and deferred release
    pub mod frame {
        pub use crate::deletion_queue::DeletionQueue;
        pub use crate::frame::*;
        pub use crate::swapchain::*;
    }

    // Descriptor sub-module
    pub mod descriptor {
        pub use crate::descriptor::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Material sub-module
    pub mod material {
        pub use crate::material::*;
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::renderer::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;
