/// Swapchain manager
///
/// Owns the presentation swapchain and the resize flag. Acquire and present
/// turn out-of-date / suboptimal results into a pending resize instead of an
/// error; the engine rebuilds the swapchain at the top of the next frame.

use crate::error::Result;
use crate::graphics_device::{
    AcquireOutcome, Extent2D, Format, GraphicsDevice, Image, ImageView, PresentOutcome, Semaphore,
    Swapchain, SwapchainDesc, SwapchainInfo,
};
use crate::{engine_debug, engine_info, engine_warn};

/// Surface format the engine presents with
pub const SWAPCHAIN_FORMAT: Format = Format::B8G8R8A8_UNORM;

pub struct SwapchainManager {
    info: SwapchainInfo,
    resize_requested: bool,
}

impl SwapchainManager {
    pub fn new(device: &dyn GraphicsDevice, width: u32, height: u32) -> Result<Self> {
        let info = device.create_swapchain(&SwapchainDesc {
            width,
            height,
            format: SWAPCHAIN_FORMAT,
            old_swapchain: None,
        })?;
        engine_info!(
            "forge3d::SwapchainManager",
            "Swapchain created: {}x{}, {} images",
            info.extent.width, info.extent.height, info.images.len()
        );
        Ok(Self { info, resize_requested: false })
    }

    pub fn handle(&self) -> Swapchain {
        self.info.handle
    }

    pub fn extent(&self) -> Extent2D {
        self.info.extent
    }

    pub fn format(&self) -> Format {
        self.info.format
    }

    pub fn image_count(&self) -> usize {
        self.info.images.len()
    }

    pub fn image(&self, index: u32) -> Option<Image> {
        self.info.images.get(index as usize).copied()
    }

    pub fn view(&self, index: u32) -> Option<ImageView> {
        self.info.views.get(index as usize).copied()
    }

    pub fn request_resize(&mut self) {
        self.resize_requested = true;
    }

    pub fn resize_requested(&self) -> bool {
        self.resize_requested
    }

    /// Acquire the next image, signaling `semaphore` when it is ready
    ///
    /// Returns `Ok(None)` and requests a resize when the swapchain is out of
    /// date. Suboptimal images are still used.
    pub fn acquire(&mut self, device: &dyn GraphicsDevice, semaphore: Semaphore, timeout_ns: u64) -> Result<Option<u32>> {
        match device.acquire_next_image(self.info.handle, semaphore, timeout_ns)? {
            AcquireOutcome::Acquired { index, suboptimal } => {
                if suboptimal {
                    engine_debug!("forge3d::SwapchainManager", "Acquired suboptimal image {}", index);
                }
                Ok(Some(index))
            }
            AcquireOutcome::OutOfDate => {
                engine_warn!("forge3d::SwapchainManager", "Swapchain out of date on acquire");
                self.resize_requested = true;
                Ok(None)
            }
        }
    }

    /// Present `image_index` once `wait` is signaled
    ///
    /// Returns `Ok(false)` and requests a resize when the swapchain no longer
    /// matches the surface.
    pub fn present(&mut self, device: &dyn GraphicsDevice, image_index: u32, wait: Semaphore) -> Result<bool> {
        match device.present(self.info.handle, image_index, wait)? {
            PresentOutcome::Presented => Ok(true),
            PresentOutcome::Suboptimal | PresentOutcome::OutOfDate => {
                engine_warn!("forge3d::SwapchainManager", "Swapchain out of date on present");
                self.resize_requested = true;
                Ok(false)
            }
        }
    }

    /// Rebuild the swapchain at a new size once the device is idle
    ///
    /// The old swapchain is retired into the new one and destroyed only after
    /// creation succeeded; on failure the manager keeps the old, still valid
    /// handle and the resize stays pending.
    pub fn resize(&mut self, device: &dyn GraphicsDevice, width: u32, height: u32) -> Result<()> {
        device.wait_idle()?;
        let old = self.info.handle;
        let info = device.create_swapchain(&SwapchainDesc {
            width,
            height,
            format: SWAPCHAIN_FORMAT,
            old_swapchain: Some(old),
        })?;
        device.destroy_swapchain(old);
        self.info = info;
        self.resize_requested = false;
        engine_info!("forge3d::SwapchainManager", "Swapchain resized to {}x{}", width, height);
        Ok(())
    }

    pub fn destroy(&self, device: &dyn GraphicsDevice) {
        device.destroy_swapchain(self.info.handle);
    }
}

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;
