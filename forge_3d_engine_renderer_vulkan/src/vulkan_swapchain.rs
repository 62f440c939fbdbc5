/// Swapchain support for VulkanDevice
///
/// Creation, image acquisition and presentation on the device's surface.
/// Out-of-date and suboptimal results are reported as outcomes, never as
/// errors, so the engine can rebuild the swapchain on its own schedule.

use ash::vk;
use ash::vk::Handle;
use forge_3d_engine::forge3d::device::{
    AcquireOutcome, Extent2D, Image, ImageView, PresentOutcome, Semaphore, Swapchain,
    SwapchainDesc, SwapchainInfo,
};
use forge_3d_engine::forge3d::{Error, Result};
use forge_3d_engine::{engine_debug, engine_error, engine_warn};

use crate::vulkan_conversions::{format_from_vk, format_to_vk};
use crate::vulkan_device::{lock, vk_error, VulkanDevice, SOURCE};

/// Per-swapchain state owned by the device
pub(crate) struct SwapchainEntry {
    pub(crate) views: Vec<vk::ImageView>,
}

/// Extent of a new swapchain: the surface's fixed extent, or the requested
/// size clamped to what the surface supports
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
        height: height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
    }
}

/// One image more than the minimum, bounded by the maximum (0 means unbounded)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

/// Requested format if the surface offers it, otherwise the first one it reports
pub(crate) fn choose_surface_format(
    available: &[vk::SurfaceFormatKHR],
    requested: vk::Format,
) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|f| f.format == requested && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| available.first())
        .copied()
}

impl VulkanDevice {
    pub(crate) fn create_swapchain_khr(&self, desc: &SwapchainDesc) -> Result<SwapchainInfo> {
        unsafe {
            let capabilities = self
                .surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| vk_error("Failed to get surface capabilities", e))?;

            let surface_formats = self
                .surface_loader
                .get_physical_device_surface_formats(self.physical_device, self.surface)
                .map_err(|e| vk_error("Failed to query surface formats", e))?;

            let surface_format = choose_surface_format(&surface_formats, format_to_vk(desc.format))
                .ok_or_else(|| Error::InitializationFailed("surface reports no formats".to_string()))?;
            let format = format_from_vk(surface_format.format).ok_or_else(|| {
                engine_error!(SOURCE, "Unsupported surface format {:?}", surface_format.format);
                Error::InitializationFailed(format!("unsupported surface format {:?}", surface_format.format))
            })?;

            let extent = choose_extent(&capabilities, desc.width, desc.height);
            if extent.width == 0 || extent.height == 0 {
                return Err(Error::InvalidResource("swapchain extent is empty".to_string()));
            }

            let old_swapchain = desc
                .old_swapchain
                .map(|sc| vk::SwapchainKHR::from_raw(sc.raw()))
                .unwrap_or_else(vk::SwapchainKHR::null);

            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(choose_image_count(&capabilities))
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(vk::PresentModeKHR::FIFO)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let swapchain = self
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| vk_error("Failed to create swapchain", e))?;

            let images = match self.swapchain_loader.get_swapchain_images(swapchain) {
                Ok(images) => images,
                Err(e) => {
                    self.swapchain_loader.destroy_swapchain(swapchain, None);
                    return Err(vk_error("Failed to get swapchain images", e));
                }
            };

            let mut views = Vec::with_capacity(images.len());
            for &image in &images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                match self.device.create_image_view(&view_info, None) {
                    Ok(view) => views.push(view),
                    Err(e) => {
                        for view in views {
                            self.device.destroy_image_view(view, None);
                        }
                        self.swapchain_loader.destroy_swapchain(swapchain, None);
                        return Err(vk_error("Failed to create swapchain image views", e));
                    }
                }
            }

            engine_debug!(
                SOURCE,
                "Swapchain created: {}x{} {:?}, {} images",
                extent.width, extent.height, format, images.len()
            );

            let info = SwapchainInfo {
                handle: Swapchain(swapchain.as_raw()),
                format,
                extent: Extent2D::new(extent.width, extent.height),
                images: images.iter().map(|image| Image(image.as_raw())).collect(),
                views: views.iter().map(|view| ImageView(view.as_raw())).collect(),
            };
            lock(&self.swapchains).insert(swapchain.as_raw(), SwapchainEntry { views });
            Ok(info)
        }
    }

    pub(crate) fn destroy_swapchain_khr(&self, swapchain: Swapchain) {
        let entry = lock(&self.swapchains).remove(&swapchain.raw());
        unsafe {
            match entry {
                Some(entry) => {
                    for view in entry.views {
                        self.device.destroy_image_view(view, None);
                    }
                }
                None => engine_warn!(SOURCE, "destroy_swapchain: unknown swapchain {:#x}", swapchain.raw()),
            }
            self.swapchain_loader
                .destroy_swapchain(vk::SwapchainKHR::from_raw(swapchain.raw()), None);
        }
    }

    pub(crate) fn acquire_next_image_khr(
        &self,
        swapchain: Swapchain,
        signal: Semaphore,
        timeout_ns: u64,
    ) -> Result<AcquireOutcome> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                vk::SwapchainKHR::from_raw(swapchain.raw()),
                timeout_ns,
                vk::Semaphore::from_raw(signal.raw()),
                vk::Fence::null(),
            )
        };

        match result {
            Ok((index, suboptimal)) => Ok(AcquireOutcome::Acquired { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(vk::Result::TIMEOUT) | Err(vk::Result::NOT_READY) => {
                engine_error!(SOURCE, "No swapchain image available within {} ns", timeout_ns);
                Err(Error::Timeout(format!("swapchain image acquire after {} ns", timeout_ns)))
            }
            Err(e) => Err(vk_error("Failed to acquire next swapchain image", e)),
        }
    }

    pub(crate) fn present_khr(&self, swapchain: Swapchain, image_index: u32, wait: Semaphore) -> Result<PresentOutcome> {
        let swapchains = [vk::SwapchainKHR::from_raw(swapchain.raw())];
        let image_indices = [image_index];
        let wait_semaphores = [vk::Semaphore::from_raw(wait.raw())];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let _queue = lock(&self.queue_lock);
        match unsafe { self.swapchain_loader.queue_present(self.present_queue, &present_info) } {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(vk_error("Failed to present swapchain image", e)),
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
