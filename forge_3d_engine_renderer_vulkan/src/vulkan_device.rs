/// VulkanDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Owns the instance, the window surface, the logical device with its
/// graphics queue and the gpu-allocator instance. Engine handles are the raw
/// `vk::Handle` values of the native objects; buffers and images also keep
/// their allocation in a table so they can be freed on destroy.

use ash::vk;
use ash::vk::Handle;
use forge_3d_engine::forge3d::device::*;
use forge_3d_engine::forge3d::{EngineConfig, Error, Result};
use forge_3d_engine::{engine_debug, engine_err, engine_error, engine_info, engine_warn};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashMap;
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};

use crate::vulkan_conversions::*;
use crate::vulkan_swapchain::SwapchainEntry;

pub(crate) const SOURCE: &str = "forge3d::vulkan";

/// Buffer allocation kept alive until `destroy_buffer`
pub(crate) struct BufferEntry {
    pub(crate) allocation: Allocation,
    pub(crate) size: u64,
}

/// Image allocation and the view created with it
pub(crate) struct ImageEntry {
    pub(crate) allocation: Allocation,
    pub(crate) view: vk::ImageView,
    pub(crate) format: Format,
}

/// Vulkan device implementation
pub struct VulkanDevice {
    /// Vulkan entry (keeps the loader alive)
    _entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,

    pub(crate) graphics_queue: vk::Queue,
    pub(crate) graphics_queue_family: u32,
    /// Present queue (may be the graphics queue)
    pub(crate) present_queue: vk::Queue,
    /// Serializes queue submission and presentation
    pub(crate) queue_lock: Mutex<()>,

    /// Window surface every swapchain is created on
    pub(crate) surface: vk::SurfaceKHR,
    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so its memory blocks are freed BEFORE the device is destroyed
    allocator: ManuallyDrop<Mutex<Allocator>>,

    pub(crate) buffers: Mutex<FxHashMap<u64, BufferEntry>>,
    pub(crate) images: Mutex<FxHashMap<u64, ImageEntry>>,
    pub(crate) swapchains: Mutex<FxHashMap<u64, SwapchainEntry>>,

    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

/// Lock a mutex, recovering the data of a poisoned lock
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Map a failed Vulkan call onto an engine error (logged)
pub(crate) fn vk_error(what: &str, result: vk::Result) -> Error {
    match result {
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
            engine_error!(SOURCE, "{}: {:?}", what, result);
            Error::OutOfMemory
        }
        _ => engine_err!(SOURCE, "{}: {:?}", what, result),
    }
}

fn init_error(what: &str, detail: impl std::fmt::Debug) -> Error {
    engine_error!(SOURCE, "{}: {:?}", what, detail);
    Error::InitializationFailed(format!("{}: {:?}", what, detail))
}

impl VulkanDevice {
    /// Create the device for `window`
    ///
    /// Requires Vulkan 1.3 with dynamic rendering, synchronization2, buffer
    /// device address and descriptor indexing. Validation layers are enabled
    /// when the `vulkan-validation` feature is on and `config.enable_validation`
    /// is set.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: &EngineConfig) -> Result<Self> {
        Self::with_validation_config(window, config, crate::debug::ValidationConfig::default())
    }

    /// Same as `new`, with explicit validation callback behaviour
    pub fn with_validation_config<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: &EngineConfig,
        validation: crate::debug::ValidationConfig,
    ) -> Result<Self> {
        let enable_validation = cfg!(feature = "vulkan-validation") && config.enable_validation;

        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_error("Failed to load Vulkan library", e))?;

            let app_name = CString::new(config.app_name.as_str())
                .unwrap_or_else(|_| CString::from(c"Forge3D Application"));
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Forge3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window
                .display_handle()
                .map_err(|e| init_error("Failed to get display handle", e))?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| init_error("Failed to get required extensions", e))?
                .to_vec();

            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_error("Failed to create Vulkan instance", e))?;

            let (debug_utils_loader, debug_messenger) = if enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                crate::debug::init_debug_config(validation);

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(crate::debug::messenger_severity_flags())
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

                let messenger = debug_utils
                    .create_debug_utils_messenger(&debug_info, None)
                    .map_err(|e| init_error("Failed to create debug messenger", e))?;

                (Some(debug_utils), Some(messenger))
            } else {
                (None, None)
            };

            let window_handle = window
                .window_handle()
                .map_err(|e| init_error("Failed to get window handle", e))?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| init_error("Failed to create surface", e))?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let (physical_device, graphics_family_index, present_family_index) =
                Self::pick_physical_device(&instance, &surface_loader, surface)?;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "<unknown>".to_string());
            engine_info!(SOURCE, "Using GPU '{}' ({:?})", device_name, properties.device_type);

            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .queue_priorities(&queue_priorities)];
            if present_family_index != graphics_family_index {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(present_family_index)
                        .queue_priorities(&queue_priorities),
                );
            }

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

            let supported = instance.get_physical_device_features(physical_device);
            let device_features = vk::PhysicalDeviceFeatures::default()
                .fill_mode_non_solid(supported.fill_mode_non_solid == vk::TRUE)
                .sampler_anisotropy(supported.sampler_anisotropy == vk::TRUE);
            let mut features13 = vk::PhysicalDeviceVulkan13Features::default()
                .dynamic_rendering(true)
                .synchronization2(true);
            let mut features12 = vk::PhysicalDeviceVulkan12Features::default()
                .buffer_device_address(true)
                .descriptor_indexing(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features)
                .push_next(&mut features13)
                .push_next(&mut features12);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_error("Failed to create logical device", e))?;

            let graphics_queue = device.get_device_queue(graphics_family_index, 0);
            let present_queue = device.get_device_queue(present_family_index, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: true,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_error("Failed to create GPU allocator", e))?;

            let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

            engine_debug!(
                SOURCE,
                "Device ready (graphics family {}, present family {}, validation {})",
                graphics_family_index, present_family_index, enable_validation
            );

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                device,
                graphics_queue,
                graphics_queue_family: graphics_family_index,
                present_queue,
                queue_lock: Mutex::new(()),
                surface,
                surface_loader,
                swapchain_loader,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                buffers: Mutex::new(FxHashMap::default()),
                images: Mutex::new(FxHashMap::default()),
                swapchains: Mutex::new(FxHashMap::default()),
                debug_utils_loader,
                debug_messenger,
            })
        }
    }

    /// First Vulkan 1.3 device with graphics and present support, discrete GPUs first
    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, u32, u32)> {
        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| init_error("Failed to enumerate physical devices", e))?;

        let mut candidates = Vec::new();
        for physical_device in physical_devices {
            let properties = instance.get_physical_device_properties(physical_device);
            if properties.api_version < vk::API_VERSION_1_3 {
                continue;
            }

            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
            let graphics = queue_families
                .iter()
                .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|i| i as u32);
            let supports_present = |index: u32| {
                surface_loader
                    .get_physical_device_surface_support(physical_device, index, surface)
                    .unwrap_or(false)
            };
            let present = match graphics {
                Some(g) if supports_present(g) => Some(g),
                _ => (0..queue_families.len() as u32).find(|&i| supports_present(i)),
            };

            if let (Some(graphics), Some(present)) = (graphics, present) {
                let discrete = properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU;
                candidates.push((discrete, physical_device, graphics, present));
            }
        }

        candidates.sort_by_key(|(discrete, ..)| !*discrete);
        candidates
            .into_iter()
            .next()
            .map(|(_, physical_device, graphics, present)| (physical_device, graphics, present))
            .ok_or_else(|| init_error("No suitable GPU found", "Vulkan 1.3 with graphics and present queues required"))
    }

    /// Format of an image created by this device (`None` for swapchain images)
    pub(crate) fn image_format(&self, image: Image) -> Option<Format> {
        lock(&self.images).get(&image.raw()).map(|entry| entry.format)
    }

    fn allocate_memory(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: gpu_allocator::MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        lock(&*self.allocator)
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                engine_error!(SOURCE, "Out of GPU memory for {} (required: {:.2} MB): {}", name, size_mb, e);
                Error::OutOfMemory
            })
    }

    fn free_memory(&self, allocation: Allocation) {
        if let Err(e) = lock(&*self.allocator).free(allocation) {
            engine_warn!(SOURCE, "Failed to free GPU allocation: {}", e);
        }
    }
}

impl GraphicsDevice for VulkanDevice {
    // ===== SYNCHRONIZATION =====

    fn create_fence(&self, signaled: bool) -> Result<Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { self.device.create_fence(&info, None) }
            .map_err(|e| vk_error("Failed to create fence", e))?;
        Ok(Fence(fence.as_raw()))
    }

    fn destroy_fence(&self, fence: Fence) {
        unsafe { self.device.destroy_fence(vk::Fence::from_raw(fence.raw()), None) }
    }

    fn wait_for_fence(&self, fence: Fence, timeout_ns: u64) -> Result<()> {
        let fences = [vk::Fence::from_raw(fence.raw())];
        match unsafe { self.device.wait_for_fences(&fences, true, timeout_ns) } {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => {
                engine_error!(SOURCE, "Fence {:#x} not signaled within {} ns", fence.raw(), timeout_ns);
                Err(Error::Timeout(format!("fence {:#x} after {} ns", fence.raw(), timeout_ns)))
            }
            Err(e) => Err(vk_error("Failed to wait for fence", e)),
        }
    }

    fn reset_fence(&self, fence: Fence) -> Result<()> {
        let fences = [vk::Fence::from_raw(fence.raw())];
        unsafe { self.device.reset_fences(&fences) }.map_err(|e| vk_error("Failed to reset fence", e))
    }

    fn create_semaphore(&self) -> Result<Semaphore> {
        let info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { self.device.create_semaphore(&info, None) }
            .map_err(|e| vk_error("Failed to create semaphore", e))?;
        Ok(Semaphore(semaphore.as_raw()))
    }

    fn destroy_semaphore(&self, semaphore: Semaphore) {
        unsafe { self.device.destroy_semaphore(vk::Semaphore::from_raw(semaphore.raw()), None) }
    }

    fn wait_idle(&self) -> Result<()> {
        let _queue = lock(&self.queue_lock);
        unsafe { self.device.device_wait_idle() }.map_err(|e| vk_error("Failed to wait idle", e))
    }

    // ===== COMMAND BUFFERS =====

    fn create_command_pool(&self) -> Result<CommandPool> {
        let info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(self.graphics_queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let pool = unsafe { self.device.create_command_pool(&info, None) }
            .map_err(|e| vk_error("Failed to create command pool", e))?;
        Ok(CommandPool(pool.as_raw()))
    }

    fn destroy_command_pool(&self, pool: CommandPool) {
        unsafe { self.device.destroy_command_pool(vk::CommandPool::from_raw(pool.raw()), None) }
    }

    fn allocate_command_buffer(&self, pool: CommandPool) -> Result<CommandBuffer> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(vk::CommandPool::from_raw(pool.raw()))
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { self.device.allocate_command_buffers(&info) }
            .map_err(|e| vk_error("Failed to allocate command buffer", e))?;
        buffers
            .first()
            .map(|cmd| CommandBuffer(cmd.as_raw()))
            .ok_or_else(|| engine_err!(SOURCE, "Command buffer allocation returned nothing"))
    }

    fn reset_command_buffer(&self, cmd: CommandBuffer) -> Result<()> {
        unsafe {
            self.device
                .reset_command_buffer(vk::CommandBuffer::from_raw(cmd.raw()), vk::CommandBufferResetFlags::empty())
        }
        .map_err(|e| vk_error("Failed to reset command buffer", e))
    }

    fn begin_command_buffer(&self, cmd: CommandBuffer) -> Result<()> {
        let info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.device.begin_command_buffer(vk::CommandBuffer::from_raw(cmd.raw()), &info) }
            .map_err(|e| vk_error("Failed to begin command buffer", e))
    }

    fn end_command_buffer(&self, cmd: CommandBuffer) -> Result<()> {
        unsafe { self.device.end_command_buffer(vk::CommandBuffer::from_raw(cmd.raw())) }
            .map_err(|e| vk_error("Failed to end command buffer", e))
    }

    fn submit(&self, info: &SubmitInfo) -> Result<()> {
        let command_buffers = [vk::CommandBufferSubmitInfo::default()
            .command_buffer(vk::CommandBuffer::from_raw(info.command_buffer.raw()))];

        let wait_infos: Vec<vk::SemaphoreSubmitInfo> = info
            .wait
            .iter()
            .map(|&(semaphore, stage)| {
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(vk::Semaphore::from_raw(semaphore.raw()))
                    .stage_mask(wait_stage_to_vk(stage))
                    .value(1)
            })
            .collect();
        let signal_infos: Vec<vk::SemaphoreSubmitInfo> = info
            .signal
            .iter()
            .map(|&semaphore| {
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(vk::Semaphore::from_raw(semaphore.raw()))
                    .stage_mask(vk::PipelineStageFlags2::ALL_GRAPHICS)
                    .value(1)
            })
            .collect();

        let submit = vk::SubmitInfo2::default()
            .wait_semaphore_infos(&wait_infos)
            .signal_semaphore_infos(&signal_infos)
            .command_buffer_infos(&command_buffers);
        let fence = info
            .fence
            .map(|f| vk::Fence::from_raw(f.raw()))
            .unwrap_or_else(vk::Fence::null);

        let _queue = lock(&self.queue_lock);
        unsafe { self.device.queue_submit2(self.graphics_queue, &[submit], fence) }
            .map_err(|e| vk_error("Failed to submit commands to GPU queue", e))
    }

    // ===== SWAPCHAIN =====

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<SwapchainInfo> {
        self.create_swapchain_khr(desc)
    }

    fn destroy_swapchain(&self, swapchain: Swapchain) {
        self.destroy_swapchain_khr(swapchain)
    }

    fn acquire_next_image(&self, swapchain: Swapchain, signal: Semaphore, timeout_ns: u64) -> Result<AcquireOutcome> {
        self.acquire_next_image_khr(swapchain, signal, timeout_ns)
    }

    fn present(&self, swapchain: Swapchain, image_index: u32, wait: Semaphore) -> Result<PresentOutcome> {
        self.present_khr(swapchain, image_index, wait)
    }

    // ===== MEMORY RESOURCES =====

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Buffer> {
        if desc.size == 0 {
            return Err(Error::InvalidResource("buffer size must be non-zero".to_string()));
        }

        let info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(buffer_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        unsafe {
            let buffer = self
                .device
                .create_buffer(&info, None)
                .map_err(|e| vk_error(&format!("Failed to create buffer of size {} bytes", desc.size), e))?;

            let requirements = self.device.get_buffer_memory_requirements(buffer);
            let allocation = match self.allocate_memory(
                "buffer",
                requirements,
                memory_location_to_gpu_allocator(desc.location),
                true,
            ) {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = self.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                self.device.destroy_buffer(buffer, None);
                self.free_memory(allocation);
                return Err(vk_error("Failed to bind buffer memory", e));
            }

            lock(&self.buffers).insert(buffer.as_raw(), BufferEntry { allocation, size: desc.size });
            Ok(Buffer(buffer.as_raw()))
        }
    }

    fn destroy_buffer(&self, buffer: Buffer) {
        let entry = lock(&self.buffers).remove(&buffer.raw());
        unsafe { self.device.destroy_buffer(vk::Buffer::from_raw(buffer.raw()), None) };
        match entry {
            Some(entry) => self.free_memory(entry.allocation),
            None => engine_warn!(SOURCE, "destroy_buffer: unknown buffer {:#x}", buffer.raw()),
        }
    }

    fn write_buffer(&self, buffer: Buffer, offset: u64, data: &[u8]) -> Result<()> {
        let mut buffers = lock(&self.buffers);
        let entry = buffers
            .get_mut(&buffer.raw())
            .ok_or_else(|| Error::InvalidResource(format!("unknown buffer {:#x}", buffer.raw())))?;

        let end = offset
            .checked_add(data.len() as u64)
            .filter(|&end| end <= entry.size)
            .ok_or_else(|| {
                Error::InvalidResource(format!(
                    "write of {} bytes at offset {} overflows buffer of {} bytes",
                    data.len(), offset, entry.size
                ))
            })?;

        let mapped = entry
            .allocation
            .mapped_slice_mut()
            .ok_or_else(|| Error::InvalidResource("buffer is not host visible".to_string()))?;
        mapped[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn buffer_device_address(&self, buffer: Buffer) -> u64 {
        let info = vk::BufferDeviceAddressInfo::default().buffer(vk::Buffer::from_raw(buffer.raw()));
        unsafe { self.device.get_buffer_device_address(&info) }
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<(Image, ImageView)> {
        let vk_format = format_to_vk(desc.format);
        let mip_levels = desc.mip_levels.max(1);

        let info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(vk_format)
            .extent(vk::Extent3D {
                width: desc.extent.width,
                height: desc.extent.height,
                depth: desc.extent.depth.max(1),
            })
            .mip_levels(mip_levels)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(image_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        unsafe {
            let image = self.device.create_image(&info, None).map_err(|e| {
                vk_error(
                    &format!("Failed to create {:?} image {}x{}", desc.format, desc.extent.width, desc.extent.height),
                    e,
                )
            })?;

            let requirements = self.device.get_image_memory_requirements(image);
            let allocation = match self.allocate_memory("image", requirements, gpu_allocator::MemoryLocation::GpuOnly, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            if let Err(e) = self.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                self.device.destroy_image(image, None);
                self.free_memory(allocation);
                return Err(vk_error("Failed to bind image memory", e));
            }

            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(vk_format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: aspect_for_format(desc.format),
                    base_mip_level: 0,
                    level_count: mip_levels,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = match self.device.create_image_view(&view_info, None) {
                Ok(view) => view,
                Err(e) => {
                    self.device.destroy_image(image, None);
                    self.free_memory(allocation);
                    return Err(vk_error("Failed to create image view", e));
                }
            };

            lock(&self.images).insert(image.as_raw(), ImageEntry { allocation, view, format: desc.format });
            Ok((Image(image.as_raw()), ImageView(view.as_raw())))
        }
    }

    fn destroy_image(&self, image: Image, view: ImageView) {
        let entry = lock(&self.images).remove(&image.raw());
        unsafe {
            self.device.destroy_image_view(vk::ImageView::from_raw(view.raw()), None);
            self.device.destroy_image(vk::Image::from_raw(image.raw()), None);
        }
        match entry {
            Some(entry) => self.free_memory(entry.allocation),
            None => engine_warn!(SOURCE, "destroy_image: unknown image {:#x}", image.raw()),
        }
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Sampler> {
        let info = vk::SamplerCreateInfo::default()
            .mag_filter(filter_to_vk(desc.mag_filter))
            .min_filter(filter_to_vk(desc.min_filter))
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE);
        let sampler = unsafe { self.device.create_sampler(&info, None) }
            .map_err(|e| vk_error("Failed to create sampler", e))?;
        Ok(Sampler(sampler.as_raw()))
    }

    fn destroy_sampler(&self, sampler: Sampler) {
        unsafe { self.device.destroy_sampler(vk::Sampler::from_raw(sampler.raw()), None) }
    }

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
        stages: ShaderStages,
    ) -> Result<DescriptorSetLayout> {
        let stage_flags = shader_stages_to_vk(stages);
        let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
            .iter()
            .map(|b| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(b.binding)
                    .descriptor_type(descriptor_type_to_vk(b.ty))
                    .descriptor_count(1)
                    .stage_flags(stage_flags)
            })
            .collect();

        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&vk_bindings);
        let layout = unsafe { self.device.create_descriptor_set_layout(&info, None) }
            .map_err(|e| vk_error("Failed to create descriptor set layout", e))?;
        Ok(DescriptorSetLayout(layout.as_raw()))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayout) {
        unsafe {
            self.device
                .destroy_descriptor_set_layout(vk::DescriptorSetLayout::from_raw(layout.raw()), None)
        }
    }

    fn create_descriptor_pool(&self, max_sets: u32, sizes: &[PoolSize]) -> Result<DescriptorPool> {
        // Vulkan rejects zero-sized entries
        let pool_sizes: Vec<vk::DescriptorPoolSize> = sizes
            .iter()
            .filter(|size| size.count > 0)
            .map(|size| vk::DescriptorPoolSize {
                ty: descriptor_type_to_vk(size.ty),
                descriptor_count: size.count,
            })
            .collect();

        let info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(&pool_sizes);
        let pool = unsafe { self.device.create_descriptor_pool(&info, None) }
            .map_err(|e| vk_error("Failed to create descriptor pool", e))?;
        Ok(DescriptorPool(pool.as_raw()))
    }

    fn reset_descriptor_pool(&self, pool: DescriptorPool) -> Result<()> {
        unsafe {
            self.device.reset_descriptor_pool(
                vk::DescriptorPool::from_raw(pool.raw()),
                vk::DescriptorPoolResetFlags::empty(),
            )
        }
        .map_err(|e| vk_error("Failed to reset descriptor pool", e))
    }

    fn destroy_descriptor_pool(&self, pool: DescriptorPool) {
        unsafe { self.device.destroy_descriptor_pool(vk::DescriptorPool::from_raw(pool.raw()), None) }
    }

    fn allocate_descriptor_set(&self, pool: DescriptorPool, layout: DescriptorSetLayout) -> Result<DescriptorSet> {
        let layouts = [vk::DescriptorSetLayout::from_raw(layout.raw())];
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(vk::DescriptorPool::from_raw(pool.raw()))
            .set_layouts(&layouts);

        match unsafe { self.device.allocate_descriptor_sets(&info) } {
            Ok(sets) => sets
                .first()
                .map(|set| DescriptorSet(set.as_raw()))
                .ok_or_else(|| engine_err!(SOURCE, "Descriptor set allocation returned nothing")),
            Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {
                Err(Error::PoolExhausted)
            }
            Err(e) => Err(vk_error("Failed to allocate descriptor set", e)),
        }
    }

    fn update_descriptor_set(&self, set: DescriptorSet, writes: &[DescriptorWrite]) {
        let image_infos: Vec<vk::DescriptorImageInfo> = writes
            .iter()
            .filter_map(|write| match write.info {
                DescriptorInfo::Image { view, sampler, layout } => Some(
                    vk::DescriptorImageInfo::default()
                        .image_view(vk::ImageView::from_raw(view.raw()))
                        .sampler(vk::Sampler::from_raw(sampler.raw()))
                        .image_layout(image_layout_to_vk(layout)),
                ),
                DescriptorInfo::Buffer { .. } => None,
            })
            .collect();
        let buffer_infos: Vec<vk::DescriptorBufferInfo> = writes
            .iter()
            .filter_map(|write| match write.info {
                DescriptorInfo::Buffer { buffer, offset, range } => Some(
                    vk::DescriptorBufferInfo::default()
                        .buffer(vk::Buffer::from_raw(buffer.raw()))
                        .offset(offset)
                        .range(range),
                ),
                DescriptorInfo::Image { .. } => None,
            })
            .collect();

        let dst_set = vk::DescriptorSet::from_raw(set.raw());
        let mut next_image = 0;
        let mut next_buffer = 0;
        let vk_writes: Vec<vk::WriteDescriptorSet> = writes
            .iter()
            .map(|write| {
                let base = vk::WriteDescriptorSet::default()
                    .dst_set(dst_set)
                    .dst_binding(write.binding)
                    .descriptor_type(descriptor_type_to_vk(write.ty));
                match write.info {
                    DescriptorInfo::Image { .. } => {
                        next_image += 1;
                        base.image_info(std::slice::from_ref(&image_infos[next_image - 1]))
                    }
                    DescriptorInfo::Buffer { .. } => {
                        next_buffer += 1;
                        base.buffer_info(std::slice::from_ref(&buffer_infos[next_buffer - 1]))
                    }
                }
            })
            .collect();

        unsafe { self.device.update_descriptor_sets(&vk_writes, &[]) }
    }

    // ===== SHADERS & PIPELINES =====

    fn create_shader_module(&self, code: &[u32]) -> Result<ShaderModule> {
        if code.is_empty() {
            return Err(Error::ShaderLoadFailed("empty SPIR-V code".to_string()));
        }
        let info = vk::ShaderModuleCreateInfo::default().code(code);
        let module = unsafe { self.device.create_shader_module(&info, None) }.map_err(|e| {
            engine_error!(SOURCE, "Failed to create shader module: {:?}", e);
            Error::ShaderLoadFailed(format!("{:?}", e))
        })?;
        Ok(ShaderModule(module.as_raw()))
    }

    fn destroy_shader_module(&self, module: ShaderModule) {
        unsafe { self.device.destroy_shader_module(vk::ShaderModule::from_raw(module.raw()), None) }
    }

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDesc) -> Result<PipelineLayout> {
        let set_layouts: Vec<vk::DescriptorSetLayout> = desc
            .set_layouts
            .iter()
            .map(|layout| vk::DescriptorSetLayout::from_raw(layout.raw()))
            .collect();
        let push_constants: Vec<vk::PushConstantRange> = desc
            .push_constants
            .iter()
            .map(|range| vk::PushConstantRange {
                stage_flags: shader_stages_to_vk(range.stages),
                offset: range.offset,
                size: range.size,
            })
            .collect();

        let info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_constants);
        let layout = unsafe { self.device.create_pipeline_layout(&info, None) }
            .map_err(|e| vk_error("Failed to create pipeline layout", e))?;
        Ok(PipelineLayout(layout.as_raw()))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayout) {
        unsafe { self.device.destroy_pipeline_layout(vk::PipelineLayout::from_raw(layout.raw()), None) }
    }

    fn create_compute_pipeline(&self, layout: PipelineLayout, shader: ShaderModule) -> Result<Pipeline> {
        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(vk::ShaderModule::from_raw(shader.raw()))
            .name(c"main");
        let info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(vk::PipelineLayout::from_raw(layout.raw()));

        let pipelines = unsafe {
            self.device
                .create_compute_pipelines(vk::PipelineCache::null(), &[info], None)
        }
        .map_err(|(_, e)| vk_error("Failed to create compute pipeline", e))?;

        pipelines
            .first()
            .map(|pipeline| Pipeline(pipeline.as_raw()))
            .ok_or_else(|| engine_err!(SOURCE, "Compute pipeline creation returned nothing"))
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<Pipeline> {
        let stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vk::ShaderModule::from_raw(desc.vertex_shader.raw()))
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(vk::ShaderModule::from_raw(desc.fragment_shader.raw()))
                .name(c"main"),
        ];

        // Vertices are pulled from a storage buffer through its device address
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default();
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(desc.topology))
            .primitive_restart_enable(false);
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        let rasterizer = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(polygon_mode_to_vk(desc.polygon_mode))
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(desc.cull_mode))
            .front_face(front_face_to_vk(desc.front_face));
        let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .sample_shading_enable(false)
            .min_sample_shading(1.0);
        let blend_attachments = [blend_attachment_to_vk(desc.blend)];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(&blend_attachments);
        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth.test_enable)
            .depth_write_enable(desc.depth.write_enable)
            .depth_compare_op(compare_op_to_vk(desc.depth.compare_op))
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false)
            .min_depth_bounds(0.0)
            .max_depth_bounds(1.0);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let color_formats = [format_to_vk(desc.color_format)];
        let mut rendering_info = vk::PipelineRenderingCreateInfo::default()
            .color_attachment_formats(&color_formats)
            .depth_attachment_format(desc.depth_format.map(format_to_vk).unwrap_or(vk::Format::UNDEFINED));

        let info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .depth_stencil_state(&depth_stencil)
            .dynamic_state(&dynamic_state)
            .layout(vk::PipelineLayout::from_raw(desc.layout.raw()))
            .push_next(&mut rendering_info);

        let pipelines = unsafe {
            self.device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)
        }
        .map_err(|(_, e)| vk_error("Failed to create graphics pipeline", e))?;

        pipelines
            .first()
            .map(|pipeline| Pipeline(pipeline.as_raw()))
            .ok_or_else(|| engine_err!(SOURCE, "Graphics pipeline creation returned nothing"))
    }

    fn destroy_pipeline(&self, pipeline: Pipeline) {
        unsafe { self.device.destroy_pipeline(vk::Pipeline::from_raw(pipeline.raw()), None) }
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Release whatever the engine did not destroy
            let swapchains: Vec<u64> = lock(&self.swapchains).keys().copied().collect();
            for raw in swapchains {
                engine_warn!(SOURCE, "Swapchain {:#x} still alive at device drop", raw);
                self.destroy_swapchain_khr(Swapchain(raw));
            }

            let leaked_images: Vec<(u64, ImageEntry)> = lock(&self.images).drain().collect();
            if !leaked_images.is_empty() {
                engine_warn!(SOURCE, "{} image(s) still alive at device drop", leaked_images.len());
            }
            for (raw, entry) in leaked_images {
                self.device.destroy_image_view(entry.view, None);
                self.device.destroy_image(vk::Image::from_raw(raw), None);
                self.free_memory(entry.allocation);
            }

            let leaked_buffers: Vec<(u64, BufferEntry)> = lock(&self.buffers).drain().collect();
            if !leaked_buffers.is_empty() {
                engine_warn!(SOURCE, "{} buffer(s) still alive at device drop", leaked_buffers.len());
            }
            for (raw, entry) in leaked_buffers {
                self.device.destroy_buffer(vk::Buffer::from_raw(raw), None);
                self.free_memory(entry.allocation);
            }

            // 2. Drop allocator: free VkDeviceMemory pages BEFORE destroying device
            ManuallyDrop::drop(&mut self.allocator);

            // 3. Stop callbacks, then destroy the messenger BEFORE device and instance
            crate::debug::cleanup_debug_config();
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils_loader, self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            // 4. Surface, device, instance
            self.surface_loader.destroy_surface(self.surface, None);
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
