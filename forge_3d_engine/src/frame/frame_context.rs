/// One slot of the frame ring

use crate::deletion_queue::DeletionQueue;
use crate::descriptor::DescriptorAllocatorGrowable;
use crate::error::Result;
use crate::graphics_device::{
    CommandBuffer, CommandPool, DescriptorType, Fence, GraphicsDevice, PoolSizeRatio, Semaphore,
};
use crate::engine_error;

/// Descriptor mix of each frame's transient allocator
pub const FRAME_POOL_RATIOS: [PoolSizeRatio; 4] = [
    PoolSizeRatio { ty: DescriptorType::StorageImage, ratio: 3.0 },
    PoolSizeRatio { ty: DescriptorType::StorageBuffer, ratio: 3.0 },
    PoolSizeRatio { ty: DescriptorType::UniformBuffer, ratio: 3.0 },
    PoolSizeRatio { ty: DescriptorType::CombinedImageSampler, ratio: 4.0 },
];

/// GPU state owned by one in-flight frame
///
/// The render fence is created signaled so the very first wait on a fresh
/// slot returns at once. Nothing in the slot may be reused until that fence
/// has been waited on.
#[derive(Debug)]
pub struct FrameContext {
    pub command_pool: CommandPool,
    pub command_buffer: CommandBuffer,
    pub render_fence: Fence,
    /// Signaled when the acquired swapchain image is ready
    pub swapchain_semaphore: Semaphore,
    /// Signaled when rendering finished, waited on by present
    pub render_semaphore: Semaphore,
    /// Resources to release once this slot's previous submission completed
    pub deletion_queue: DeletionQueue,
    /// Transient descriptor sets, reset every time the slot comes around
    pub descriptors: DescriptorAllocatorGrowable,
}

impl FrameContext {
    pub fn new(device: &dyn GraphicsDevice, descriptor_sets: u32) -> Result<Self> {
        let command_pool = device.create_command_pool()?;
        let mut frame = Self {
            command_pool,
            command_buffer: CommandBuffer::NULL,
            render_fence: Fence::NULL,
            swapchain_semaphore: Semaphore::NULL,
            render_semaphore: Semaphore::NULL,
            deletion_queue: DeletionQueue::new(),
            descriptors: DescriptorAllocatorGrowable::new(),
        };

        // Partially built slots release what they got
        if let Err(e) = frame.create_objects(device, descriptor_sets) {
            frame.destroy(device);
            return Err(e);
        }
        Ok(frame)
    }

    fn create_objects(&mut self, device: &dyn GraphicsDevice, descriptor_sets: u32) -> Result<()> {
        self.command_buffer = device.allocate_command_buffer(self.command_pool)?;
        self.render_fence = device.create_fence(true)?;
        self.swapchain_semaphore = device.create_semaphore()?;
        self.render_semaphore = device.create_semaphore()?;
        self.descriptors.init(device, descriptor_sets, &FRAME_POOL_RATIOS)
    }

    /// Make the slot reusable: wait for its last submission, then release
    /// what that submission used and reset its transient descriptors
    ///
    /// # Errors
    ///
    /// `Error::Timeout` if the fence does not signal within `fence_timeout_ns`.
    pub fn begin(&mut self, device: &dyn GraphicsDevice, fence_timeout_ns: u64) -> Result<()> {
        device.wait_for_fence(self.render_fence, fence_timeout_ns).map_err(|e| {
            engine_error!("forge3d::FrameContext", "Waiting on render fence failed: {}", e);
            e
        })?;
        self.deletion_queue.flush(device);
        self.descriptors.clear_pools(device)
    }

    /// Release every object of the slot (device must be idle)
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        if !self.command_pool.is_null() {
            device.destroy_command_pool(self.command_pool);
            self.command_pool = CommandPool::NULL;
        }
        if !self.render_fence.is_null() {
            device.destroy_fence(self.render_fence);
            self.render_fence = Fence::NULL;
        }
        for semaphore in [&mut self.swapchain_semaphore, &mut self.render_semaphore] {
            if !semaphore.is_null() {
                device.destroy_semaphore(*semaphore);
                *semaphore = Semaphore::NULL;
            }
        }
        self.deletion_queue.flush(device);
        self.descriptors.destroy_pools(device);
    }
}
