/// GraphicsDevice and CommandRecorder traits
///
/// The core engine never touches a graphics API directly: every GPU object is
/// created, recorded into and destroyed through these two traits. All methods
/// take `&self` so the device can be shared as `Arc<dyn GraphicsDevice>`;
/// backends guard their own mutable state (allocators, handle tables).

use crate::error::Result;
use crate::graphics_device::*;

/// Command recording on a command buffer
///
/// Commands are only valid between `begin_command_buffer` and
/// `end_command_buffer` of the same buffer.
pub trait CommandRecorder {
    /// Record an image layout transition
    fn cmd_transition_image(&self, cmd: CommandBuffer, barrier: &ImageBarrier);

    /// Record a scaled, linearly filtered blit
    fn cmd_blit_image(&self, cmd: CommandBuffer, region: &BlitRegion);

    fn cmd_copy_buffer(&self, cmd: CommandBuffer, src: Buffer, dst: Buffer, regions: &[BufferCopy]);

    /// Copy tightly packed texels from `src` into mip 0 of `dst` (layout TransferDst)
    fn cmd_copy_buffer_to_image(&self, cmd: CommandBuffer, src: Buffer, dst: Image, extent: Extent3D);

    fn cmd_bind_pipeline(&self, cmd: CommandBuffer, bind_point: PipelineBindPoint, pipeline: Pipeline);

    fn cmd_bind_descriptor_sets(
        &self,
        cmd: CommandBuffer,
        bind_point: PipelineBindPoint,
        layout: PipelineLayout,
        first_set: u32,
        sets: &[DescriptorSet],
    );

    fn cmd_push_constants(
        &self,
        cmd: CommandBuffer,
        layout: PipelineLayout,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    );

    fn cmd_dispatch(&self, cmd: CommandBuffer, x: u32, y: u32, z: u32);

    fn cmd_begin_rendering(&self, cmd: CommandBuffer, info: &RenderingInfo);

    fn cmd_end_rendering(&self, cmd: CommandBuffer);

    fn cmd_set_viewport(&self, cmd: CommandBuffer, extent: Extent2D);

    fn cmd_set_scissor(&self, cmd: CommandBuffer, extent: Extent2D);

    /// Bind a 32-bit index buffer
    fn cmd_bind_index_buffer(&self, cmd: CommandBuffer, buffer: Buffer, offset: u64);

    fn cmd_draw_indexed(
        &self,
        cmd: CommandBuffer,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );
}

/// GPU device abstraction
///
/// # Errors
///
/// Creation calls report `Error::OutOfMemory` or `Error::BackendError`;
/// `allocate_descriptor_set` reports `Error::PoolExhausted` when the pool has
/// no room left; `wait_for_fence` reports `Error::Timeout` when the bound expires.
pub trait GraphicsDevice: CommandRecorder + Send + Sync {
    // ===== SYNCHRONIZATION =====

    fn create_fence(&self, signaled: bool) -> Result<Fence>;
    fn destroy_fence(&self, fence: Fence);

    /// Block until `fence` is signaled or `timeout_ns` elapses
    fn wait_for_fence(&self, fence: Fence, timeout_ns: u64) -> Result<()>;
    fn reset_fence(&self, fence: Fence) -> Result<()>;

    fn create_semaphore(&self) -> Result<Semaphore>;
    fn destroy_semaphore(&self, semaphore: Semaphore);

    /// Block until every queue is idle
    fn wait_idle(&self) -> Result<()>;

    // ===== COMMAND BUFFERS =====

    /// Create a resettable command pool on the graphics queue family
    fn create_command_pool(&self) -> Result<CommandPool>;
    fn destroy_command_pool(&self, pool: CommandPool);
    fn allocate_command_buffer(&self, pool: CommandPool) -> Result<CommandBuffer>;
    fn reset_command_buffer(&self, cmd: CommandBuffer) -> Result<()>;

    /// Begin recording for a single submission
    fn begin_command_buffer(&self, cmd: CommandBuffer) -> Result<()>;
    fn end_command_buffer(&self, cmd: CommandBuffer) -> Result<()>;

    /// Submit one command buffer to the graphics queue
    fn submit(&self, info: &SubmitInfo) -> Result<()>;

    // ===== SWAPCHAIN =====

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<SwapchainInfo>;

    /// Destroy a swapchain and the image views created with it
    fn destroy_swapchain(&self, swapchain: Swapchain);

    fn acquire_next_image(
        &self,
        swapchain: Swapchain,
        signal: Semaphore,
        timeout_ns: u64,
    ) -> Result<AcquireOutcome>;

    fn present(&self, swapchain: Swapchain, image_index: u32, wait: Semaphore) -> Result<PresentOutcome>;

    // ===== MEMORY RESOURCES =====

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Buffer>;
    fn destroy_buffer(&self, buffer: Buffer);

    /// Copy `data` into a host-visible buffer at `offset`
    fn write_buffer(&self, buffer: Buffer, offset: u64, data: &[u8]) -> Result<()>;

    /// Shader-visible address of a buffer created with `BufferUsage::DEVICE_ADDRESS`
    fn buffer_device_address(&self, buffer: Buffer) -> u64;

    /// Create an image and a view covering all of its mip levels
    fn create_image(&self, desc: &ImageDesc) -> Result<(Image, ImageView)>;
    fn destroy_image(&self, image: Image, view: ImageView);

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Sampler>;
    fn destroy_sampler(&self, sampler: Sampler);

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
        stages: ShaderStages,
    ) -> Result<DescriptorSetLayout>;
    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayout);

    fn create_descriptor_pool(&self, max_sets: u32, sizes: &[PoolSize]) -> Result<DescriptorPool>;
    fn reset_descriptor_pool(&self, pool: DescriptorPool) -> Result<()>;
    fn destroy_descriptor_pool(&self, pool: DescriptorPool);

    fn allocate_descriptor_set(
        &self,
        pool: DescriptorPool,
        layout: DescriptorSetLayout,
    ) -> Result<DescriptorSet>;

    /// Apply every write to `set` in one update call
    fn update_descriptor_set(&self, set: DescriptorSet, writes: &[DescriptorWrite]);

    // ===== SHADERS & PIPELINES =====

    fn create_shader_module(&self, code: &[u32]) -> Result<ShaderModule>;
    fn destroy_shader_module(&self, module: ShaderModule);

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDesc) -> Result<PipelineLayout>;
    fn destroy_pipeline_layout(&self, layout: PipelineLayout);

    fn create_compute_pipeline(&self, layout: PipelineLayout, shader: ShaderModule) -> Result<Pipeline>;
    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<Pipeline>;
    fn destroy_pipeline(&self, pipeline: Pipeline);
}
