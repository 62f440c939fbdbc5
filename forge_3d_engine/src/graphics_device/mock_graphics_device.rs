/// Mock graphics device for unit tests (no GPU required)
///
/// Every call is recorded as a short string in `MockState::calls`. The mock
/// also models what the tests need to observe about the GPU:
/// - fences: a submitted fence is "in flight" until the next wait completes it
/// - ordering violations (command buffer reused before its fence was waited on,
///   fence reset while in flight, double destroys) land in `violations`
/// - descriptor pools have a real set capacity and report `PoolExhausted`
/// - host-visible buffers keep their written bytes

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics_device::*;
use crate::log::{LogEntry, LogSeverity, Logger};

#[derive(Debug, Clone, Copy, Default)]
pub struct MockFence {
    pub signaled: bool,
    pub in_flight: bool,
    /// Waited on (and found signaled) since the last submit
    pub observed: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct MockPool {
    pub max_sets: u32,
    pub allocated: u32,
}

#[derive(Debug, Clone)]
pub struct MockBuffer {
    pub desc: BufferDesc,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct MockState {
    next_id: u64,
    pub calls: Vec<String>,
    pub violations: Vec<String>,
    pub fences: FxHashMap<u64, MockFence>,
    /// Fence of the last submission of each command buffer
    pub command_buffer_fence: FxHashMap<u64, u64>,
    pub pools: FxHashMap<u64, MockPool>,
    pub created_pools: Vec<DescriptorPool>,
    pub destroyed_pools: Vec<DescriptorPool>,
    /// (set, number of writes) per update call
    pub descriptor_updates: Vec<(DescriptorSet, usize)>,
    pub buffers: FxHashMap<u64, MockBuffer>,
    pub images: FxHashMap<u64, ImageDesc>,
    /// Live objects by id with their kind
    pub live: FxHashMap<u64, &'static str>,
    pub submits: Vec<SubmitInfo>,
    pub presents: usize,
    pub acquire_script: VecDeque<Result<AcquireOutcome>>,
    pub present_script: VecDeque<Result<PresentOutcome>>,
    pub stall_fences: bool,
    pub fail_wait_idle: bool,
    pub fail_swapchain_creation: bool,
    /// Number of upcoming set allocations forced to report exhaustion
    pub forced_exhaustions: u32,
    pub swapchain_image_count: u32,
    acquire_counter: u32,
}

impl MockState {
    fn alloc(&mut self, kind: &'static str) -> u64 {
        self.next_id += 1;
        self.live.insert(self.next_id, kind);
        self.next_id
    }

    fn release(&mut self, id: u64, kind: &'static str) {
        match self.live.remove(&id) {
            Some(k) if k == kind => {}
            Some(k) => self.violations.push(format!("destroy_{}({}) on a {}", kind, id, k)),
            None => self.violations.push(format!("destroy_{}({}) on a dead handle", kind, id)),
        }
    }

    fn check_command_buffer_reusable(&mut self, cmd: CommandBuffer, what: &str) {
        if let Some(fence) = self.command_buffer_fence.get(&cmd.0) {
            let observed = self.fences.get(fence).map(|f| f.observed).unwrap_or(false);
            if !observed {
                self.violations.push(format!(
                    "{}({}) before fence {} was observed signaled",
                    what, cmd.0, fence
                ));
            }
        }
    }
}

/// Recording mock implementing `GraphicsDevice`
pub struct MockGraphicsDevice {
    state: Mutex<MockState>,
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                swapchain_image_count: 3,
                ..Default::default()
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: String) {
        self.state().calls.push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of recorded calls starting with `prefix`
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.state().calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn violations(&self) -> Vec<String> {
        self.state().violations.clone()
    }

    pub fn script_acquire(&self, outcome: Result<AcquireOutcome>) {
        self.state().acquire_script.push_back(outcome);
    }

    pub fn script_present(&self, outcome: Result<PresentOutcome>) {
        self.state().present_script.push_back(outcome);
    }

    /// In-flight fences never complete while set
    pub fn set_stall_fences(&self, stall: bool) {
        self.state().stall_fences = stall;
    }

    pub fn set_fail_wait_idle(&self, fail: bool) {
        self.state().fail_wait_idle = fail;
    }

    pub fn set_fail_swapchain_creation(&self, fail: bool) {
        self.state().fail_swapchain_creation = fail;
    }

    /// Make the next `count` set allocations fail with `PoolExhausted`
    pub fn force_exhaustions(&self, count: u32) {
        self.state().forced_exhaustions = count;
    }

    /// Set capacity of a live descriptor pool
    pub fn pool_capacity(&self, pool: DescriptorPool) -> Option<u32> {
        self.state().pools.get(&pool.0).map(|p| p.max_sets)
    }

    pub fn fence_state(&self, fence: Fence) -> Option<MockFence> {
        self.state().fences.get(&fence.0).copied()
    }

    pub fn buffer_data(&self, buffer: Buffer) -> Vec<u8> {
        self.state().buffers.get(&buffer.0).map(|b| b.data.clone()).unwrap_or_default()
    }

    pub fn live_count(&self, kind: &str) -> usize {
        self.state().live.values().filter(|k| **k == kind).count()
    }
}

/// Directory under the system temp dir holding minimal valid SPIR-V files
///
/// `tag` keeps concurrently running tests from sharing a directory.
pub fn shader_dir_with(tag: &str, file_names: &[&str]) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("forge3d_shaders_{}_{}", tag, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let words: [u32; 5] = [0x0723_0203, 0x0001_0500, 0, 1, 0];
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    for name in file_names {
        std::fs::write(dir.join(name), &bytes).unwrap();
    }
    dir
}

/// Global logger keeping every entry, for tests checking engine diagnostics
///
/// Tests installing it share the global logger slot and must be `#[serial]`.
#[derive(Clone, Default)]
pub struct LogCapture {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl LogCapture {
    pub fn install() -> Self {
        let capture = Self::default();
        crate::log::set_logger(capture.clone());
        capture
    }

    /// Entries of `severity` logged under `source`
    pub fn entries_from(&self, severity: LogSeverity, source: &str) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.severity == severity && e.source == source)
            .cloned()
            .collect()
    }

    pub fn errors_from(&self, source: &str) -> Vec<LogEntry> {
        self.entries_from(LogSeverity::Error, source)
    }
}

impl Logger for LogCapture {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

impl CommandRecorder for MockGraphicsDevice {
    fn cmd_transition_image(&self, cmd: CommandBuffer, barrier: &ImageBarrier) {
        self.record(format!(
            "transition_image({}, {}, {:?}->{:?}, mip {})",
            cmd.0, barrier.image.0, barrier.old_layout, barrier.new_layout, barrier.base_mip
        ));
    }

    fn cmd_blit_image(&self, cmd: CommandBuffer, region: &BlitRegion) {
        self.record(format!(
            "blit_image({}, {}:{} {}x{} -> {}:{} {}x{})",
            cmd.0,
            region.src.0, region.src_mip, region.src_extent.width, region.src_extent.height,
            region.dst.0, region.dst_mip, region.dst_extent.width, region.dst_extent.height
        ));
    }

    fn cmd_copy_buffer(&self, cmd: CommandBuffer, src: Buffer, dst: Buffer, regions: &[BufferCopy]) {
        self.record(format!("copy_buffer({}, {} -> {}, {} regions)", cmd.0, src.0, dst.0, regions.len()));
    }

    fn cmd_copy_buffer_to_image(&self, cmd: CommandBuffer, src: Buffer, dst: Image, extent: Extent3D) {
        self.record(format!(
            "copy_buffer_to_image({}, {} -> {}, {}x{})",
            cmd.0, src.0, dst.0, extent.width, extent.height
        ));
    }

    fn cmd_bind_pipeline(&self, cmd: CommandBuffer, bind_point: PipelineBindPoint, pipeline: Pipeline) {
        self.record(format!("bind_pipeline({}, {:?}, {})", cmd.0, bind_point, pipeline.0));
    }

    fn cmd_bind_descriptor_sets(
        &self,
        cmd: CommandBuffer,
        bind_point: PipelineBindPoint,
        layout: PipelineLayout,
        first_set: u32,
        sets: &[DescriptorSet],
    ) {
        let ids: Vec<u64> = sets.iter().map(|s| s.0).collect();
        self.record(format!(
            "bind_descriptor_sets({}, {:?}, {}, set {}, {:?})",
            cmd.0, bind_point, layout.0, first_set, ids
        ));
    }

    fn cmd_push_constants(
        &self,
        cmd: CommandBuffer,
        layout: PipelineLayout,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    ) {
        self.record(format!(
            "push_constants({}, {}, {:?}, {}, {} bytes)",
            cmd.0, layout.0, stages, offset, data.len()
        ));
    }

    fn cmd_dispatch(&self, cmd: CommandBuffer, x: u32, y: u32, z: u32) {
        self.record(format!("dispatch({}, {}, {}, {})", cmd.0, x, y, z));
    }

    fn cmd_begin_rendering(&self, cmd: CommandBuffer, info: &RenderingInfo) {
        self.record(format!(
            "begin_rendering({}, {}x{}, depth {})",
            cmd.0, info.extent.width, info.extent.height, info.depth_view.is_some()
        ));
    }

    fn cmd_end_rendering(&self, cmd: CommandBuffer) {
        self.record(format!("end_rendering({})", cmd.0));
    }

    fn cmd_set_viewport(&self, cmd: CommandBuffer, extent: Extent2D) {
        self.record(format!("set_viewport({}, {}x{})", cmd.0, extent.width, extent.height));
    }

    fn cmd_set_scissor(&self, cmd: CommandBuffer, extent: Extent2D) {
        self.record(format!("set_scissor({}, {}x{})", cmd.0, extent.width, extent.height));
    }

    fn cmd_bind_index_buffer(&self, cmd: CommandBuffer, buffer: Buffer, offset: u64) {
        self.record(format!("bind_index_buffer({}, {}, {})", cmd.0, buffer.0, offset));
    }

    fn cmd_draw_indexed(
        &self,
        cmd: CommandBuffer,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.record(format!(
            "draw_indexed({}, {}, {}, {}, {}, {})",
            cmd.0, index_count, instance_count, first_index, vertex_offset, first_instance
        ));
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    // ===== SYNCHRONIZATION =====

    fn create_fence(&self, signaled: bool) -> Result<Fence> {
        let mut state = self.state();
        let id = state.alloc("fence");
        state.fences.insert(id, MockFence { signaled, in_flight: false, observed: signaled });
        state.calls.push(format!("create_fence({})", id));
        Ok(Fence(id))
    }

    fn destroy_fence(&self, fence: Fence) {
        let mut state = self.state();
        state.release(fence.0, "fence");
        state.fences.remove(&fence.0);
        state.calls.push(format!("destroy_fence({})", fence.0));
    }

    fn wait_for_fence(&self, fence: Fence, timeout_ns: u64) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("wait_for_fence({}, {})", fence.0, timeout_ns));
        let stall = state.stall_fences;
        let entry = state
            .fences
            .get_mut(&fence.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown fence {}", fence.0)))?;
        if entry.in_flight {
            if stall {
                return Err(Error::Timeout(format!("fence {}", fence.0)));
            }
            entry.in_flight = false;
            entry.signaled = true;
        }
        if entry.signaled {
            entry.observed = true;
            Ok(())
        } else {
            // Unsignaled and nothing in flight: the wait could never complete
            Err(Error::Timeout(format!("fence {} never submitted", fence.0)))
        }
    }

    fn reset_fence(&self, fence: Fence) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("reset_fence({})", fence.0));
        let in_flight = state.fences.get(&fence.0).map(|f| f.in_flight).unwrap_or(false);
        if in_flight {
            state.violations.push(format!("reset_fence({}) while in flight", fence.0));
        }
        if let Some(entry) = state.fences.get_mut(&fence.0) {
            entry.signaled = false;
        }
        Ok(())
    }

    fn create_semaphore(&self) -> Result<Semaphore> {
        let mut state = self.state();
        let id = state.alloc("semaphore");
        state.calls.push(format!("create_semaphore({})", id));
        Ok(Semaphore(id))
    }

    fn destroy_semaphore(&self, semaphore: Semaphore) {
        let mut state = self.state();
        state.release(semaphore.0, "semaphore");
        state.calls.push(format!("destroy_semaphore({})", semaphore.0));
    }

    fn wait_idle(&self) -> Result<()> {
        let mut state = self.state();
        state.calls.push("wait_idle()".to_string());
        if state.fail_wait_idle {
            return Err(Error::BackendError("device lost".to_string()));
        }
        for fence in state.fences.values_mut() {
            if fence.in_flight {
                fence.in_flight = false;
                fence.signaled = true;
                fence.observed = true;
            }
        }
        Ok(())
    }

    // ===== COMMAND BUFFERS =====

    fn create_command_pool(&self) -> Result<CommandPool> {
        let mut state = self.state();
        let id = state.alloc("command_pool");
        state.calls.push(format!("create_command_pool({})", id));
        Ok(CommandPool(id))
    }

    fn destroy_command_pool(&self, pool: CommandPool) {
        let mut state = self.state();
        state.release(pool.0, "command_pool");
        state.calls.push(format!("destroy_command_pool({})", pool.0));
    }

    fn allocate_command_buffer(&self, pool: CommandPool) -> Result<CommandBuffer> {
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;
        state.calls.push(format!("allocate_command_buffer({}, {})", pool.0, id));
        Ok(CommandBuffer(id))
    }

    fn reset_command_buffer(&self, cmd: CommandBuffer) -> Result<()> {
        let mut state = self.state();
        state.check_command_buffer_reusable(cmd, "reset_command_buffer");
        state.calls.push(format!("reset_command_buffer({})", cmd.0));
        Ok(())
    }

    fn begin_command_buffer(&self, cmd: CommandBuffer) -> Result<()> {
        let mut state = self.state();
        state.check_command_buffer_reusable(cmd, "begin_command_buffer");
        state.calls.push(format!("begin_command_buffer({})", cmd.0));
        Ok(())
    }

    fn end_command_buffer(&self, cmd: CommandBuffer) -> Result<()> {
        self.record(format!("end_command_buffer({})", cmd.0));
        Ok(())
    }

    fn submit(&self, info: &SubmitInfo) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("submit({})", info.command_buffer.0));
        if let Some(fence) = info.fence {
            let signaled = state.fences.get(&fence.0).map(|f| f.signaled).unwrap_or(false);
            if signaled {
                state.violations.push(format!("submit with signaled fence {}", fence.0));
            }
            if let Some(entry) = state.fences.get_mut(&fence.0) {
                entry.in_flight = true;
                entry.observed = false;
            }
            state.command_buffer_fence.insert(info.command_buffer.0, fence.0);
        }
        state.submits.push(*info);
        Ok(())
    }

    // ===== SWAPCHAIN =====

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<SwapchainInfo> {
        let mut state = self.state();
        if state.fail_swapchain_creation {
            state.calls.push(format!("create_swapchain(failed, {}x{})", desc.width, desc.height));
            return Err(Error::BackendError("surface lost".to_string()));
        }
        if let Some(old) = desc.old_swapchain {
            if !state.live.contains_key(&old.0) {
                state.violations.push(format!("create_swapchain retiring dead swapchain {}", old.0));
            }
        }
        let handle = Swapchain(state.alloc("swapchain"));
        let mut images = Vec::new();
        let mut views = Vec::new();
        for _ in 0..state.swapchain_image_count {
            state.next_id += 1;
            images.push(Image(state.next_id));
            state.next_id += 1;
            views.push(ImageView(state.next_id));
        }
        state.calls.push(format!("create_swapchain({}, {}x{})", handle.0, desc.width, desc.height));
        Ok(SwapchainInfo {
            handle,
            format: desc.format,
            extent: Extent2D::new(desc.width, desc.height),
            images,
            views,
        })
    }

    fn destroy_swapchain(&self, swapchain: Swapchain) {
        let mut state = self.state();
        state.release(swapchain.0, "swapchain");
        state.calls.push(format!("destroy_swapchain({})", swapchain.0));
    }

    fn acquire_next_image(
        &self,
        swapchain: Swapchain,
        signal: Semaphore,
        timeout_ns: u64,
    ) -> Result<AcquireOutcome> {
        let mut state = self.state();
        state.calls.push(format!("acquire_next_image({}, {}, {})", swapchain.0, signal.0, timeout_ns));
        if let Some(scripted) = state.acquire_script.pop_front() {
            return scripted;
        }
        let index = state.acquire_counter % state.swapchain_image_count.max(1);
        state.acquire_counter += 1;
        Ok(AcquireOutcome::Acquired { index, suboptimal: false })
    }

    fn present(&self, swapchain: Swapchain, image_index: u32, wait: Semaphore) -> Result<PresentOutcome> {
        let mut state = self.state();
        state.calls.push(format!("present({}, {}, {})", swapchain.0, image_index, wait.0));
        if let Some(scripted) = state.present_script.pop_front() {
            return scripted;
        }
        state.presents += 1;
        Ok(PresentOutcome::Presented)
    }

    // ===== MEMORY RESOURCES =====

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Buffer> {
        let mut state = self.state();
        let id = state.alloc("buffer");
        state.buffers.insert(id, MockBuffer { desc: desc.clone(), data: vec![0; desc.size as usize] });
        state.calls.push(format!("create_buffer({}, {} bytes)", id, desc.size));
        Ok(Buffer(id))
    }

    fn destroy_buffer(&self, buffer: Buffer) {
        let mut state = self.state();
        state.release(buffer.0, "buffer");
        state.buffers.remove(&buffer.0);
        state.calls.push(format!("destroy_buffer({})", buffer.0));
    }

    fn write_buffer(&self, buffer: Buffer, offset: u64, data: &[u8]) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("write_buffer({}, {}, {} bytes)", buffer.0, offset, data.len()));
        let entry = state
            .buffers
            .get_mut(&buffer.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown buffer {}", buffer.0)))?;
        if entry.desc.location == MemoryLocation::GpuOnly {
            return Err(Error::InvalidResource(format!("buffer {} is not host visible", buffer.0)));
        }
        let start = offset as usize;
        let end = start + data.len();
        if end > entry.data.len() {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at {} overflows buffer {}", data.len(), offset, buffer.0
            )));
        }
        entry.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn buffer_device_address(&self, buffer: Buffer) -> u64 {
        0x1000_0000 + buffer.0 * 0x100
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<(Image, ImageView)> {
        let mut state = self.state();
        let image = state.alloc("image");
        state.next_id += 1;
        let view = state.next_id;
        state.images.insert(image, desc.clone());
        state.calls.push(format!(
            "create_image({}, {:?}, {}x{}, {} mips)",
            image, desc.format, desc.extent.width, desc.extent.height, desc.mip_levels
        ));
        Ok((Image(image), ImageView(view)))
    }

    fn destroy_image(&self, image: Image, view: ImageView) {
        let mut state = self.state();
        state.release(image.0, "image");
        state.images.remove(&image.0);
        state.calls.push(format!("destroy_image({}, {})", image.0, view.0));
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Sampler> {
        let mut state = self.state();
        let id = state.alloc("sampler");
        state.calls.push(format!("create_sampler({}, {:?})", id, desc.mag_filter));
        Ok(Sampler(id))
    }

    fn destroy_sampler(&self, sampler: Sampler) {
        let mut state = self.state();
        state.release(sampler.0, "sampler");
        state.calls.push(format!("destroy_sampler({})", sampler.0));
    }

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
        stages: ShaderStages,
    ) -> Result<DescriptorSetLayout> {
        let mut state = self.state();
        let id = state.alloc("descriptor_set_layout");
        state.calls.push(format!(
            "create_descriptor_set_layout({}, {} bindings, {:?})",
            id, bindings.len(), stages
        ));
        Ok(DescriptorSetLayout(id))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayout) {
        let mut state = self.state();
        state.release(layout.0, "descriptor_set_layout");
        state.calls.push(format!("destroy_descriptor_set_layout({})", layout.0));
    }

    fn create_descriptor_pool(&self, max_sets: u32, sizes: &[PoolSize]) -> Result<DescriptorPool> {
        let mut state = self.state();
        let id = state.alloc("descriptor_pool");
        state.pools.insert(id, MockPool { max_sets, allocated: 0 });
        state.created_pools.push(DescriptorPool(id));
        state.calls.push(format!("create_descriptor_pool({}, {} sets, {} sizes)", id, max_sets, sizes.len()));
        Ok(DescriptorPool(id))
    }

    fn reset_descriptor_pool(&self, pool: DescriptorPool) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("reset_descriptor_pool({})", pool.0));
        let entry = state
            .pools
            .get_mut(&pool.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown descriptor pool {}", pool.0)))?;
        entry.allocated = 0;
        Ok(())
    }

    fn destroy_descriptor_pool(&self, pool: DescriptorPool) {
        let mut state = self.state();
        state.release(pool.0, "descriptor_pool");
        state.pools.remove(&pool.0);
        state.destroyed_pools.push(pool);
        state.calls.push(format!("destroy_descriptor_pool({})", pool.0));
    }

    fn allocate_descriptor_set(
        &self,
        pool: DescriptorPool,
        layout: DescriptorSetLayout,
    ) -> Result<DescriptorSet> {
        let mut state = self.state();
        state.calls.push(format!("allocate_descriptor_set({}, {})", pool.0, layout.0));
        if !state.pools.contains_key(&pool.0) {
            return Err(Error::InvalidResource(format!("unknown descriptor pool {}", pool.0)));
        }
        if state.forced_exhaustions > 0 {
            state.forced_exhaustions -= 1;
            return Err(Error::PoolExhausted);
        }
        if let Some(entry) = state.pools.get_mut(&pool.0) {
            if entry.allocated >= entry.max_sets {
                return Err(Error::PoolExhausted);
            }
            entry.allocated += 1;
        }
        state.next_id += 1;
        Ok(DescriptorSet(state.next_id))
    }

    fn update_descriptor_set(&self, set: DescriptorSet, writes: &[DescriptorWrite]) {
        let mut state = self.state();
        state.descriptor_updates.push((set, writes.len()));
        state.calls.push(format!("update_descriptor_set({}, {} writes)", set.0, writes.len()));
    }

    // ===== SHADERS & PIPELINES =====

    fn create_shader_module(&self, code: &[u32]) -> Result<ShaderModule> {
        let mut state = self.state();
        let id = state.alloc("shader_module");
        state.calls.push(format!("create_shader_module({}, {} words)", id, code.len()));
        Ok(ShaderModule(id))
    }

    fn destroy_shader_module(&self, module: ShaderModule) {
        let mut state = self.state();
        state.release(module.0, "shader_module");
        state.calls.push(format!("destroy_shader_module({})", module.0));
    }

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDesc) -> Result<PipelineLayout> {
        let mut state = self.state();
        let id = state.alloc("pipeline_layout");
        state.calls.push(format!(
            "create_pipeline_layout({}, {} sets, {} push ranges)",
            id, desc.set_layouts.len(), desc.push_constants.len()
        ));
        Ok(PipelineLayout(id))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayout) {
        let mut state = self.state();
        state.release(layout.0, "pipeline_layout");
        state.calls.push(format!("destroy_pipeline_layout({})", layout.0));
    }

    fn create_compute_pipeline(&self, layout: PipelineLayout, shader: ShaderModule) -> Result<Pipeline> {
        let mut state = self.state();
        let id = state.alloc("pipeline");
        state.calls.push(format!("create_compute_pipeline({}, {}, {})", id, layout.0, shader.0));
        Ok(Pipeline(id))
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<Pipeline> {
        let mut state = self.state();
        let id = state.alloc("pipeline");
        state.calls.push(format!(
            "create_graphics_pipeline({}, {:?}, depth write {})",
            id, desc.blend, desc.depth.write_enable
        ));
        Ok(Pipeline(id))
    }

    fn destroy_pipeline(&self, pipeline: Pipeline) {
        let mut state = self.state();
        state.release(pipeline.0, "pipeline");
        state.calls.push(format!("destroy_pipeline({})", pipeline.0));
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
