/// Forge3D Engine - owner of every render subsystem
///
/// `Engine` holds the device, the swapchain, the frame ring and all long-lived
/// GPU objects. Everything is mutated through `&mut self`: there is no global
/// engine instance, the window loop receives the engine explicitly and asks
/// for swapchain rebuilds with `request_resize`.
///
/// Teardown order matters: the device is drained first, then loaded scenes,
/// then the frame slots (with their deletion queues), then the main deletion
/// queue, and the swapchain last.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::deletion_queue::DeletionQueue;
use crate::descriptor::{DescriptorAllocatorGrowable, DescriptorLayoutBuilder, DescriptorWriter};
use crate::error::Result;
use crate::frame::FrameRing;
use crate::graphics_device::{
    BlitRegion, CommandBuffer, DescriptorSet, DescriptorType, Extent2D, Extent3D, Filter, Format,
    GraphicsDevice, ImageBarrier, ImageLayout, ImageUsage, ImageView, PoolSizeRatio, Sampler,
    SamplerDesc, ShaderStages, SubmitInfo, WaitStage,
};
use crate::material::{GltfMetallicRoughness, MaterialPipelineDesc};
use crate::renderer::{
    scene_projection, BackgroundEffects, EngineStats, GeometryPass, GeometryTargets, GpuSceneData,
};
use crate::resource::{AllocatedImage, ResourceManager};
use crate::scene::{DrawContext, LoadedScene, LoadedSceneBuilder};
use crate::swapchain::SwapchainManager;
use crate::window::{InputState, WindowSource};
use crate::{engine_debug, engine_err, engine_error, engine_info};

/// Format of the offscreen color target
pub const DRAW_IMAGE_FORMAT: Format = Format::R16G16B16A16_SFLOAT;

/// Format of the depth target
pub const DEPTH_IMAGE_FORMAT: Format = Format::D32_SFLOAT;

/// Descriptor mix of the engine-global allocator (draw image storage binding)
pub const GLOBAL_POOL_RATIOS: [PoolSizeRatio; 1] = [
    PoolSizeRatio { ty: DescriptorType::StorageImage, ratio: 1.0 },
];

const MINIMIZED_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of one `draw` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was submitted and presented
    Presented,
    /// Nothing was presented; the swapchain is out of date and a resize is pending
    Skipped,
}

/// Called once per `frame` before drawing, with the seconds since the previous frame
pub type UpdateHook = Box<dyn FnMut(&mut Engine, f32)>;

/// Records extra work (a debug overlay) into the swapchain image
///
/// Receives the frame's command buffer, the swapchain image view (in
/// `ColorAttachment` layout) and the swapchain extent.
pub type OverlayHook = Box<dyn FnMut(&dyn GraphicsDevice, CommandBuffer, ImageView, Extent2D)>;

/// Images and samplers scene loaders fall back to
#[derive(Debug, Clone, Copy)]
pub struct DefaultResources {
    pub white_image: AllocatedImage,
    pub grey_image: AllocatedImage,
    pub black_image: AllocatedImage,
    /// Magenta / black 16x16 checkerboard for missing textures
    pub error_checkerboard_image: AllocatedImage,
    pub sampler_nearest: Sampler,
    pub sampler_linear: Sampler,
}

impl DefaultResources {
    const WHITE: u32 = 0xFFFF_FFFF;
    const GREY: u32 = 0xAAAA_AAFF;
    const BLACK: u32 = 0xFF00_0000;
    const MAGENTA: u32 = 0xFFFF_00FF;
    const CHECKERBOARD_SIZE: u32 = 16;

    /// Create the default data, queuing each object's release on `queue`
    fn create(device: &dyn GraphicsDevice, resources: &ResourceManager, queue: &mut DeletionQueue) -> Result<Self> {
        let mut pixel_image = |pixels: &[u32], size: u32| -> Result<AllocatedImage> {
            let image = resources.create_image_with_data(
                device,
                bytemuck::cast_slice(pixels),
                Extent3D::new(size, size, 1),
                Format::R8G8B8A8_UNORM,
                ImageUsage::SAMPLED,
                false,
            )?;
            queue.push(move |device| device.destroy_image(image.image, image.view));
            Ok(image)
        };

        let white_image = pixel_image(&[Self::WHITE], 1)?;
        let grey_image = pixel_image(&[Self::GREY], 1)?;
        let black_image = pixel_image(&[Self::BLACK], 1)?;
        let error_checkerboard_image = pixel_image(&Self::checkerboard(), Self::CHECKERBOARD_SIZE)?;

        let sampler_nearest = device.create_sampler(&SamplerDesc {
            mag_filter: Filter::Nearest,
            min_filter: Filter::Nearest,
        })?;
        queue.push(move |device| device.destroy_sampler(sampler_nearest));
        let sampler_linear = device.create_sampler(&SamplerDesc {
            mag_filter: Filter::Linear,
            min_filter: Filter::Linear,
        })?;
        queue.push(move |device| device.destroy_sampler(sampler_linear));

        Ok(Self {
            white_image,
            grey_image,
            black_image,
            error_checkerboard_image,
            sampler_nearest,
            sampler_linear,
        })
    }

    fn checkerboard() -> Vec<u32> {
        let size = Self::CHECKERBOARD_SIZE;
        (0..size * size)
            .map(|i| {
                let (x, y) = (i % size, i / size);
                if (x % 2) ^ (y % 2) == 1 { Self::MAGENTA } else { Self::BLACK }
            })
            .collect()
    }
}

/// Long-lived GPU state built by `Engine::init`
///
/// Every object in here has its release queued on the main deletion queue.
struct RenderState {
    resources: ResourceManager,
    draw_image: AllocatedImage,
    depth_image: AllocatedImage,
    draw_image_set: DescriptorSet,
    geometry: GeometryPass,
    background: BackgroundEffects,
    metal_rough: GltfMetallicRoughness,
    defaults: DefaultResources,
}

impl RenderState {
    fn new(device: &dyn GraphicsDevice, config: &EngineConfig, queue: &mut DeletionQueue) -> Result<Self> {
        let resources = ResourceManager::new(device, config.immediate_timeout_ns)?;
        queue.push(move |device| resources.destroy(device));

        // ----- Offscreen targets -----
        let target_extent = Extent3D::new(config.draw_image_width, config.draw_image_height, 1);
        let draw_image = resources.create_image(
            device,
            target_extent,
            DRAW_IMAGE_FORMAT,
            ImageUsage::TRANSFER_SRC | ImageUsage::TRANSFER_DST | ImageUsage::STORAGE | ImageUsage::COLOR_ATTACHMENT,
            false,
        )?;
        queue.push(move |device| device.destroy_image(draw_image.image, draw_image.view));
        let depth_image = resources.create_image(
            device,
            target_extent,
            DEPTH_IMAGE_FORMAT,
            ImageUsage::DEPTH_STENCIL_ATTACHMENT,
            false,
        )?;
        queue.push(move |device| device.destroy_image(depth_image.image, depth_image.view));

        // ----- Descriptors -----
        let draw_image_layout = DescriptorLayoutBuilder::new()
            .add_binding(0, DescriptorType::StorageImage)
            .build(device, ShaderStages::COMPUTE)?;
        queue.push(move |device| device.destroy_descriptor_set_layout(draw_image_layout));

        let mut global_descriptors = DescriptorAllocatorGrowable::new();
        global_descriptors.init(device, config.global_descriptor_sets, &GLOBAL_POOL_RATIOS)?;
        let draw_image_set = global_descriptors.allocate(device, draw_image_layout);
        queue.push(move |device| global_descriptors.destroy_pools(device));
        let draw_image_set = draw_image_set?;
        DescriptorWriter::new()
            .write_image(0, draw_image.view, Sampler::NULL, ImageLayout::General, DescriptorType::StorageImage)
            .update_set(device, draw_image_set);

        let geometry = GeometryPass::new(device, config.sort_opaque_draws)?;
        queue.push(move |device| geometry.destroy(device));

        // ----- Pipelines -----
        let background = BackgroundEffects::new(device, config, draw_image_layout)?;
        let queued_background = background.clone();
        queue.push(move |device| queued_background.destroy(device));

        let metal_rough = GltfMetallicRoughness::build_pipelines(
            device,
            &MaterialPipelineDesc::metallic_roughness(
                config,
                geometry.scene_layout(),
                draw_image.format,
                depth_image.format,
            ),
        )?;
        queue.push(move |device| metal_rough.clear_resources(device));

        let defaults = DefaultResources::create(device, &resources, queue)?;

        Ok(Self {
            resources,
            draw_image,
            depth_image,
            draw_image_set,
            geometry,
            background,
            metal_rough,
            defaults,
        })
    }
}

pub struct Engine {
    device: Arc<dyn GraphicsDevice>,
    config: EngineConfig,
    window_extent: Extent2D,
    draw_extent: Extent2D,
    render_scale: f32,
    swapchain: SwapchainManager,
    frames: FrameRing,
    state: RenderState,
    main_deletion_queue: DeletionQueue,
    loaded_scenes: FxHashMap<String, LoadedScene>,
    draw_context: DrawContext,
    scene_data: GpuSceneData,
    camera: Camera,
    stats: EngineStats,
    update_hook: Option<UpdateHook>,
    overlay_hook: Option<OverlayHook>,
    last_frame: Instant,
    frame_delta: f32,
    shut_down: bool,
}

impl Engine {
    /// Build every subsystem on `device`
    ///
    /// On failure, everything created so far is released before the error
    /// is returned.
    pub fn init(device: Arc<dyn GraphicsDevice>, config: EngineConfig) -> Result<Self> {
        engine_info!(
            "forge3d::Engine",
            "Initializing '{}' ({}x{})",
            config.app_name, config.width, config.height
        );
        let d: &dyn GraphicsDevice = &*device;

        let swapchain = SwapchainManager::new(d, config.width, config.height)?;
        let mut frames = match FrameRing::new(d, config.frame_descriptor_sets) {
            Ok(frames) => frames,
            Err(e) => {
                engine_error!("forge3d::Engine", "Frame ring creation failed: {}", e);
                swapchain.destroy(d);
                return Err(e);
            }
        };

        let mut main_deletion_queue = DeletionQueue::new();
        let state = match RenderState::new(d, &config, &mut main_deletion_queue) {
            Ok(state) => state,
            Err(e) => {
                engine_error!("forge3d::Engine", "Initialization failed: {}", e);
                main_deletion_queue.flush(d);
                frames.destroy(d);
                swapchain.destroy(d);
                return Err(e);
            }
        };

        let render_scale = config.clamped_render_scale();
        let window_extent = Extent2D::new(config.width, config.height);
        engine_info!("forge3d::Engine", "Engine initialized");

        Ok(Self {
            device,
            config,
            window_extent,
            draw_extent: Extent2D::default(),
            render_scale,
            swapchain,
            frames,
            state,
            main_deletion_queue,
            loaded_scenes: FxHashMap::default(),
            draw_context: DrawContext::new(),
            scene_data: GpuSceneData::default(),
            camera: Camera::new(Vec3::new(0.0, 0.0, 1.0)),
            stats: EngineStats::default(),
            update_hook: None,
            overlay_hook: None,
            last_frame: Instant::now(),
            frame_delta: 0.0,
            shut_down: false,
        })
    }

    // ===== ACCESSORS =====

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.state.resources
    }

    pub fn default_resources(&self) -> &DefaultResources {
        &self.state.defaults
    }

    /// Pipelines every scene material is written against
    pub fn metallic_roughness(&self) -> &GltfMetallicRoughness {
        &self.state.metal_rough
    }

    pub fn background(&self) -> &BackgroundEffects {
        &self.state.background
    }

    pub fn background_mut(&mut self) -> &mut BackgroundEffects {
        &mut self.state.background
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Lighting part of the scene data (matrices are rewritten every frame)
    pub fn scene_data_mut(&mut self) -> &mut GpuSceneData {
        &mut self.scene_data
    }

    pub fn scene_data(&self) -> &GpuSceneData {
        &self.scene_data
    }

    pub fn draw_context(&self) -> &DrawContext {
        &self.draw_context
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Frames submitted and presented so far
    pub fn frame_count(&self) -> u64 {
        self.frames.frame_count()
    }

    pub fn frames(&self) -> &FrameRing {
        &self.frames
    }

    pub fn swapchain(&self) -> &SwapchainManager {
        &self.swapchain
    }

    /// Region of the draw image rendered by the last frame
    pub fn draw_extent(&self) -> Extent2D {
        self.draw_extent
    }

    pub fn window_extent(&self) -> Extent2D {
        self.window_extent
    }

    pub fn render_scale(&self) -> f32 {
        self.render_scale
    }

    /// Set the draw extent scale, clamped to 0.3..=1.0
    pub fn set_render_scale(&mut self, scale: f32) {
        self.render_scale = scale.clamp(0.3, 1.0);
    }

    pub fn set_update_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&mut Engine, f32) + 'static,
    {
        self.update_hook = Some(Box::new(hook));
    }

    pub fn set_overlay_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&dyn GraphicsDevice, CommandBuffer, ImageView, Extent2D) + 'static,
    {
        self.overlay_hook = Some(Box::new(hook));
    }

    // ===== SCENES =====

    /// Start building a scene on this engine's device
    pub fn scene_builder(&self, name: &str, material_capacity: u32) -> Result<LoadedSceneBuilder> {
        LoadedSceneBuilder::new(&*self.device, &self.state.resources, name, material_capacity)
    }

    /// Make `scene` part of every following frame
    ///
    /// A scene already loaded under the same name is replaced and destroyed
    /// once the device is idle.
    pub fn load_scene(&mut self, scene: LoadedScene) -> Result<()> {
        engine_info!("forge3d::Engine", "Loading scene '{}' ({} meshes)", scene.name, scene.mesh_count());
        if let Some(previous) = self.loaded_scenes.insert(scene.name.clone(), scene) {
            self.device.wait_idle()?;
            previous.destroy(&*self.device, &self.state.resources);
        }
        Ok(())
    }

    /// Destroy the scene named `name`; returns whether it was loaded
    pub fn unload_scene(&mut self, name: &str) -> Result<bool> {
        let Some(scene) = self.loaded_scenes.remove(name) else {
            return Ok(false);
        };
        self.device.wait_idle()?;
        scene.destroy(&*self.device, &self.state.resources);
        Ok(true)
    }

    pub fn loaded_scene(&self, name: &str) -> Option<&LoadedScene> {
        self.loaded_scenes.get(name)
    }

    pub fn loaded_scene_mut(&mut self, name: &str) -> Option<&mut LoadedScene> {
        self.loaded_scenes.get_mut(name)
    }

    pub fn loaded_scene_count(&self) -> usize {
        self.loaded_scenes.len()
    }

    // ===== SWAPCHAIN =====

    /// Ask for a swapchain rebuild at the start of the next frame
    pub fn request_resize(&mut self) {
        self.swapchain.request_resize();
    }

    pub fn resize_requested(&self) -> bool {
        self.swapchain.resize_requested()
    }

    /// Record the window's framebuffer size, requesting a resize when it changed
    pub fn set_window_extent(&mut self, width: u32, height: u32) {
        let extent = Extent2D::new(width, height);
        if extent != self.window_extent {
            self.window_extent = extent;
            self.swapchain.request_resize();
        }
    }

    /// Rebuild the swapchain at the current window size once the device is idle
    pub fn resize_swapchain(&mut self) -> Result<()> {
        let Extent2D { width, height } = self.window_extent;
        self.swapchain.resize(&*self.device, width, height)?;
        engine_debug!("forge3d::Engine", "Swapchain rebuilt for a {}x{} window", width, height);
        Ok(())
    }

    // ===== FRAME LOOP =====

    /// Pump `window` and draw until it is closed or escape is pressed
    ///
    /// # Errors
    ///
    /// The first fatal frame failure.
    pub fn run(&mut self, window: &mut dyn WindowSource) -> Result<()> {
        engine_info!("forge3d::Engine", "Entering frame loop");
        loop {
            let input = window.poll_input();
            if input.wants_exit() || window.should_close() {
                break;
            }

            let (width, height) = window.framebuffer_size();
            self.set_window_extent(width, height);
            if window.is_minimized() {
                std::thread::sleep(MINIMIZED_POLL_INTERVAL);
                continue;
            }

            self.frame(&input)?;
        }
        engine_info!("forge3d::Engine", "Frame loop left after {} frames", self.frame_count());
        Ok(())
    }

    /// One iteration of the frame loop: input, pending resize, update hook, draw
    pub fn frame(&mut self, input: &InputState) -> Result<FrameOutcome> {
        let start = Instant::now();
        self.frame_delta = start.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = start;

        if input.resized {
            self.request_resize();
        }
        self.camera.process_input(input);

        if self.swapchain.resize_requested() {
            self.resize_swapchain()?;
        }

        if let Some(mut hook) = self.update_hook.take() {
            let delta = self.frame_delta;
            hook(self, delta);
            // The hook may have installed a replacement for itself
            if self.update_hook.is_none() {
                self.update_hook = Some(hook);
            }
        }

        let outcome = self.draw()?;
        self.stats.frame_time_ms = start.elapsed().as_secs_f32() * 1000.0;
        Ok(outcome)
    }

    /// Walk the loaded scenes into the draw context and refresh the scene data
    fn update_scene(&mut self) {
        let start = Instant::now();

        self.camera.update(self.frame_delta);
        let Extent2D { width, height } = self.window_extent;
        let aspect_ratio = width.max(1) as f32 / height.max(1) as f32;
        self.scene_data.view = self.camera.view_matrix();
        self.scene_data.proj = scene_projection(aspect_ratio);
        self.scene_data.viewproj = self.scene_data.proj * self.scene_data.view;

        self.state.background.update_window_params(width, height, self.render_scale);

        self.draw_context.clear();
        for scene in self.loaded_scenes.values() {
            scene.draw(&scene.transform, &mut self.draw_context);
        }

        self.stats.scene_update_time_ms = start.elapsed().as_secs_f32() * 1000.0;
    }

    /// Record, submit and present one frame
    ///
    /// Returns `FrameOutcome::Skipped` when the swapchain turned out to be out
    /// of date; the resize flag is set and the frame counter does not move.
    ///
    /// # Errors
    ///
    /// Fence timeouts and any recording, submission or unexpected presentation
    /// failure. These are fatal for the frame loop.
    pub fn draw(&mut self) -> Result<FrameOutcome> {
        self.update_scene();

        let device = Arc::clone(&self.device);
        let d: &dyn GraphicsDevice = &*device;
        let frame = self.frames.current_mut();

        frame.begin(d, self.config.fence_timeout_ns)?;

        let Some(image_index) = self.swapchain.acquire(d, frame.swapchain_semaphore, self.config.acquire_timeout_ns)?
        else {
            return Ok(FrameOutcome::Skipped);
        };
        let (Some(swapchain_image), Some(swapchain_view)) =
            (self.swapchain.image(image_index), self.swapchain.view(image_index))
        else {
            return Err(engine_err!("forge3d::Engine", "Acquired swapchain image {} does not exist", image_index));
        };
        let swapchain_extent = self.swapchain.extent();

        let draw_image = self.state.draw_image;
        let depth_image = self.state.depth_image;
        let available = swapchain_extent.min(draw_image.extent.to_2d());
        self.draw_extent = Extent2D::new(
            (available.width as f32 * self.render_scale) as u32,
            (available.height as f32 * self.render_scale) as u32,
        );

        // Only reset once work is certain to be submitted with this fence
        d.reset_fence(frame.render_fence)?;

        let cmd = frame.command_buffer;
        d.reset_command_buffer(cmd)?;
        d.begin_command_buffer(cmd)?;

        d.cmd_transition_image(cmd, &ImageBarrier::whole(draw_image.image, ImageLayout::Undefined, ImageLayout::General));
        self.state.background.record(d, cmd, self.state.draw_image_set, self.draw_extent);

        d.cmd_transition_image(
            cmd,
            &ImageBarrier::whole(draw_image.image, ImageLayout::General, ImageLayout::ColorAttachment),
        );
        d.cmd_transition_image(
            cmd,
            &ImageBarrier::whole(depth_image.image, ImageLayout::Undefined, ImageLayout::DepthAttachment),
        );
        self.state.geometry.record(
            d,
            cmd,
            frame,
            &GeometryTargets {
                color_view: draw_image.view,
                depth_view: depth_image.view,
                extent: self.draw_extent,
            },
            &self.draw_context,
            &self.scene_data,
            &mut self.stats,
        )?;

        d.cmd_transition_image(
            cmd,
            &ImageBarrier::whole(draw_image.image, ImageLayout::ColorAttachment, ImageLayout::TransferSrc),
        );
        d.cmd_transition_image(
            cmd,
            &ImageBarrier::whole(swapchain_image, ImageLayout::Undefined, ImageLayout::TransferDst),
        );
        d.cmd_blit_image(
            cmd,
            &BlitRegion {
                src: draw_image.image,
                src_mip: 0,
                src_extent: self.draw_extent,
                dst: swapchain_image,
                dst_mip: 0,
                dst_extent: swapchain_extent,
            },
        );

        d.cmd_transition_image(
            cmd,
            &ImageBarrier::whole(swapchain_image, ImageLayout::TransferDst, ImageLayout::ColorAttachment),
        );
        if let Some(overlay) = self.overlay_hook.as_mut() {
            overlay(d, cmd, swapchain_view, swapchain_extent);
        }
        d.cmd_transition_image(
            cmd,
            &ImageBarrier::whole(swapchain_image, ImageLayout::ColorAttachment, ImageLayout::PresentSrc),
        );

        d.end_command_buffer(cmd)?;

        d.submit(&SubmitInfo {
            command_buffer: cmd,
            wait: Some((frame.swapchain_semaphore, WaitStage::ColorAttachmentOutput)),
            signal: Some(frame.render_semaphore),
            fence: Some(frame.render_fence),
        })?;

        let render_semaphore = frame.render_semaphore;
        if !self.swapchain.present(d, image_index, render_semaphore)? {
            return Ok(FrameOutcome::Skipped);
        }

        self.frames.advance();
        Ok(FrameOutcome::Presented)
    }

    // ===== SHUTDOWN =====

    /// Release every GPU object; the engine is unusable afterwards
    ///
    /// Aborts the process if the device cannot be drained, since nothing can
    /// be released safely while the GPU may still use it.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        let device = Arc::clone(&self.device);
        let d: &dyn GraphicsDevice = &*device;
        if let Err(e) = d.wait_idle() {
            engine_error!("forge3d::Engine", "Failed to wait for device idle during shutdown: {}", e);
            std::process::abort();
        }

        for (_, scene) in self.loaded_scenes.drain() {
            scene.destroy(d, &self.state.resources);
        }
        self.frames.destroy(d);
        self.main_deletion_queue.flush(d);
        self.swapchain.destroy(d);

        engine_info!("forge3d::Engine", "Engine shut down after {} frames", self.frames.frame_count());
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
