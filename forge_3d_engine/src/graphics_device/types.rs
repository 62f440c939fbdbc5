/// Backend-neutral descriptions shared by the device traits

use bitflags::bitflags;
use crate::graphics_device::{
    Buffer, CommandBuffer, DescriptorSetLayout, Fence, Image, ImageView,
    PipelineLayout, Sampler, Semaphore, ShaderModule, Swapchain,
};

// ===== EXTENTS & FORMATS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Component-wise minimum
    pub fn min(self, other: Extent2D) -> Extent2D {
        Extent2D::new(self.width.min(other.width), self.height.min(other.height))
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3D {
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        Self { width, height, depth }
    }

    pub fn to_2d(self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }
}

/// Image formats used by the engine
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    R8G8B8A8_UNORM,
    B8G8R8A8_UNORM,
    R16G16B16A16_SFLOAT,
    D32_SFLOAT,
}

impl Format {
    pub fn is_depth(self) -> bool {
        matches!(self, Format::D32_SFLOAT)
    }

    /// Size of one texel in bytes
    pub fn texel_size(self) -> u64 {
        match self {
            Format::R8G8B8A8_UNORM | Format::B8G8R8A8_UNORM | Format::D32_SFLOAT => 4,
            Format::R16G16B16A16_SFLOAT => 8,
        }
    }
}

/// Image layouts the engine transitions between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    General,
    ColorAttachment,
    DepthAttachment,
    TransferSrc,
    TransferDst,
    ShaderReadOnly,
    PresentSrc,
}

// ===== USAGE FLAGS =====

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const TRANSFER_SRC = 1 << 0;
        const TRANSFER_DST = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
        const INDEX = 1 << 4;
        const VERTEX = 1 << 5;
        /// Buffer can be addressed from shaders (vertex pulling)
        const DEVICE_ADDRESS = 1 << 6;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const TRANSFER_SRC = 1 << 0;
        const TRANSFER_DST = 1 << 1;
        const SAMPLED = 1 << 2;
        const STORAGE = 1 << 3;
        const COLOR_ATTACHMENT = 1 << 4;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

/// Where an allocation lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    GpuOnly,
    CpuToGpu,
    GpuToCpu,
}

// ===== RESOURCE DESCRIPTIONS =====

#[derive(Debug, Clone, PartialEq)]
pub struct BufferDesc {
    pub size: u64,
    pub usage: BufferUsage,
    pub location: MemoryLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageDesc {
    pub format: Format,
    pub extent: Extent3D,
    pub usage: ImageUsage,
    pub mip_levels: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub mag_filter: Filter,
    pub min_filter: Filter,
}

// ===== DESCRIPTORS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformBuffer,
    StorageBuffer,
}

/// Relative share of one descriptor type inside a pool
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolSizeRatio {
    pub ty: DescriptorType,
    pub ratio: f32,
}

/// Absolute descriptor count of one type inside a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSize {
    pub ty: DescriptorType,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorBinding {
    pub binding: u32,
    pub ty: DescriptorType,
}

/// Resource referenced by one descriptor write
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DescriptorInfo {
    Buffer { buffer: Buffer, offset: u64, range: u64 },
    Image { view: ImageView, sampler: Sampler, layout: ImageLayout },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptorWrite {
    pub binding: u32,
    pub ty: DescriptorType,
    pub info: DescriptorInfo,
}

// ===== PIPELINES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    pub stages: ShaderStages,
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineBindPoint {
    Graphics,
    Compute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    TriangleList,
    LineList,
    PointList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Fill,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Always,
}

/// Color attachment blending presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Disabled,
    /// src * src_alpha + dst
    Additive,
    /// src * src_alpha + dst * (1 - src_alpha)
    AlphaBlend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub test_enable: bool,
    pub write_enable: bool,
    pub compare_op: CompareOp,
}

impl DepthState {
    pub const DISABLED: Self = Self {
        test_enable: false,
        write_enable: false,
        compare_op: CompareOp::Never,
    };
}

/// Complete description of a dynamic-rendering graphics pipeline
///
/// Viewport and scissor are always dynamic state.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsPipelineDesc {
    pub layout: PipelineLayout,
    pub vertex_shader: ShaderModule,
    pub fragment_shader: ShaderModule,
    pub topology: PrimitiveTopology,
    pub polygon_mode: PolygonMode,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub blend: BlendMode,
    pub depth: DepthState,
    pub color_format: Format,
    pub depth_format: Option<Format>,
}

// ===== COMMANDS =====

/// Layout transition of an image (or a mip range of it)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBarrier {
    pub image: Image,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub base_mip: u32,
    /// `None` means every remaining level
    pub mip_count: Option<u32>,
}

impl ImageBarrier {
    /// Transition of the whole image
    pub fn whole(image: Image, old_layout: ImageLayout, new_layout: ImageLayout) -> Self {
        Self { image, old_layout, new_layout, base_mip: 0, mip_count: None }
    }

    /// Transition of a single mip level
    pub fn level(image: Image, mip: u32, old_layout: ImageLayout, new_layout: ImageLayout) -> Self {
        Self { image, old_layout, new_layout, base_mip: mip, mip_count: Some(1) }
    }
}

/// Scaled copy between two image regions (source in TransferSrc, destination in TransferDst)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitRegion {
    pub src: Image,
    pub src_mip: u32,
    pub src_extent: Extent2D,
    pub dst: Image,
    pub dst_mip: u32,
    pub dst_extent: Extent2D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCopy {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

/// Dynamic rendering attachments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderingInfo {
    pub color_view: ImageView,
    /// `None` keeps the previous contents (load)
    pub clear_color: Option<[f32; 4]>,
    pub depth_view: Option<ImageView>,
    pub extent: Extent2D,
}

/// Pipeline stage a submission waits at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitStage {
    ColorAttachmentOutput,
    AllCommands,
}

/// One queue submission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubmitInfo {
    pub command_buffer: CommandBuffer,
    pub wait: Option<(Semaphore, WaitStage)>,
    pub signal: Option<Semaphore>,
    pub fence: Option<Fence>,
}

// ===== SWAPCHAIN =====

#[derive(Debug, Clone, PartialEq)]
pub struct SwapchainDesc {
    pub width: u32,
    pub height: u32,
    pub format: Format,
    /// Swapchain being replaced (resize path)
    pub old_swapchain: Option<Swapchain>,
}

/// Result of swapchain creation
#[derive(Debug, Clone, PartialEq)]
pub struct SwapchainInfo {
    pub handle: Swapchain,
    pub format: Format,
    pub extent: Extent2D,
    pub images: Vec<Image>,
    pub views: Vec<ImageView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired { index: u32, suboptimal: bool },
    OutOfDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    OutOfDate,
}

/// Layout handed to pipeline-layout creation
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineLayoutDesc {
    pub set_layouts: Vec<DescriptorSetLayout>,
    pub push_constants: Vec<PushConstantRange>,
}
