/// Opaque GPU object handles
///
/// Every handle is a plain `u64` newtype. Backends map them onto their native
/// objects (the Vulkan backend stores the raw `vk::Handle` value), the mock
/// device hands out increasing ids. `NULL` (0) never names a live object.

macro_rules! define_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
            pub struct $name(pub u64);

            impl $name {
                /// The null handle
                pub const NULL: Self = Self(0);

                /// Raw backend value
                pub fn raw(self) -> u64 {
                    self.0
                }

                pub fn is_null(self) -> bool {
                    self.0 == 0
                }
            }
        )*
    };
}

define_handle!(
    /// GPU to CPU completion signal
    Fence,
    /// GPU to GPU ordering signal
    Semaphore,
    CommandPool,
    CommandBuffer,
    Buffer,
    Image,
    ImageView,
    Sampler,
    DescriptorSetLayout,
    DescriptorPool,
    DescriptorSet,
    ShaderModule,
    PipelineLayout,
    Pipeline,
    /// Presentation engine image chain
    Swapchain,
);
