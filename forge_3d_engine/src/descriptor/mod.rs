/// Descriptor set layouts, pools and writes

pub mod layout_builder;
pub mod allocator;
pub mod growable_allocator;
pub mod writer;

pub use layout_builder::DescriptorLayoutBuilder;
pub use allocator::{pool_sizes, DescriptorAllocator};
pub use growable_allocator::DescriptorAllocatorGrowable;
pub use writer::DescriptorWriter;
