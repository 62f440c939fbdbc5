/// Batched descriptor writes
///
/// Writes are queued by value and applied to a set in a single
/// `update_descriptor_set` call. Queued writes survive the update until
/// `clear`, so one writer can stamp the same bindings onto several sets.

use crate::graphics_device::{
    Buffer, DescriptorInfo, DescriptorSet, DescriptorType, DescriptorWrite, GraphicsDevice,
    ImageLayout, ImageView, Sampler,
};

#[derive(Debug, Default, Clone)]
pub struct DescriptorWriter {
    writes: Vec<DescriptorWrite>,
}

impl DescriptorWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an image binding (sampler may be `Sampler::NULL` for storage images)
    pub fn write_image(
        &mut self,
        binding: u32,
        view: ImageView,
        sampler: Sampler,
        layout: ImageLayout,
        ty: DescriptorType,
    ) -> &mut Self {
        self.writes.push(DescriptorWrite {
            binding,
            ty,
            info: DescriptorInfo::Image { view, sampler, layout },
        });
        self
    }

    /// Queue a buffer binding of `size` bytes starting at `offset`
    pub fn write_buffer(
        &mut self,
        binding: u32,
        buffer: Buffer,
        size: u64,
        offset: u64,
        ty: DescriptorType,
    ) -> &mut Self {
        self.writes.push(DescriptorWrite {
            binding,
            ty,
            info: DescriptorInfo::Buffer { buffer, offset, range: size },
        });
        self
    }

    pub fn clear(&mut self) {
        self.writes.clear();
    }

    pub fn pending(&self) -> &[DescriptorWrite] {
        &self.writes
    }

    /// Apply every queued write to `set` in one device call
    pub fn update_set(&self, device: &dyn GraphicsDevice, set: DescriptorSet) {
        device.update_descriptor_set(set, &self.writes);
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
