//! Unit tests for the descriptor writer

use crate::descriptor::writer::DescriptorWriter;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{
    Buffer, DescriptorInfo, DescriptorSet, DescriptorType, ImageLayout, ImageView, Sampler,
};

#[test]
fn test_five_writes_one_update_call() {
    let device = MockGraphicsDevice::new();
    let mut writer = DescriptorWriter::new();
    writer
        .write_buffer(0, Buffer(10), 256, 0, DescriptorType::UniformBuffer)
        .write_buffer(1, Buffer(11), 64, 128, DescriptorType::StorageBuffer)
        .write_buffer(2, Buffer(12), 32, 0, DescriptorType::UniformBuffer)
        .write_image(3, ImageView(20), Sampler(30), ImageLayout::ShaderReadOnly, DescriptorType::CombinedImageSampler)
        .write_image(4, ImageView(21), Sampler::NULL, ImageLayout::General, DescriptorType::StorageImage);

    // Nothing reaches the device before the flush
    assert!(device.state().descriptor_updates.is_empty());

    writer.update_set(&device, DescriptorSet(99));

    let updates = device.state().descriptor_updates.clone();
    assert_eq!(updates, vec![(DescriptorSet(99), 5)]);
}

#[test]
fn test_write_contents_are_preserved() {
    let mut writer = DescriptorWriter::new();
    writer.write_buffer(0, Buffer(7), 256, 64, DescriptorType::UniformBuffer);
    writer.write_image(1, ImageView(8), Sampler(9), ImageLayout::ShaderReadOnly, DescriptorType::CombinedImageSampler);

    let pending = writer.pending();
    assert_eq!(pending.len(), 2);
    assert_eq!(
        pending[0].info,
        DescriptorInfo::Buffer { buffer: Buffer(7), offset: 64, range: 256 }
    );
    assert_eq!(pending[1].binding, 1);
    assert_eq!(pending[1].ty, DescriptorType::CombinedImageSampler);
}

#[test]
fn test_clear_discards_pending_writes() {
    let device = MockGraphicsDevice::new();
    let mut writer = DescriptorWriter::new();
    writer.write_buffer(0, Buffer(1), 16, 0, DescriptorType::UniformBuffer);
    writer.clear();
    writer.update_set(&device, DescriptorSet(5));
    assert_eq!(device.state().descriptor_updates.clone(), vec![(DescriptorSet(5), 0)]);
}
