//! Unit tests for the fixed descriptor allocator

use crate::descriptor::allocator::{pool_sizes, DescriptorAllocator};
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{
    DescriptorBinding, DescriptorSetLayout, DescriptorType, GraphicsDevice, PoolSizeRatio, ShaderStages,
};

fn storage_image_layout(device: &MockGraphicsDevice) -> DescriptorSetLayout {
    device
        .create_descriptor_set_layout(
            &[DescriptorBinding { binding: 0, ty: DescriptorType::StorageImage }],
            ShaderStages::COMPUTE,
        )
        .unwrap()
}

#[test]
fn test_pool_sizes_scale_ratios() {
    let sizes = pool_sizes(
        10,
        &[
            PoolSizeRatio { ty: DescriptorType::StorageImage, ratio: 1.0 },
            PoolSizeRatio { ty: DescriptorType::CombinedImageSampler, ratio: 0.25 },
        ],
    );
    assert_eq!(sizes[0].count, 10);
    assert_eq!(sizes[1].count, 2);
}

#[test]
fn test_allocate_until_exhausted_without_retry() {
    let device = MockGraphicsDevice::new();
    let layout = storage_image_layout(&device);
    let mut allocator = DescriptorAllocator::new();
    allocator
        .init_pool(&device, 2, &[PoolSizeRatio { ty: DescriptorType::StorageImage, ratio: 1.0 }])
        .unwrap();

    assert!(allocator.allocate(&device, layout).is_ok());
    assert!(allocator.allocate(&device, layout).is_ok());
    assert_eq!(allocator.allocate(&device, layout), Err(Error::PoolExhausted));
    // Still exactly one pool
    assert_eq!(device.state().created_pools.len(), 1);
}

#[test]
fn test_clear_descriptors_allows_reuse() {
    let device = MockGraphicsDevice::new();
    let layout = storage_image_layout(&device);
    let mut allocator = DescriptorAllocator::new();
    allocator.init_pool(&device, 1, &[]).unwrap();

    allocator.allocate(&device, layout).unwrap();
    allocator.clear_descriptors(&device).unwrap();
    assert!(allocator.allocate(&device, layout).is_ok());
}

#[test]
fn test_allocate_before_init_fails() {
    let device = MockGraphicsDevice::new();
    let layout = storage_image_layout(&device);
    let allocator = DescriptorAllocator::new();
    assert!(allocator.allocate(&device, layout).is_err());
}

#[test]
fn test_destroy_pool_once() {
    let device = MockGraphicsDevice::new();
    let mut allocator = DescriptorAllocator::new();
    allocator.init_pool(&device, 4, &[]).unwrap();
    allocator.destroy_pool(&device);
    allocator.destroy_pool(&device);
    assert_eq!(device.state().destroyed_pools.len(), 1);
    assert!(allocator.pool().is_none());
}
