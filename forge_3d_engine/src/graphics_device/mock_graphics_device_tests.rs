/// Unit tests for MockGraphicsDevice
///
/// The engine tests lean on the mock's fence and pool modelling, so that
/// modelling is pinned down here.

use crate::error::Error;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::*;

fn submit_info(cmd: CommandBuffer, fence: Fence) -> SubmitInfo {
    SubmitInfo { command_buffer: cmd, wait: None, signal: None, fence: Some(fence) }
}

// ============================================================================
// Fence modelling
// ============================================================================

#[test]
fn test_signaled_fence_wait_succeeds() {
    let device = MockGraphicsDevice::new();
    let fence = device.create_fence(true).unwrap();
    assert!(device.wait_for_fence(fence, 1).is_ok());
    assert!(device.fence_state(fence).unwrap().observed);
}

#[test]
fn test_submitted_fence_completes_on_wait() {
    let device = MockGraphicsDevice::new();
    let pool = device.create_command_pool().unwrap();
    let cmd = device.allocate_command_buffer(pool).unwrap();
    let fence = device.create_fence(false).unwrap();

    device.submit(&submit_info(cmd, fence)).unwrap();
    assert!(device.fence_state(fence).unwrap().in_flight);

    device.wait_for_fence(fence, 1).unwrap();
    let state = device.fence_state(fence).unwrap();
    assert!(state.signaled);
    assert!(!state.in_flight);
    assert!(device.violations().is_empty());
}

#[test]
fn test_stalled_fence_times_out() {
    let device = MockGraphicsDevice::new();
    let pool = device.create_command_pool().unwrap();
    let cmd = device.allocate_command_buffer(pool).unwrap();
    let fence = device.create_fence(false).unwrap();
    device.submit(&submit_info(cmd, fence)).unwrap();

    device.set_stall_fences(true);
    assert!(matches!(device.wait_for_fence(fence, 10), Err(Error::Timeout(_))));
}

#[test]
fn test_reusing_command_buffer_before_wait_is_a_violation() {
    let device = MockGraphicsDevice::new();
    let pool = device.create_command_pool().unwrap();
    let cmd = device.allocate_command_buffer(pool).unwrap();
    let fence = device.create_fence(false).unwrap();
    device.submit(&submit_info(cmd, fence)).unwrap();

    device.reset_command_buffer(cmd).unwrap();
    let violations = device.violations();
    assert_eq!(violations.len(), 1);
    assert!(violations[0].starts_with("reset_command_buffer"));
}

#[test]
fn test_reset_in_flight_fence_is_a_violation() {
    let device = MockGraphicsDevice::new();
    let pool = device.create_command_pool().unwrap();
    let cmd = device.allocate_command_buffer(pool).unwrap();
    let fence = device.create_fence(false).unwrap();
    device.submit(&submit_info(cmd, fence)).unwrap();
    device.reset_fence(fence).unwrap();
    assert_eq!(device.violations().len(), 1);
}

#[test]
fn test_wait_idle_completes_everything() {
    let device = MockGraphicsDevice::new();
    let pool = device.create_command_pool().unwrap();
    let cmd = device.allocate_command_buffer(pool).unwrap();
    let fence = device.create_fence(false).unwrap();
    device.submit(&submit_info(cmd, fence)).unwrap();
    device.wait_idle().unwrap();
    assert!(device.fence_state(fence).unwrap().signaled);

    device.set_fail_wait_idle(true);
    assert!(device.wait_idle().is_err());
}

// ============================================================================
// Descriptor pools
// ============================================================================

#[test]
fn test_descriptor_pool_capacity_and_reset() {
    let device = MockGraphicsDevice::new();
    let layout = device
        .create_descriptor_set_layout(&[DescriptorBinding { binding: 0, ty: DescriptorType::UniformBuffer }], ShaderStages::VERTEX)
        .unwrap();
    let pool = device.create_descriptor_pool(2, &[]).unwrap();

    assert!(device.allocate_descriptor_set(pool, layout).is_ok());
    assert!(device.allocate_descriptor_set(pool, layout).is_ok());
    assert_eq!(device.allocate_descriptor_set(pool, layout), Err(Error::PoolExhausted));

    device.reset_descriptor_pool(pool).unwrap();
    assert!(device.allocate_descriptor_set(pool, layout).is_ok());
}

#[test]
fn test_double_destroy_is_a_violation() {
    let device = MockGraphicsDevice::new();
    let pool = device.create_descriptor_pool(1, &[]).unwrap();
    device.destroy_descriptor_pool(pool);
    device.destroy_descriptor_pool(pool);
    assert_eq!(device.violations().len(), 1);
    assert_eq!(device.state().destroyed_pools.len(), 2);
}

// ============================================================================
// Buffers & swapchain
// ============================================================================

#[test]
fn test_write_buffer_requires_host_visible_memory() {
    let device = MockGraphicsDevice::new();
    let gpu = device
        .create_buffer(&BufferDesc { size: 16, usage: BufferUsage::STORAGE, location: MemoryLocation::GpuOnly })
        .unwrap();
    let host = device
        .create_buffer(&BufferDesc { size: 16, usage: BufferUsage::TRANSFER_SRC, location: MemoryLocation::CpuToGpu })
        .unwrap();

    assert!(device.write_buffer(gpu, 0, &[1, 2, 3, 4]).is_err());
    device.write_buffer(host, 4, &[1, 2, 3, 4]).unwrap();
    assert_eq!(&device.buffer_data(host)[4..8], &[1, 2, 3, 4]);
    assert!(device.write_buffer(host, 14, &[0; 4]).is_err());
}

#[test]
fn test_acquire_cycles_and_scripts() {
    let device = MockGraphicsDevice::new();
    let info = device
        .create_swapchain(&SwapchainDesc { width: 800, height: 600, format: Format::B8G8R8A8_UNORM, old_swapchain: None })
        .unwrap();
    assert_eq!(info.images.len(), 3);
    let semaphore = device.create_semaphore().unwrap();

    device.script_acquire(Ok(AcquireOutcome::OutOfDate));
    assert_eq!(device.acquire_next_image(info.handle, semaphore, 1).unwrap(), AcquireOutcome::OutOfDate);
    assert_eq!(
        device.acquire_next_image(info.handle, semaphore, 1).unwrap(),
        AcquireOutcome::Acquired { index: 0, suboptimal: false }
    );
    assert_eq!(
        device.acquire_next_image(info.handle, semaphore, 1).unwrap(),
        AcquireOutcome::Acquired { index: 1, suboptimal: false }
    );
}
