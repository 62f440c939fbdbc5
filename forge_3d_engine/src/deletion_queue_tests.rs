//! Unit tests for deletion_queue.rs

use crate::deletion_queue::DeletionQueue;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{BufferDesc, BufferUsage, GraphicsDevice, MemoryLocation};
use std::sync::{Arc, Mutex};

#[test]
fn test_flush_runs_in_reverse_order() {
    let device = MockGraphicsDevice::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut queue = DeletionQueue::new();

    for i in 0..16 {
        let order = Arc::clone(&order);
        queue.push(move |_| order.lock().unwrap().push(i));
    }
    assert_eq!(queue.len(), 16);

    queue.flush(&device);

    let expected: Vec<i32> = (0..16).rev().collect();
    assert_eq!(*order.lock().unwrap(), expected);
    assert!(queue.is_empty());
}

#[test]
fn test_flush_of_empty_queue_is_noop() {
    let device = MockGraphicsDevice::new();
    let mut queue = DeletionQueue::new();
    queue.flush(&device);
    assert!(device.calls().is_empty());
}

#[test]
fn test_second_flush_does_not_rerun_actions() {
    let device = MockGraphicsDevice::new();
    let counter = Arc::new(Mutex::new(0));
    let mut queue = DeletionQueue::new();
    let c = Arc::clone(&counter);
    queue.push(move |_| *c.lock().unwrap() += 1);

    queue.flush(&device);
    queue.flush(&device);
    assert_eq!(*counter.lock().unwrap(), 1);
}

#[test]
fn test_actions_receive_the_device() {
    let device = MockGraphicsDevice::new();
    let buffer = device
        .create_buffer(&BufferDesc { size: 64, usage: BufferUsage::UNIFORM, location: MemoryLocation::CpuToGpu })
        .unwrap();
    let pool = device.create_descriptor_pool(4, &[]).unwrap();

    let mut queue = DeletionQueue::new();
    queue.push(move |d| d.destroy_buffer(buffer));
    queue.push(move |d| d.destroy_descriptor_pool(pool));
    device.clear_calls();

    queue.flush(&device);

    let calls = device.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].starts_with("destroy_descriptor_pool"));
    assert!(calls[1].starts_with("destroy_buffer"));
    assert_eq!(device.live_count("buffer"), 0);
}
