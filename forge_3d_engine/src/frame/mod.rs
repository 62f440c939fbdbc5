//! Frame module
//!
//! Per-frame GPU state (command buffer, synchronization, deferred deletions,
//! transient descriptors) and the ring that overlaps CPU recording of one
//! frame with GPU execution of the previous one.

mod frame_context;
mod frame_ring;

pub use frame_context::{FrameContext, FRAME_POOL_RATIOS};
pub use frame_ring::FrameRing;
