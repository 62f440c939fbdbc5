/// Ring of overlapped frame contexts

use crate::config::FRAME_OVERLAP;
use crate::error::Result;
use crate::frame::FrameContext;
use crate::graphics_device::GraphicsDevice;

/// `FRAME_OVERLAP` frame slots selected round-robin by the frame counter
#[derive(Debug)]
pub struct FrameRing {
    frames: Vec<FrameContext>,
    frame_count: u64,
}

impl FrameRing {
    pub fn new(device: &dyn GraphicsDevice, descriptor_sets: u32) -> Result<Self> {
        let mut frames: Vec<FrameContext> = Vec::with_capacity(FRAME_OVERLAP);
        for _ in 0..FRAME_OVERLAP {
            match FrameContext::new(device, descriptor_sets) {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    for frame in &mut frames {
                        frame.destroy(device);
                    }
                    return Err(e);
                }
            }
        }
        Ok(Self { frames, frame_count: 0 })
    }

    /// Frames fully submitted and presented so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn current_index(&self) -> usize {
        (self.frame_count % self.frames.len() as u64) as usize
    }

    pub fn current(&self) -> &FrameContext {
        &self.frames[self.current_index()]
    }

    pub fn current_mut(&mut self) -> &mut FrameContext {
        let index = self.current_index();
        &mut self.frames[index]
    }

    pub fn frames(&self) -> &[FrameContext] {
        &self.frames
    }

    /// Move to the next slot after a completed frame
    pub fn advance(&mut self) {
        self.frame_count += 1;
    }

    /// Release every slot (device must be idle)
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        for frame in &mut self.frames {
            frame.destroy(device);
        }
    }
}

#[cfg(test)]
#[path = "frame_ring_tests.rs"]
mod tests;
