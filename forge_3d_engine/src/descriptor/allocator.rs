/// Fixed-capacity descriptor allocator
///
/// One pool, sized once. Used for small, bounded set populations such as the
/// engine-global draw image set. Allocation failure is reported to the caller,
/// never retried.

use crate::error::Result;
use crate::graphics_device::{
    DescriptorPool, DescriptorSet, DescriptorSetLayout, GraphicsDevice, PoolSize, PoolSizeRatio,
};
use crate::engine_err;

/// Absolute per-type descriptor counts for a pool of `max_sets` sets
pub fn pool_sizes(max_sets: u32, ratios: &[PoolSizeRatio]) -> Vec<PoolSize> {
    ratios
        .iter()
        .map(|r| PoolSize {
            ty: r.ty,
            count: (r.ratio * max_sets as f32) as u32,
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct DescriptorAllocator {
    pool: Option<DescriptorPool>,
}

impl DescriptorAllocator {
    pub fn new() -> Self {
        Self { pool: None }
    }

    /// Create the backing pool
    ///
    /// # Errors
    ///
    /// Fails if the pool already exists or if the device rejects the pool.
    pub fn init_pool(
        &mut self,
        device: &dyn GraphicsDevice,
        max_sets: u32,
        ratios: &[PoolSizeRatio],
    ) -> Result<()> {
        if self.pool.is_some() {
            return Err(engine_err!("forge3d::DescriptorAllocator", "init_pool called twice"));
        }
        self.pool = Some(device.create_descriptor_pool(max_sets, &pool_sizes(max_sets, ratios))?);
        Ok(())
    }

    /// Allocate one set from the pool
    ///
    /// # Errors
    ///
    /// `Error::PoolExhausted` when the pool is full; the caller decides what to do.
    pub fn allocate(
        &self,
        device: &dyn GraphicsDevice,
        layout: DescriptorSetLayout,
    ) -> Result<DescriptorSet> {
        let pool = self
            .pool
            .ok_or_else(|| engine_err!("forge3d::DescriptorAllocator", "allocate before init_pool"))?;
        device.allocate_descriptor_set(pool, layout)
    }

    /// Return every set to the pool
    pub fn clear_descriptors(&self, device: &dyn GraphicsDevice) -> Result<()> {
        match self.pool {
            Some(pool) => device.reset_descriptor_pool(pool),
            None => Ok(()),
        }
    }

    pub fn destroy_pool(&mut self, device: &dyn GraphicsDevice) {
        if let Some(pool) = self.pool.take() {
            device.destroy_descriptor_pool(pool);
        }
    }

    pub fn pool(&self) -> Option<DescriptorPool> {
        self.pool
    }
}

#[cfg(test)]
#[path = "allocator_tests.rs"]
mod tests;
