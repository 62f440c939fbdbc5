/// Growable descriptor allocator
///
/// Keeps a list of pools with room left (`ready`) and a list of pools that
/// reported exhaustion (`full`). Allocation pops a ready pool, or creates a new
/// one at the current working size and grows that size by 1.5x, capped at
/// `MAX_SETS_PER_POOL`. An exhausted pool moves to `full` and the allocation is
/// retried once on another pool. The pool that served a request always goes
/// back to `ready`; exhaustion is discovered by the next failing allocation.

use crate::config::MAX_SETS_PER_POOL;
use crate::descriptor::allocator::pool_sizes;
use crate::error::{Error, Result};
use crate::graphics_device::{
    DescriptorPool, DescriptorSet, DescriptorSetLayout, GraphicsDevice, PoolSizeRatio,
};
use crate::{engine_debug, engine_error};

const GROWTH_FACTOR: f32 = 1.5;

#[derive(Debug, Default)]
pub struct DescriptorAllocatorGrowable {
    ratios: Vec<PoolSizeRatio>,
    ready_pools: Vec<DescriptorPool>,
    full_pools: Vec<DescriptorPool>,
    sets_per_pool: u32,
}

/// Next working capacity: x1.5, at least one more set, never above the cap
fn grow(sets: u32) -> u32 {
    ((sets as f32 * GROWTH_FACTOR) as u32)
        .max(sets.saturating_add(1))
        .min(MAX_SETS_PER_POOL)
}

impl DescriptorAllocatorGrowable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the ratios and create the first pool at `initial_sets` x 1.5
    ///
    /// That size is also the starting working capacity for later pools.
    pub fn init(
        &mut self,
        device: &dyn GraphicsDevice,
        initial_sets: u32,
        ratios: &[PoolSizeRatio],
    ) -> Result<()> {
        self.ratios = ratios.to_vec();
        let sets = grow(initial_sets);
        let pool = self.create_pool(device, sets)?;
        self.sets_per_pool = sets;
        self.ready_pools.push(pool);
        Ok(())
    }

    fn create_pool(&self, device: &dyn GraphicsDevice, sets: u32) -> Result<DescriptorPool> {
        device.create_descriptor_pool(sets, &pool_sizes(sets, &self.ratios))
    }

    fn get_pool(&mut self, device: &dyn GraphicsDevice) -> Result<DescriptorPool> {
        if let Some(pool) = self.ready_pools.pop() {
            return Ok(pool);
        }
        let pool = self.create_pool(device, self.sets_per_pool)?;
        engine_debug!(
            "forge3d::DescriptorAllocatorGrowable",
            "Created descriptor pool with {} sets", self.sets_per_pool
        );
        self.sets_per_pool = grow(self.sets_per_pool);
        Ok(pool)
    }

    /// Allocate one descriptor set, growing the pool list when needed
    ///
    /// # Errors
    ///
    /// `Error::PoolExhausted` if the retry pool is exhausted too; device errors
    /// from pool creation or allocation are passed through.
    pub fn allocate(
        &mut self,
        device: &dyn GraphicsDevice,
        layout: DescriptorSetLayout,
    ) -> Result<DescriptorSet> {
        let mut pool = self.get_pool(device)?;

        let set = match device.allocate_descriptor_set(pool, layout) {
            Err(Error::PoolExhausted) => {
                self.full_pools.push(pool);
                pool = self.get_pool(device)?;
                match device.allocate_descriptor_set(pool, layout) {
                    Err(Error::PoolExhausted) => {
                        self.full_pools.push(pool);
                        engine_error!(
                            "forge3d::DescriptorAllocatorGrowable",
                            "Descriptor set allocation failed twice on exhausted pools"
                        );
                        return Err(Error::PoolExhausted);
                    }
                    other => other,
                }
            }
            other => other,
        };

        self.ready_pools.push(pool);
        set
    }

    /// Reset every pool and make them all ready again
    pub fn clear_pools(&mut self, device: &dyn GraphicsDevice) -> Result<()> {
        self.ready_pools.append(&mut self.full_pools);
        for &pool in &self.ready_pools {
            device.reset_descriptor_pool(pool)?;
        }
        Ok(())
    }

    /// Destroy every pool
    pub fn destroy_pools(&mut self, device: &dyn GraphicsDevice) {
        for pool in self.ready_pools.drain(..) {
            device.destroy_descriptor_pool(pool);
        }
        for pool in self.full_pools.drain(..) {
            device.destroy_descriptor_pool(pool);
        }
    }

    /// Set count the next newly created pool will get
    pub fn sets_per_pool(&self) -> u32 {
        self.sets_per_pool
    }

    pub fn ready_pool_count(&self) -> usize {
        self.ready_pools.len()
    }

    pub fn full_pool_count(&self) -> usize {
        self.full_pools.len()
    }
}

#[cfg(test)]
#[path = "growable_allocator_tests.rs"]
mod tests;
