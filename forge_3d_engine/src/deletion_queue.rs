/// Deferred GPU resource teardown
///
/// Cleanup actions are registered as closures and run later, once the GPU is
/// known to be done with the resources they release. Actions run in reverse
/// registration order so dependents (a view, a set) go before what they were
/// created from (an image, a pool).

use crate::graphics_device::GraphicsDevice;

type DeletionAction = Box<dyn FnOnce(&dyn GraphicsDevice) + Send>;

/// LIFO list of deferred cleanup actions
#[derive(Default)]
pub struct DeletionQueue {
    actions: Vec<DeletionAction>,
}

impl DeletionQueue {
    pub fn new() -> Self {
        Self { actions: Vec::new() }
    }

    /// Register a cleanup action
    pub fn push<F>(&mut self, action: F)
    where
        F: FnOnce(&dyn GraphicsDevice) + Send + 'static,
    {
        self.actions.push(Box::new(action));
    }

    /// Run every pending action, newest first, and empty the queue
    pub fn flush(&mut self, device: &dyn GraphicsDevice) {
        while let Some(action) = self.actions.pop() {
            action(device);
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl std::fmt::Debug for DeletionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionQueue").field("pending", &self.actions.len()).finish()
    }
}

#[cfg(test)]
#[path = "deletion_queue_tests.rs"]
mod tests;
