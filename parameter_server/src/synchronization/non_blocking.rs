use machine_learning::optimization::Optimizer;

use super::Synchronizer;
use crate::storage::{ParameterHandle, Result};

/// Skips synchronization between workers, every gradient is applied as soon as it arrives.
#[derive(Clone, Default)]
pub struct NoBlockingSync;

impl NoBlockingSync {
    pub fn new() -> Self {
        Self
    }
}

impl Synchronizer for NoBlockingSync {
    fn synchronous(&self) -> bool {
        false
    }

    async fn push<O>(&self, handle: &ParameterHandle<O>, grad: &[f32]) -> Result<()>
    where
        O: Optimizer + Send,
    {
        handle.push(grad).await
    }
}
