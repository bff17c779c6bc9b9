use std::sync::Arc;

use machine_learning::optimization::Optimizer;
use tokio::sync::Barrier;

use super::Synchronizer;
use crate::storage::{ParameterHandle, Result};

/// Waits until every worker pushed a key and applies their summed gradient once.
///
/// Every worker must push the same keys the same number of times.
#[derive(Clone)]
pub struct BarrierSync {
    barrier: Arc<Barrier>,
}

impl BarrierSync {
    /// Creates a new `BarrierSync` synchronizer.
    ///
    /// # Arguments
    /// * `barrier_size` - The amount of workers to wait on until updating the parameters.
    pub fn new(barrier_size: usize) -> Self {
        Self {
            barrier: Arc::new(Barrier::new(barrier_size)),
        }
    }
}

impl Synchronizer for BarrierSync {
    fn synchronous(&self) -> bool {
        true
    }

    async fn push<O>(&self, handle: &ParameterHandle<O>, grad: &[f32]) -> Result<()>
    where
        O: Optimizer + Send,
    {
        let accumulated = handle.accumulate(grad).await;

        let mut res = Ok(());
        if self.barrier.wait().await.is_leader() {
            res = handle.update_params().await;
        }

        self.barrier.wait().await;
        accumulated.and(res)
    }
}
