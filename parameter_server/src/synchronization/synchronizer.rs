use machine_learning::optimization::Optimizer;

use crate::storage::{ParameterHandle, Result};

/// Decides when a pushed gradient reaches the stored value.
#[allow(unused)]
#[trait_variant::make(Synchronizer: Send)]
pub trait SynchronizerTemplate: Clone {
    /// Whether every worker has to push each key the same number of times.
    fn synchronous(&self) -> bool;

    /// Accumulates `grad` into the store behind `handle` and updates the value when due.
    ///
    /// # Arguments
    /// * `handle` - The parameter handle holding the value of a key.
    /// * `grad` - The incoming gradient to accumulate.
    ///
    /// # Returns
    /// An error if there's a size mismatch between `grad` and the size of the storage.
    async fn push<O>(&self, handle: &ParameterHandle<O>, grad: &[f32]) -> Result<()>
    where
        O: Optimizer + Send;
}
