use std::ops::Deref;

use machine_learning::optimization::Optimizer;
use tokio::task;

use super::{ParameterStore, Result};

/// The async face of a `ParameterStore`, shared by every session that touches its key.
///
/// Store operations are CPU bound, they run in place on the current worker thread so that the
/// runtime can move its other tasks elsewhere. This needs the multi threaded runtime.
pub struct ParameterHandle<O: Optimizer>(ParameterStore<O>);

impl<O: Optimizer> Clone for ParameterHandle<O> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<O: Optimizer> Deref for ParameterHandle<O> {
    type Target = ParameterStore<O>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<O: Optimizer> ParameterHandle<O> {
    pub fn new(store: ParameterStore<O>) -> Self {
        Self(store)
    }
}

impl<O: Optimizer + Send> ParameterHandle<O> {
    fn blocking<T>(&self, f: impl FnOnce(&ParameterStore<O>) -> T) -> T {
        task::block_in_place(|| f(&self.0))
    }

    /// Adds `grad` to the gradient accumulated since the last update.
    pub async fn accumulate(&self, grad: &[f32]) -> Result<()> {
        self.blocking(|store| store.accumulate(grad))
    }

    /// Applies the accumulated gradient, skipped if another update is running.
    pub async fn update_params(&self) -> Result<()> {
        self.blocking(|store| store.update_params())
    }

    /// Accumulates `grad` and applies it right away.
    pub async fn push(&self, grad: &[f32]) -> Result<()> {
        self.blocking(|store| {
            store.accumulate(grad)?;
            store.update_params()
        })
    }

    /// Copies the current value into `out`.
    pub async fn pull_params(&self, out: &mut [f32]) -> Result<()> {
        self.blocking(|store| store.pull_params(out))
    }
}
