use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU8, Ordering},
    },
};

use machine_learning::optimization::Optimizer;
use rayon::prelude::*;

use super::{ParameterShard, Result, SizeMismatchErr};

/// The storage of the value of one key along with its accumulated gradients.
///
/// The value is split in shards of at most `shard_size` parameters that are updated in parallel.
/// These methods are private to the crate, they become available through the async interface of
/// a `ParameterHandle`.
#[derive(Debug)]
pub struct ParameterStore<O: Optimizer> {
    params: usize,
    active_idx: Arc<AtomicU8>,
    updating: Arc<AtomicBool>,
    shards: Arc<[ParameterShard<O>]>,
    shard_size: NonZeroUsize,
}

impl<O: Optimizer> Clone for ParameterStore<O> {
    fn clone(&self) -> Self {
        Self {
            params: self.params,
            active_idx: Arc::clone(&self.active_idx),
            updating: Arc::clone(&self.updating),
            shards: Arc::clone(&self.shards),
            shard_size: self.shard_size,
        }
    }
}

impl<O: Optimizer> ParameterStore<O> {
    /// Creates a new `ParameterStore`.
    ///
    /// # Arguments
    /// * `shard_size` - The maximum amount of parameters per shard.
    /// * `values` - The initial value of the key.
    /// * `optimizer_factory` - An `Optimizer` factory closure, called once per shard with its size.
    pub fn new<F>(shard_size: NonZeroUsize, values: &[f32], optimizer_factory: F) -> Self
    where
        F: FnMut(usize) -> O,
    {
        let mut optimizer_factory = optimizer_factory;
        let shards: Vec<_> = values
            .chunks(shard_size.get())
            .map(|chunk| ParameterShard::new(chunk.to_vec(), optimizer_factory(chunk.len())))
            .collect();

        Self {
            params: values.len(),
            active_idx: Arc::new(AtomicU8::new(0)),
            updating: Arc::new(AtomicBool::new(false)),
            shards: Arc::from(shards),
            shard_size,
        }
    }

    /// Returns the amount of parameters in the storage.
    pub fn len(&self) -> usize {
        self.params
    }

    fn check(&self, got: usize) -> Result<()> {
        if got != self.params {
            return Err(SizeMismatchErr {
                got,
                expected: self.params,
            }
            .into());
        }

        Ok(())
    }
}

impl<O: Optimizer + Send> ParameterStore<O> {
    /// Accumulates a new gradient into the active gradient buffer.
    ///
    /// # Arguments
    /// * `grad` - A flat slice as long as the stored value.
    pub(crate) fn accumulate(&self, grad: &[f32]) -> Result<()> {
        self.check(grad.len())?;
        let active_idx = self.active_idx.load(Ordering::Acquire) as usize;

        self.shards
            .par_iter()
            .zip(grad.par_chunks(self.shard_size.get()))
            .try_for_each(|(shard, grad_slice)| shard.accumulate(active_idx, grad_slice))
    }

    /// Swaps the active gradient buffer and applies the frozen gradient to the weights.
    ///
    /// If another update is already running this is a no-op, the gradient stays in the active
    /// buffer for the next one.
    pub(crate) fn update_params(&self) -> Result<()> {
        let success = self
            .updating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok();

        if !success {
            return Ok(());
        }

        let frozen_idx = self.active_idx.fetch_xor(1, Ordering::AcqRel) as usize;
        let res = self
            .shards
            .par_iter()
            .try_for_each(|shard| shard.update_weights(frozen_idx));

        self.updating.store(false, Ordering::Release);
        res
    }

    /// Gathers all the sharded weights into a local buffer.
    ///
    /// # Arguments
    /// * `out` - A mutable slice where the weights will be copied.
    pub(crate) fn pull_params(&self, out: &mut [f32]) -> Result<()> {
        self.check(out.len())?;

        self.shards
            .par_iter()
            .zip(out.par_chunks_mut(self.shard_size.get()))
            .try_for_each(|(shard, out_slice)| shard.pull_weights(out_slice))
    }

    /// Replaces the optimizer of every shard.
    pub(crate) fn set_optimizer<F>(&self, optimizer_factory: F)
    where
        F: Fn(usize) -> O + Sync,
    {
        self.shards
            .par_iter()
            .for_each(|shard| shard.set_optimizer(optimizer_factory(shard.len())));
    }
}

#[cfg(test)]
mod tests {
    use machine_learning::optimization::{Assign, GradientDescent};

    use super::*;

    struct AddOptimizer;

    impl Optimizer for AddOptimizer {
        fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> machine_learning::Result<()> {
            params.iter_mut().zip(grad).for_each(|(w, g)| *w += g);
            Ok(())
        }
    }

    fn create_test_store(params: usize, shard_size: usize) -> ParameterStore<AddOptimizer> {
        let shard_size = NonZeroUsize::new(shard_size).unwrap();
        ParameterStore::new(shard_size, &vec![0.; params], |_| AddOptimizer)
    }

    #[test]
    fn ragged_shards() {
        const PARAMS: usize = 15;
        const SHARD_SIZE: usize = 8;

        let store = create_test_store(PARAMS, SHARD_SIZE);
        assert_eq!(store.shards.len(), 2);

        store.accumulate(&[1.0; PARAMS]).unwrap();
        store.update_params().unwrap();

        let mut out = [0.0; PARAMS];
        store.pull_params(&mut out).unwrap();
        assert_eq!(out, [1.0; PARAMS]);
    }

    #[test]
    fn buffer_swap() {
        const PARAMS: usize = 10;
        const SHARD_SIZE: usize = 1;

        let store = create_test_store(PARAMS, SHARD_SIZE);
        store.accumulate(&[1.0; PARAMS]).unwrap();

        store.update_params().unwrap();
        assert_eq!(store.active_idx.load(Ordering::Acquire), 1);
        store.accumulate(&[5.0; PARAMS]).unwrap();

        let mut weights = [0.0; PARAMS];
        store.pull_params(&mut weights).unwrap();
        assert_eq!(weights, [1.0; PARAMS]);

        store.update_params().unwrap();
        store.pull_params(&mut weights).unwrap();
        assert_eq!(weights, [6.0; PARAMS]);
    }

    #[test]
    fn concurrent_update_is_skipped() {
        let store = create_test_store(10, 1);
        store.updating.store(true, Ordering::SeqCst);

        let active_idx = store.active_idx.load(Ordering::Acquire);
        store.update_params().unwrap();
        assert_eq!(store.active_idx.load(Ordering::Acquire), active_idx);

        store.updating.store(false, Ordering::Release);
        store.update_params().unwrap();
        assert_ne!(store.active_idx.load(Ordering::SeqCst), active_idx);
    }

    #[test]
    fn keeps_initial_values() {
        let shard_size = NonZeroUsize::new(2).unwrap();
        let store = ParameterStore::new(shard_size, &[1., 2., 3.], |_| Assign);

        let mut out = [0.; 3];
        store.pull_params(&mut out).unwrap();
        assert_eq!(out, [1., 2., 3.]);
        assert!(store.pull_params(&mut [0.; 2]).is_err());
        assert!(store.accumulate(&[0.; 4]).is_err());
    }

    #[test]
    fn optimizer_can_be_replaced() {
        let shard_size = NonZeroUsize::new(2).unwrap();
        let store = ParameterStore::new(shard_size, &[1., 1., 1.], |_| {
            Box::new(Assign) as Box<dyn Optimizer + Send>
        });

        store.set_optimizer(|_| Box::new(GradientDescent::new(0.5)));
        store.accumulate(&[2., 2., 2.]).unwrap();
        store.update_params().unwrap();

        let mut out = [0.; 3];
        store.pull_params(&mut out).unwrap();
        assert_eq!(out, [0.; 3]);
    }

    #[test]
    fn empty_value() {
        let store = create_test_store(0, 4);

        store.accumulate(&[]).unwrap();
        store.update_params().unwrap();
        store.pull_params(&mut []).unwrap();
    }
}
