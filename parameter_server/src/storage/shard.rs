use parking_lot::{Mutex, RwLock};

use super::{Result, SizeMismatchErr};
use machine_learning::optimization::Optimizer;

/// A slice of a stored array with its own double-buffered gradient and optimizer state.
#[derive(Debug)]
pub struct ParameterShard<O: Optimizer> {
    params: usize,
    grads: [Mutex<Box<[f32]>>; 2],
    weights: RwLock<Box<[f32]>>,
    optimizer: Mutex<O>,
}

impl<O: Optimizer> ParameterShard<O> {
    /// Creates a new `ParameterShard`.
    ///
    /// # Arguments
    /// * `weights` - The initial state of the weights.
    /// * `optimizer` - The optimization algorithm.
    pub fn new(weights: Vec<f32>, optimizer: O) -> Self {
        let params = weights.len();

        Self {
            params,
            grads: [
                Mutex::new(vec![0.; params].into_boxed_slice()),
                Mutex::new(vec![0.; params].into_boxed_slice()),
            ],
            weights: RwLock::new(weights.into_boxed_slice()),
            optimizer: Mutex::new(optimizer),
        }
    }

    pub fn len(&self) -> usize {
        self.params
    }

    /// Accumulates `grad` into the active gradient.
    ///
    /// # Arguments
    /// * `active_idx` - The index of the active gradient, must be `0` or `1`.
    /// * `grad` - The gradient to accumulate to the active gradient.
    pub fn accumulate(&self, active_idx: usize, grad: &[f32]) -> Result<()> {
        self.check(grad.len())?;

        let mut active_grad = self.grads[active_idx].lock();
        active_grad
            .iter_mut()
            .zip(grad)
            .for_each(|(acc, g)| *acc += g);

        Ok(())
    }

    /// Updates the weights using the frozen gradient via the optimizer and clears it.
    ///
    /// # Arguments
    /// * `frozen_idx` - The index of the frozen gradient, must be `0` or `1`.
    pub fn update_weights(&self, frozen_idx: usize) -> Result<()> {
        let mut weights = self.weights.write();
        let mut grad = self.grads[frozen_idx].lock();

        self.optimizer.lock().update_params(&grad, &mut weights)?;

        grad.fill(0.);
        Ok(())
    }

    /// Swaps the optimizer, dropping the state of the previous one.
    pub fn set_optimizer(&self, optimizer: O) {
        *self.optimizer.lock() = optimizer;
    }

    /// Copies the shard's inner weights into the provided destination buffer.
    ///
    /// # Returns
    /// A `SizeMismatchErr` if `out` isn't the same size as this shard.
    pub fn pull_weights(&self, out: &mut [f32]) -> Result<()> {
        self.check(out.len())?;
        out.copy_from_slice(&self.weights.read());
        Ok(())
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

#[cfg(test)]
mod tests {
    use machine_learning::{MlErr, optimization::Assign};

    use super::*;
    use crate::storage::StorageErr;

    struct AddOptimizer;

    impl Optimizer for AddOptimizer {
        fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> machine_learning::Result<()> {
            params.iter_mut().zip(grad).for_each(|(w, g)| *w += g);
            Ok(())
        }
    }

    #[test]
    fn accumulation_and_update() {
        let shard = ParameterShard::new(vec![0.; 3], AddOptimizer);

        shard.accumulate(0, &[1.0, 2.0, 3.0]).unwrap();
        shard.accumulate(0, &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(**shard.grads[1].lock(), [0., 0., 0.]);

        shard.update_weights(0).unwrap();

        let mut out = [0.; 3];
        shard.pull_weights(&mut out).unwrap();
        assert_eq!(out, [2., 3., 4.]);
        assert_eq!(**shard.grads[0].lock(), [0., 0., 0.]);
    }

    #[test]
    fn double_buffering_flow() {
        let shard = ParameterShard::new(vec![0.], AddOptimizer);

        shard.accumulate(0, &[10.]).unwrap();
        shard.accumulate(1, &[5.]).unwrap();
        shard.update_weights(0).unwrap();

        let mut out = [0.];
        shard.pull_weights(&mut out).unwrap();
        assert_eq!(out, [10.]);

        shard.update_weights(1).unwrap();
        shard.pull_weights(&mut out).unwrap();
        assert_eq!(out, [15.]);
    }

    struct FailingOptimizer;

    impl Optimizer for FailingOptimizer {
        fn update_params(&mut self, _: &[f32], _: &mut [f32]) -> machine_learning::Result<()> {
            Err(MlErr::EmptyBatch)
        }
    }

    #[test]
    fn optimizer_failures_are_kept() {
        let shard = ParameterShard::new(vec![1.; 2], FailingOptimizer);
        shard.accumulate(0, &[1., 1.]).unwrap();

        assert!(matches!(
            shard.update_weights(0),
            Err(StorageErr::Optimizer(MlErr::EmptyBatch))
        ));

        let mut out = [0.; 2];
        shard.pull_weights(&mut out).unwrap();
        assert_eq!(out, [1., 1.]);
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let shard = ParameterShard::new(vec![0.; 2], Assign);

        assert!(matches!(
            shard.accumulate(0, &[1.]),
            Err(StorageErr::SizeMismatch(SizeMismatchErr { got: 1, expected: 2 }))
        ));
        assert!(shard.pull_weights(&mut [0.; 3]).is_err());
    }
}
