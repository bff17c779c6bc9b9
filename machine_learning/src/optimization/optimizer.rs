use crate::{MlErr, Result};

/// Defines the strategy for updating model parameters based on calculated gradients.
pub trait Optimizer {
    /// Updates the provided slice of parameters using the gradient.
    ///
    /// # Arguments
    /// * `grad` - A reference to the model's gradient.
    /// * `params` - The parameters to update.
    ///
    /// # Returns
    /// An error if there's a mismatch in the sizes of `grad` and `params`.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;

    /// Changes the step length of subsequent updates, optimizers without one ignore it.
    fn set_learning_rate(&mut self, _learning_rate: f32) {}
}

impl<O: Optimizer + ?Sized> Optimizer for Box<O> {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        (**self).update_params(grad, params)
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        (**self).set_learning_rate(learning_rate)
    }
}

pub(super) fn check_sizes(grad: &[f32], params: &[f32]) -> Result<()> {
    if grad.len() != params.len() {
        return Err(MlErr::SizeMismatch {
            what: "gradient",
            got: grad.len(),
            expected: params.len(),
        });
    }

    Ok(())
}

/// Sizes the per-parameter state of a stateful optimizer on its first update and makes
/// sure later updates keep the same size.
pub(super) fn ensure_state(state: &mut Vec<f32>, len: usize) -> Result<()> {
    if state.is_empty() {
        state.resize(len, 0.);
    }

    if state.len() != len {
        return Err(MlErr::SizeMismatch {
            what: "optimizer state",
            got: len,
            expected: state.len(),
        });
    }

    Ok(())
}
