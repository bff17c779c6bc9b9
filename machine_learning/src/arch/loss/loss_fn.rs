use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::{MlErr, Result};

/// The head of a network: turns the scores of the last layer into its output and seeds
/// backpropagation.
pub trait LossFn {
    /// Maps the raw scores `z` of the last layer to the network output.
    fn output(&self, z: ArrayView2<f32>) -> Array2<f32>;

    /// The mean loss of the batch.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView1<f32>) -> Result<f32>;

    /// The gradient of the loss with respect to `z`, summed over the batch rather than averaged.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView1<f32>) -> Result<Array2<f32>>;
}

pub(super) fn check_labels(y_pred: ArrayView2<f32>, y: ArrayView1<f32>) -> Result<()> {
    if y.len() != y_pred.nrows() {
        return Err(MlErr::SizeMismatch {
            what: "labels",
            got: y.len(),
            expected: y_pred.nrows(),
        });
    }

    Ok(())
}
