use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use super::{LossFn, loss_fn::check_labels};
use crate::{MlErr, Result};

/// Softmax over the classes of every row, trained with cross entropy against class indices.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftmaxOutput;

impl SoftmaxOutput {
    pub fn new() -> Self {
        Self
    }

    fn class_of(label: f32, classes: usize) -> Result<usize> {
        if label < 0. || label.fract() != 0. || label as usize >= classes {
            return Err(MlErr::InvalidLabel { label, classes });
        }

        Ok(label as usize)
    }
}

impl LossFn for SoftmaxOutput {
    fn output(&self, z: ArrayView2<f32>) -> Array2<f32> {
        let mut p = z.to_owned();

        for mut row in p.axis_iter_mut(Axis(0)) {
            let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row /= sum;
        }

        p
    }

    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView1<f32>) -> Result<f32> {
        check_labels(y_pred, y)?;

        let classes = y_pred.ncols();
        let mut total = 0.;
        for (row, &label) in y_pred.axis_iter(Axis(0)).zip(y) {
            let class = Self::class_of(label, classes)?;
            total -= row[class].max(f32::MIN_POSITIVE).ln();
        }

        Ok(total / y.len().max(1) as f32)
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView1<f32>) -> Result<Array2<f32>> {
        check_labels(y_pred, y)?;

        let classes = y_pred.ncols();
        let mut d = y_pred.to_owned();
        for (mut row, &label) in d.axis_iter_mut(Axis(0)).zip(y) {
            row[Self::class_of(label, classes)?] -= 1.;
        }

        Ok(d)
    }
}
