use ndarray::{Array2, ArrayView1, ArrayView2, Zip};

use super::{LossFn, loss_fn::check_labels};
use crate::{MlErr, Result};

/// A sigmoid over a single score per sample, trained with binary cross entropy.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogisticRegressionOutput;

impl LogisticRegressionOutput {
    pub fn new() -> Self {
        Self
    }

    fn check_width(y_pred: ArrayView2<f32>) -> Result<()> {
        if y_pred.ncols() != 1 {
            return Err(MlErr::SizeMismatch {
                what: "logistic regression output width",
                got: y_pred.ncols(),
                expected: 1,
            });
        }

        Ok(())
    }
}

impl LossFn for LogisticRegressionOutput {
    fn output(&self, z: ArrayView2<f32>) -> Array2<f32> {
        z.mapv(|z| 1. / (1. + (-z).exp()))
    }

    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView1<f32>) -> Result<f32> {
        Self::check_width(y_pred)?;
        check_labels(y_pred, y)?;

        const EPS: f32 = 1e-7;
        let total = Zip::from(y_pred.column(0)).and(y).fold(0., |acc, &p, &y| {
            let p = p.clamp(EPS, 1. - EPS);
            acc - (y * p.ln() + (1. - y) * (1. - p).ln())
        });

        Ok(total / y.len().max(1) as f32)
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView1<f32>) -> Result<Array2<f32>> {
        Self::check_width(y_pred)?;
        check_labels(y_pred, y)?;

        let mut d = y_pred.to_owned();
        Zip::from(d.column_mut(0)).and(y).for_each(|d, &y| *d -= y);
        Ok(d)
    }
}
