use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewD, Ix2};

use super::{Sequential, loss::LossFn, params::ParamLayout};
use crate::Result;

/// A full network description: a body of layers, the head that turns its scores into the
/// output and the names of the data and label inputs.
#[derive(Debug, Clone)]
pub struct Symbol<L> {
    body: Sequential,
    head: L,
    data: String,
    label: String,
}

impl<L: LossFn> Symbol<L> {
    /// Creates a new `Symbol` whose inputs are named `data` and `data_label`.
    pub fn new(body: Sequential, head: L) -> Self {
        Self {
            body,
            head,
            data: "data".to_string(),
            label: "data_label".to_string(),
        }
    }

    pub fn with_input_names(mut self, data: impl Into<String>, label: impl Into<String>) -> Self {
        self.data = data.into();
        self.label = label.into();
        self
    }

    /// Every argument of the network: the data input, the parameter arrays in order and
    /// the label input.
    pub fn list_arguments(&self) -> Vec<String> {
        let mut args = vec![self.data.clone()];
        args.extend(self.body.param_names());
        args.push(self.label.clone());
        args
    }

    /// Resolves the shapes of every parameter array given the shape of one data sample.
    pub fn infer_args(&mut self, sample: &[usize]) -> Result<ParamLayout> {
        self.body.infer(sample).map(|(layout, _)| layout)
    }

    pub(crate) fn forward(&mut self, params: &[f32], x: ArrayViewD<f32>) -> Result<Array2<f32>> {
        let z = self.body.forward(params, x)?.into_dimensionality::<Ix2>()?;
        Ok(self.head.output(z.view()))
    }

    pub(crate) fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        y_pred: ArrayView2<f32>,
        y: ArrayView1<f32>,
    ) -> Result<f32> {
        let loss = self.head.loss(y_pred, y)?;
        let d = self.head.loss_prime(y_pred, y)?;
        self.body.backward(params, grad, d.into_dyn())?;
        Ok(loss)
    }
}
