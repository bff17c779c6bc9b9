use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewD};

use crate::{
    MlErr, Result,
    arch::{Symbol, loss::LossFn, params::ParamLayout},
    optimization::Optimizer,
};

/// A network bound to its parameter and gradient buffers, ready to run forward and backward
/// passes over batches of any size.
pub struct Executor<L> {
    symbol: Symbol<L>,
    sample: Vec<usize>,
    layout: ParamLayout,
    params: Vec<f32>,
    grad: Vec<f32>,
    output: Array2<f32>,
    trained: bool,
}

impl<L: LossFn> Executor<L> {
    /// Binds `symbol` to a parameter buffer.
    ///
    /// # Arguments
    /// * `symbol` - The network to run.
    /// * `sample` - The shape of a single data sample, without the batch axis.
    /// * `params` - The initial parameters, laid out as `Symbol::infer_args` says.
    ///
    /// # Returns
    /// A new `Executor` or an error if the shapes can't be inferred or `params` has the wrong size.
    pub fn bind(mut symbol: Symbol<L>, sample: &[usize], params: Vec<f32>) -> Result<Self> {
        let layout = symbol.infer_args(sample)?;

        if params.len() != layout.size() {
            return Err(MlErr::SizeMismatch {
                what: "bound parameters",
                got: params.len(),
                expected: layout.size(),
            });
        }

        Ok(Self {
            symbol,
            sample: sample.to_vec(),
            grad: vec![0.; layout.size()],
            layout,
            params,
            output: Array2::zeros((0, 0)),
            trained: false,
        })
    }

    /// Runs the network over `data`, a batch shaped `(batch, *sample)`.
    ///
    /// # Arguments
    /// * `data` - The input batch.
    /// * `is_train` - Whether a `backward` call is going to follow.
    ///
    /// # Returns
    /// A view of the outputs, one row per sample.
    pub fn forward(&mut self, data: ArrayViewD<f32>, is_train: bool) -> Result<ArrayView2<'_, f32>> {
        let shape = data.shape();

        if shape.first().is_none_or(|&n| n == 0) {
            return Err(MlErr::EmptyBatch);
        }

        if shape[1..] != self.sample[..] {
            return Err(MlErr::InputShape {
                got: shape[1..].to_vec(),
                expected: self.sample.clone(),
            });
        }

        self.output = self.symbol.forward(&self.params, data)?;
        self.trained = is_train;
        Ok(self.output.view())
    }

    /// The outputs of the last forward pass.
    pub fn outputs(&self) -> ArrayView2<'_, f32> {
        self.output.view()
    }

    /// Backpropagates `labels` through the last training forward pass, replacing the
    /// gradient buffer.
    ///
    /// # Returns
    /// The mean loss of the batch.
    pub fn backward(&mut self, labels: ArrayView1<f32>) -> Result<f32> {
        if !self.trained {
            return Err(MlErr::BackwardWithoutForward);
        }

        let Self {
            symbol,
            params,
            grad,
            output,
            ..
        } = self;

        symbol.backward(params, grad, output.view(), labels)
    }

    /// Applies `optimizer` to every parameter with the current gradient, stepping with
    /// `learning_rate`.
    pub fn update_all<O: Optimizer + ?Sized>(
        &mut self,
        optimizer: &mut O,
        learning_rate: f32,
    ) -> Result<()> {
        optimizer.set_learning_rate(learning_rate);
        optimizer.update_params(&self.grad, &mut self.params)
    }

    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    pub fn list_arguments(&self) -> Vec<String> {
        self.symbol.list_arguments()
    }

    pub fn arg_arrays(&self) -> &[f32] {
        &self.params
    }

    pub fn arg_arrays_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    pub fn grad_arrays(&self) -> &[f32] {
        &self.grad
    }

    /// The parameters of the array under `key`.
    pub fn arg(&self, key: usize) -> Option<&[f32]> {
        self.layout.view(key, &self.params)
    }

    pub fn arg_mut(&mut self, key: usize) -> Option<&mut [f32]> {
        self.layout.view_mut(key, &mut self.params)
    }

    /// The gradient of the array under `key`.
    pub fn grad(&self, key: usize) -> Option<&[f32]> {
        self.layout.view(key, &self.grad)
    }
}
