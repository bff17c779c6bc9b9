use std::mem;

use ndarray::{ArrayD, ArrayViewD};

use super::{
    layers::Layer,
    params::{ParamLayout, ParamSpec},
};
use crate::{MlErr, Result};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The amount of parameters of every layer, only meaningful after `infer`.
    pub fn size(&self) -> usize {
        self.layers.iter().map(Layer::size).sum()
    }

    /// Names of the parameter arrays in the order the layers consume them.
    pub fn param_names(&self) -> Vec<String> {
        self.layers
            .iter()
            .flat_map(Layer::params)
            .map(|spec| spec.name)
            .collect()
    }

    /// Propagates the sample shape of the input through every layer.
    ///
    /// # Arguments
    /// * `input` - The shape of a single input sample.
    ///
    /// # Returns
    /// The layout of the parameters and the sample shape of the output.
    pub fn infer(&mut self, input: &[usize]) -> Result<(ParamLayout, Vec<usize>)> {
        let mut shape = input.to_vec();
        let mut specs: Vec<ParamSpec> = Vec::new();

        for layer in &mut self.layers {
            shape = layer.infer(&shape)?;
            specs.extend(layer.params());
        }

        Ok((ParamLayout::new(specs), shape))
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `params` - The flat parameters of every layer.
    /// * `x` - The input batch.
    ///
    /// # Returns
    /// The raw scores of the last layer or an error if occurred.
    pub fn forward(&mut self, params: &[f32], x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        self.check_size(params.len())?;

        let mut rest = params;
        let mut x = x.to_owned();

        for layer in &mut self.layers {
            let (front, back) = rest.split_at(layer.size());
            x = layer.forward(front, x.view())?;
            rest = back;
        }

        Ok(x)
    }

    /// Makes a backward pass through the network, writing every layer's gradient into `grad`.
    ///
    /// # Arguments
    /// * `params` - The same parameters used in the previous forward pass.
    /// * `grad` - The buffer for the gradient, as large as `params`.
    /// * `d` - The delta of the network's output.
    pub fn backward(&mut self, params: &[f32], mut grad: &mut [f32], mut d: ArrayD<f32>) -> Result<()> {
        self.check_size(params.len())?;
        self.check_size(grad.len())?;

        let mut rest = params;

        for layer in self.layers.iter_mut().rev() {
            let mid = rest.len() - layer.size();
            let (front, back) = rest.split_at(mid);
            let (grad_front, grad_back) = mem::take(&mut grad).split_at_mut(mid);

            d = layer.backward(back, grad_back, d)?;
            rest = front;
            grad = grad_front;
        }

        Ok(())
    }

    fn check_size(&self, got: usize) -> Result<()> {
        let expected = self.size();
        if got != expected {
            return Err(MlErr::SizeMismatch {
                what: "parameters",
                got,
                expected,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::activations::ActFn;

    fn mlp() -> Sequential {
        Sequential::new([
            Layer::dense("fc1", 3),
            Layer::activation("relu1", ActFn::Relu),
            Layer::dense("fc2", 1),
        ])
    }

    #[test]
    fn infer_lays_out_every_layer() {
        let mut net = mlp();
        let (layout, out) = net.infer(&[4]).unwrap();

        assert_eq!(out, [1]);
        assert_eq!(layout.size(), 4 * 3 + 3 + 3 + 1);
        assert_eq!(net.param_names(), ["fc1_w", "fc1_b", "fc2_w", "fc2_b"]);
    }

    #[test]
    fn forward_rejects_wrong_param_count() {
        let mut net = mlp();
        net.infer(&[4]).unwrap();

        let x = ndarray::Array::<f32, _>::zeros((2, 4)).into_dyn();
        let err = net.forward(&[0.; 3], x.view());
        assert!(matches!(err, Err(MlErr::SizeMismatch { got: 3, .. })));
    }
}
