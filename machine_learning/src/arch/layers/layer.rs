use ndarray::{ArrayD, ArrayViewD};

use super::{Conv2d, MaxPool2d};
use crate::{
    Result,
    arch::{activations::ActFn, params::ParamSpec},
};

/// The operators a `Sequential` can be built from.
#[derive(Debug, Clone)]
pub enum Layer {
    Dense(super::Dense),
    Conv(Conv2d),
    Pool(MaxPool2d),
    Activation(super::Activation),
    Flatten(super::Flatten),
}

impl Layer {
    pub fn dense(name: &str, num_hidden: usize) -> Self {
        Self::Dense(super::Dense::new(name, num_hidden))
    }

    pub fn conv(name: &str, kernel: (usize, usize), num_filter: usize) -> Self {
        Self::Conv(Conv2d::new(name, kernel, num_filter))
    }

    pub fn max_pool(name: &str, kernel: (usize, usize), stride: (usize, usize)) -> Self {
        Self::Pool(MaxPool2d::new(name, kernel, stride))
    }

    pub fn activation(name: &str, act_fn: ActFn) -> Self {
        Self::Activation(super::Activation::new(name, act_fn))
    }

    pub fn flatten(name: &str) -> Self {
        Self::Flatten(super::Flatten::new(name))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Dense(l) => l.name(),
            Self::Conv(l) => l.name(),
            Self::Pool(l) => l.name(),
            Self::Activation(l) => l.name(),
            Self::Flatten(l) => l.name(),
        }
    }

    /// Returns the amount of parameters this layer has, only meaningful after `infer`.
    pub fn size(&self) -> usize {
        match self {
            Self::Dense(l) => l.size(),
            Self::Conv(l) => l.size(),
            _ => 0,
        }
    }

    /// Resolves this layer's dimensions from the shape of a single input sample.
    ///
    /// # Arguments
    /// * `input` - The sample shape, without the batch axis.
    ///
    /// # Returns
    /// The sample shape of the output or an error if the input can't be handled.
    pub fn infer(&mut self, input: &[usize]) -> Result<Vec<usize>> {
        match self {
            Self::Dense(l) => l.infer(input),
            Self::Conv(l) => l.infer(input),
            Self::Pool(l) => l.infer(input),
            Self::Activation(_) => Ok(input.to_vec()),
            Self::Flatten(l) => Ok(l.infer(input)),
        }
    }

    pub fn params(&self) -> Vec<ParamSpec> {
        match self {
            Self::Dense(l) => l.params(),
            Self::Conv(l) => l.params(),
            _ => Vec::new(),
        }
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        match self {
            Self::Dense(l) => l.forward(params, x),
            Self::Conv(l) => l.forward(params, x),
            Self::Pool(l) => l.forward(x),
            Self::Activation(l) => l.forward(x),
            Self::Flatten(l) => l.forward(x),
        }
    }

    /// Propagates `d` through this layer, writing this layer's gradient into `grad`.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        match self {
            Self::Dense(l) => l.backward(params, grad, d),
            Self::Conv(l) => l.backward(params, grad, d),
            Self::Pool(l) => l.backward(d),
            Self::Activation(l) => l.backward(d),
            Self::Flatten(l) => l.backward(d),
        }
    }
}
