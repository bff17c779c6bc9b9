use ndarray::prelude::*;

use crate::{Result, arch::activations::ActFn};

/// Applies an `ActFn` elementwise.
#[derive(Debug, Clone)]
pub struct Activation {
    name: String,
    act_fn: ActFn,

    // Forward metadata
    z: ArrayD<f32>,
}

impl Activation {
    pub fn new(name: impl Into<String>, act_fn: ActFn) -> Self {
        Self {
            name: name.into(),
            act_fn,
            z: ArrayD::zeros(IxDyn(&[0])),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn forward(&mut self, x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        self.z = x.to_owned();
        Ok(x.mapv(|z| self.act_fn.f(z)))
    }

    pub fn backward(&mut self, mut d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let act_fn = self.act_fn;
        d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        Ok(d)
    }
}

/// Collapses every axis but the batch one.
#[derive(Debug, Clone)]
pub struct Flatten {
    name: String,
    in_shape: Vec<usize>,
}

impl Flatten {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            in_shape: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn infer(&self, input: &[usize]) -> Vec<usize> {
        vec![input.iter().product()]
    }

    pub fn forward(&mut self, x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        self.in_shape = x.shape().to_vec();
        let n = self.in_shape[0];
        let features = x.len() / n.max(1);
        Ok(x.to_shape((n, features))?.into_owned().into_dyn())
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        Ok(d.into_shape_with_order(IxDyn(&self.in_shape))?)
    }
}
