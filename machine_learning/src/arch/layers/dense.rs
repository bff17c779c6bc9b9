use ndarray::{linalg, prelude::*};

use crate::{
    MlErr, Result,
    arch::params::ParamSpec,
};

/// A fully connected layer. Inputs of any rank are flattened to `(batch, features)`.
///
/// Weights are laid out as `(num_hidden, features)` followed by `num_hidden` biases.
#[derive(Debug, Clone)]
pub struct Dense {
    name: String,
    num_hidden: usize,
    input: usize,

    // Forward metadata
    x: Array2<f32>,
    in_shape: Vec<usize>,
}

impl Dense {
    /// Creates a new `Dense` layer whose input size is resolved by `infer`.
    ///
    /// # Arguments
    /// * `name` - The prefix for the names of this layer's parameters.
    /// * `num_hidden` - The amount of output units.
    pub fn new(name: impl Into<String>, num_hidden: usize) -> Self {
        Self {
            name: name.into(),
            num_hidden,
            input: 0,
            x: Array2::zeros((0, 0)),
            in_shape: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        (self.input + 1) * self.num_hidden
    }

    pub fn infer(&mut self, input: &[usize]) -> Result<Vec<usize>> {
        self.input = input.iter().product();

        if self.input == 0 || self.num_hidden == 0 {
            return Err(MlErr::InvalidShape {
                layer: self.name.clone(),
                reason: format!("input {input:?} with {} hidden units", self.num_hidden),
            });
        }

        Ok(vec![self.num_hidden])
    }

    pub fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::weight(format!("{}_w", self.name), vec![self.num_hidden, self.input]),
            ParamSpec::bias(format!("{}_b", self.name), vec![self.num_hidden]),
        ]
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let n = x.shape()[0];
        self.in_shape = x.shape().to_vec();
        self.x = x.to_shape((n, self.input))?.into_owned();

        let (w, b) = self.view_params(params)?;
        let mut z = Array2::zeros((n, self.num_hidden));
        linalg::general_mat_mul(1., &self.x, &w.t(), 0., &mut z);
        z += &b;

        Ok(z.into_dyn())
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        let d = d.into_dimensionality::<Ix2>()?;

        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1., &d.t(), &self.x, 0., &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        let (w, _) = self.view_params(params)?;
        let dx = d.dot(&w);

        Ok(dx.into_shape_with_order(IxDyn(&self.in_shape))?)
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let (w_raw, b_raw) = params.split_at(self.input * self.num_hidden);
        let w = ArrayView2::from_shape((self.num_hidden, self.input), w_raw)?;
        let b = ArrayView1::from_shape(self.num_hidden, b_raw)?;
        Ok((w, b))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        let (dw_raw, db_raw) = grad.split_at_mut(self.input * self.num_hidden);
        let dw = ArrayViewMut2::from_shape((self.num_hidden, self.input), dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.num_hidden, db_raw)?;
        Ok((dw, db))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_computes_affine_map() {
        let mut dense = Dense::new("fc", 2);
        assert_eq!(dense.infer(&[3]).unwrap(), [2]);
        assert_eq!(dense.size(), 8);

        #[rustfmt::skip]
        let params = [
            1., 0., 0.,
            0., 1., 2.,
            0.5, -1.,
        ];
        let x = array![[1., 2., 3.], [0., 0., 0.]].into_dyn();
        let z = dense.forward(&params, x.view()).unwrap();

        assert_eq!(z, array![[1.5f32, 7.], [0.5, -1.]].into_dyn());
    }

    #[test]
    fn flattens_higher_rank_inputs() {
        let mut dense = Dense::new("fc", 1);
        dense.infer(&[2, 2]).unwrap();

        let params = [1., 1., 1., 1., 0.];
        let x = Array::from_elem((3, 2, 2), 1.).into_dyn();
        let z = dense.forward(&params, x.view()).unwrap();
        assert_eq!(z.shape(), [3, 1]);

        let mut grad = [0.; 5];
        let dx = dense
            .backward(&params, &mut grad, Array::ones((3, 1)).into_dyn())
            .unwrap();

        assert_eq!(dx.shape(), [3, 2, 2]);
        assert_eq!(grad, [3., 3., 3., 3., 3.]);
    }

    #[test]
    fn param_names_follow_layer_name() {
        let mut dense = Dense::new("fc1", 4);
        dense.infer(&[6]).unwrap();

        let names: Vec<_> = dense.params().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["fc1_w", "fc1_b"]);
    }
}
