use ndarray::{linalg, prelude::*};

use crate::{MlErr, Result, arch::params::ParamSpec};

/// A 2D convolution with unit stride and no padding over `(batch, channels, height, width)`.
///
/// The input is unrolled into a column matrix so both passes reduce to a single matrix product
/// over the whole batch.
#[derive(Debug, Clone)]
pub struct Conv2d {
    name: String,
    kernel: (usize, usize),
    num_filter: usize,
    in_dim: (usize, usize, usize),
    out_hw: (usize, usize),

    // Forward metadata
    cols: Array2<f32>,
    batch: usize,
}

impl Conv2d {
    /// Creates a new `Conv2d` layer.
    ///
    /// # Arguments
    /// * `name` - The prefix for the names of this layer's parameters.
    /// * `kernel` - The `(height, width)` of every filter.
    /// * `num_filter` - The amount of output channels.
    pub fn new(name: impl Into<String>, kernel: (usize, usize), num_filter: usize) -> Self {
        Self {
            name: name.into(),
            kernel,
            num_filter,
            in_dim: (0, 0, 0),
            out_hw: (0, 0),
            cols: Array2::zeros((0, 0)),
            batch: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.patch_len() * self.num_filter + self.num_filter
    }

    fn patch_len(&self) -> usize {
        self.in_dim.0 * self.kernel.0 * self.kernel.1
    }

    pub fn infer(&mut self, input: &[usize]) -> Result<Vec<usize>> {
        let &[c, h, w] = input else {
            return Err(self.shape_err(format!("expected (channels, height, width), got {input:?}")));
        };

        let (kh, kw) = self.kernel;
        if kh == 0 || kw == 0 || kh > h || kw > w || c == 0 || self.num_filter == 0 {
            return Err(self.shape_err(format!("kernel {:?} over input {input:?}", self.kernel)));
        }

        self.in_dim = (c, h, w);
        self.out_hw = (h - kh + 1, w - kw + 1);
        Ok(vec![self.num_filter, self.out_hw.0, self.out_hw.1])
    }

    pub fn params(&self) -> Vec<ParamSpec> {
        let (kh, kw) = self.kernel;
        vec![
            ParamSpec::weight(
                format!("{}_w", self.name),
                vec![self.num_filter, self.in_dim.0, kh, kw],
            ),
            ParamSpec::bias(format!("{}_b", self.name), vec![self.num_filter]),
        ]
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix4>()?;
        let (n, (oh, ow)) = (x.len_of(Axis(0)), self.out_hw);

        self.batch = n;
        self.cols = self.im2col(x)?;

        let (w, b) = self.view_params(params)?;
        let mut out = Array2::zeros((self.num_filter, n * oh * ow));
        linalg::general_mat_mul(1., &w, &self.cols, 0., &mut out);
        out += &b.insert_axis(Axis(1));

        let out = out
            .into_shape_with_order((self.num_filter, n, oh, ow))?
            .permuted_axes([1, 0, 2, 3]);

        Ok(out.as_standard_layout().into_owned().into_dyn())
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        let (n, (oh, ow)) = (self.batch, self.out_hw);
        let d = d.into_dimensionality::<Ix4>()?.permuted_axes([1, 0, 2, 3]);
        let d = d
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order((self.num_filter, n * oh * ow))?;

        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1., &d, &self.cols.t(), 0., &mut dw);
        db.assign(&d.sum_axis(Axis(1)));

        let (w, _) = self.view_params(params)?;
        let dcols = w.t().dot(&d);

        Ok(self.col2im(dcols.view())?.into_dyn())
    }

    /// Unrolls every receptive field of `x` into a column of a `(patch_len, batch * oh * ow)`
    /// matrix.
    fn im2col(&self, x: ArrayView4<f32>) -> Result<Array2<f32>> {
        let (n, (oh, ow)) = (x.len_of(Axis(0)), self.out_hw);
        let (c, kh, kw) = (self.in_dim.0, self.kernel.0, self.kernel.1);
        let mut cols = Array2::zeros((self.patch_len(), n * oh * ow));

        for ch in 0..c {
            for ki in 0..kh {
                for kj in 0..kw {
                    let row = (ch * kh + ki) * kw + kj;
                    let patch = x.slice(s![.., ch, ki..ki + oh, kj..kj + ow]);
                    cols.row_mut(row)
                        .into_shape_with_order((n, oh, ow))?
                        .assign(&patch);
                }
            }
        }

        Ok(cols)
    }

    /// Folds a column matrix back onto the input, adding up overlapping receptive fields.
    fn col2im(&self, dcols: ArrayView2<f32>) -> Result<Array4<f32>> {
        let (n, (oh, ow)) = (self.batch, self.out_hw);
        let (c, h, w) = self.in_dim;
        let (kh, kw) = self.kernel;
        let mut dx = Array4::zeros((n, c, h, w));

        for ch in 0..c {
            for ki in 0..kh {
                for kj in 0..kw {
                    let row = (ch * kh + ki) * kw + kj;
                    let dpatch = dcols.row(row).into_shape_with_order((n, oh, ow))?;
                    let mut window = dx.slice_mut(s![.., ch, ki..ki + oh, kj..kj + ow]);
                    window += &dpatch;
                }
            }
        }

        Ok(dx)
    }

    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let (w_raw, b_raw) = params.split_at(self.patch_len() * self.num_filter);
        let w = ArrayView2::from_shape((self.num_filter, self.patch_len()), w_raw)?;
        let b = ArrayView1::from_shape(self.num_filter, b_raw)?;
        Ok((w, b))
    }

    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        let (dw_raw, db_raw) = grad.split_at_mut(self.patch_len() * self.num_filter);
        let dw = ArrayViewMut2::from_shape((self.num_filter, self.patch_len()), dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.num_filter, db_raw)?;
        Ok((dw, db))
    }

    fn shape_err(&self, reason: String) -> MlErr {
        MlErr::InvalidShape {
            layer: self.name.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_valid_output_shape() {
        let mut conv = Conv2d::new("conv1", (5, 5), 20);

        assert_eq!(conv.infer(&[1, 28, 28]).unwrap(), [20, 24, 24]);
        assert_eq!(conv.size(), 20 * 25 + 20);
        assert!(conv.infer(&[28, 28]).is_err());
        assert!(Conv2d::new("big", (5, 5), 1).infer(&[1, 3, 3]).is_err());
    }

    #[test]
    fn forward_matches_direct_convolution() {
        let mut conv = Conv2d::new("conv", (2, 2), 1);
        conv.infer(&[1, 3, 3]).unwrap();

        let params = [1., 0., 0., 1., 0.5];
        let x = Array::from_shape_vec((1, 1, 3, 3), (1..=9).map(|i| i as f32).collect())
            .unwrap()
            .into_dyn();
        let y = conv.forward(&params, x.view()).unwrap();

        // each output is the top left plus the bottom right pixel of its window, plus the bias
        let expected = Array::from_shape_vec((1, 1, 2, 2), vec![6.5f32, 8.5, 12.5, 14.5])
            .unwrap()
            .into_dyn();
        assert_eq!(y, expected);
    }

    #[test]
    fn backward_matches_finite_differences() {
        const H: f32 = 1e-2;

        let mut conv = Conv2d::new("conv", (2, 2), 2);
        conv.infer(&[2, 3, 4]).unwrap();

        let params: Vec<f32> = (0..conv.size()).map(|i| ((i * 7 % 11) as f32 - 5.) / 10.).collect();
        let x = Array::from_shape_fn((2, 2, 3, 4), |(a, b, c, d)| {
            ((a * 13 + b * 5 + c * 3 + d) % 7) as f32 / 7. - 0.5
        })
        .into_dyn();

        // loss = sum(y), so the upstream delta is all ones
        let y = conv.forward(&params, x.view()).unwrap();
        let mut grad = vec![0.; conv.size()];
        let dx = conv
            .backward(&params, &mut grad, Array::ones(y.raw_dim()))
            .unwrap();

        let loss = |conv: &mut Conv2d, params: &[f32], x: &ArrayD<f32>| {
            conv.forward(params, x.view()).unwrap().sum()
        };

        for i in [0, 3, 9, params.len() - 1] {
            let mut plus = params.clone();
            let mut minus = params.clone();
            plus[i] += H;
            minus[i] -= H;

            let numeric = (loss(&mut conv, &plus, &x) - loss(&mut conv, &minus, &x)) / (2. * H);
            assert!((numeric - grad[i]).abs() < 1e-2, "param {i}: {numeric} vs {}", grad[i]);
        }

        for idx in [[0, 0, 0, 0], [1, 1, 2, 3], [0, 1, 1, 2]] {
            let mut plus = x.clone();
            let mut minus = x.clone();
            plus[&idx[..]] += H;
            minus[&idx[..]] -= H;

            let numeric = (loss(&mut conv, &params, &plus) - loss(&mut conv, &params, &minus)) / (2. * H);
            assert!((numeric - dx[&idx[..]]).abs() < 1e-2, "input {idx:?}");
        }
    }
}
