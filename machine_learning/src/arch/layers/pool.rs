use ndarray::prelude::*;

use crate::{MlErr, Result};

/// Max pooling over the spatial axes of `(batch, channels, height, width)`.
///
/// Windows that don't fit entirely inside the input are dropped.
#[derive(Debug, Clone)]
pub struct MaxPool2d {
    name: String,
    kernel: (usize, usize),
    stride: (usize, usize),
    in_dim: (usize, usize, usize),
    out_hw: (usize, usize),

    // Flat input offset of the winner of every output, the gradient is routed back through it.
    argmax: Vec<usize>,
    batch: usize,
}

impl MaxPool2d {
    pub fn new(name: impl Into<String>, kernel: (usize, usize), stride: (usize, usize)) -> Self {
        Self {
            name: name.into(),
            kernel,
            stride,
            in_dim: (0, 0, 0),
            out_hw: (0, 0),
            argmax: Vec::new(),
            batch: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn infer(&mut self, input: &[usize]) -> Result<Vec<usize>> {
        let (kh, kw) = self.kernel;
        let (sh, sw) = self.stride;

        let &[c, h, w] = input else {
            return Err(self.shape_err(format!("expected (channels, height, width), got {input:?}")));
        };

        if kh == 0 || kw == 0 || sh == 0 || sw == 0 || kh > h || kw > w {
            return Err(self.shape_err(format!(
                "kernel {:?} with stride {:?} over input {input:?}",
                self.kernel, self.stride
            )));
        }

        self.in_dim = (c, h, w);
        self.out_hw = ((h - kh) / sh + 1, (w - kw) / sw + 1);
        Ok(vec![c, self.out_hw.0, self.out_hw.1])
    }

    pub fn forward(&mut self, x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix4>()?;
        let (n, (c, h, w), (oh, ow)) = (x.len_of(Axis(0)), self.in_dim, self.out_hw);
        let (kh, kw) = self.kernel;
        let (sh, sw) = self.stride;

        let mut out = Array4::zeros((n, c, oh, ow));
        self.argmax.clear();
        self.argmax.reserve(out.len());
        self.batch = n;

        for ((b, ch, i, j), y) in out.indexed_iter_mut() {
            let (mut best, mut best_at) = (f32::NEG_INFINITY, (i * sh, j * sw));

            for di in 0..kh {
                for dj in 0..kw {
                    let at = (i * sh + di, j * sw + dj);
                    let v = x[[b, ch, at.0, at.1]];
                    if v > best {
                        (best, best_at) = (v, at);
                    }
                }
            }

            *y = best;
            self.argmax.push(((b * c + ch) * h + best_at.0) * w + best_at.1);
        }

        Ok(out.into_dyn())
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let (c, h, w) = self.in_dim;
        let mut dx = vec![0.; self.batch * c * h * w];

        for (&at, &g) in self.argmax.iter().zip(d.iter()) {
            dx[at] += g;
        }

        Ok(Array4::from_shape_vec((self.batch, c, h, w), dx)?.into_dyn())
    }

    fn shape_err(&self, reason: String) -> MlErr {
        MlErr::InvalidShape {
            layer: self.name.clone(),
            reason,
        }
    }
}
