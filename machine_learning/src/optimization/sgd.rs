use rayon::prelude::*;

use super::{
    Optimizer,
    optimizer::{check_sizes, ensure_state},
};
use crate::Result;

/// Stochastic gradient descent with momentum, weight decay, gradient rescaling and clipping.
///
/// Every step computes, per parameter:
/// ```text
/// g   = clip(rescale_grad * grad, clip_gradient) + weight_decay * w
/// mom = momentum * mom - learning_rate * g
/// w   = w + mom
/// ```
#[derive(Debug, Clone)]
pub struct Sgd {
    learning_rate: f32,
    momentum: f32,
    weight_decay: f32,
    rescale_grad: f32,
    clip_gradient: Option<f32>,
    mom: Vec<f32>,
}

impl Sgd {
    /// Creates a new `Sgd` optimizer, its momentum buffer is sized on the first update.
    pub fn new(learning_rate: f32, momentum: f32, weight_decay: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            weight_decay,
            rescale_grad: 1.,
            clip_gradient: None,
            mom: Vec::new(),
        }
    }

    pub fn with_rescale_grad(mut self, rescale_grad: f32) -> Self {
        self.rescale_grad = rescale_grad;
        self
    }

    /// Bounds every rescaled gradient to `[-clip, clip]`, non positive values disable it.
    pub fn with_clip_gradient(mut self, clip: Option<f32>) -> Self {
        self.clip_gradient = clip.filter(|&c| c > 0.);
        self
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

impl Optimizer for Sgd {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_sizes(grad, params)?;
        ensure_state(&mut self.mom, params.len())?;

        let Self {
            learning_rate: lr,
            momentum,
            weight_decay: wd,
            rescale_grad: rescale,
            clip_gradient: clip,
            ..
        } = *self;

        params
            .par_iter_mut()
            .zip(grad)
            .zip(self.mom.par_iter_mut())
            .for_each(|((w, g), mom)| {
                let mut g = rescale * g;
                if let Some(clip) = clip {
                    g = g.clamp(-clip, clip);
                }

                *mom = momentum * *mom - lr * (g + wd * *w);
                *w += *mom;
            });

        Ok(())
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }
}
