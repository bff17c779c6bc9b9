use serde::{Deserialize, Serialize};

/// The elementwise nonlinearities an `Activation` layer can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFn {
    Tanh,
    Relu,
    Sigmoid,
}
use ActFn::*;

impl ActFn {
    pub fn f(&self, x: f32) -> f32 {
        match self {
            Tanh => x.tanh(),
            Relu => x.max(0.),
            Sigmoid => 1. / (1. + (-x).exp()),
        }
    }

    /// The derivative of `f` evaluated at the pre-activation `x`.
    pub fn df(&self, x: f32) -> f32 {
        match self {
            Tanh => 1. - x.tanh().powi(2),
            Relu => (x > 0.) as u8 as f32,
            Sigmoid => {
                let s = self.f(x);
                s * (1. - s)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relu_clips_negatives() {
        assert_eq!(Relu.f(-3.), 0.);
        assert_eq!(Relu.f(2.5), 2.5);
        assert_eq!(Relu.df(-1.), 0.);
        assert_eq!(Relu.df(1.), 1.);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        const H: f32 = 1e-3;

        for act_fn in [Tanh, Sigmoid] {
            for x in [-2., -0.5, 0., 0.7, 1.9] {
                let numeric = (act_fn.f(x + H) - act_fn.f(x - H)) / (2. * H);
                assert!((numeric - act_fn.df(x)).abs() < 1e-3, "{act_fn:?} at {x}");
            }
        }
    }
}
