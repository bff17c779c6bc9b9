use serde::{Deserialize, Serialize};

/// The specification for the `Optimizer` trait.
///
/// Workers send it to the parameter server so that pushed gradients are applied server side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    /// Stochastic gradient descent with momentum, weight decay and gradient clipping.
    Sgd {
        learning_rate: f32,
        momentum: f32,
        weight_decay: f32,
        rescale_grad: f32,
        clip_gradient: Option<f32>,
    },
    GradientDescent {
        learning_rate: f32,
    },
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    /// Stores the latest pushed value as is.
    Assign,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimizer_spec_json_shape() {
        let spec = OptimizerSpec::Sgd {
            learning_rate: 0.01,
            momentum: 0.9,
            weight_decay: 1e-5,
            rescale_grad: 1.0,
            clip_gradient: None,
        };

        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.starts_with("{\"sgd\":"));

        let back: OptimizerSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
