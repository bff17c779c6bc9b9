mod adam;
mod assign;
mod gradient_descent;
mod optimizer;
mod sgd;

pub use adam::Adam;
pub use assign::Assign;
use comms::specs::OptimizerSpec;
pub use gradient_descent::GradientDescent;
pub use optimizer::Optimizer;
pub use sgd::Sgd;

/// Builds the optimizer described by `spec`.
pub fn from_spec(spec: OptimizerSpec) -> Box<dyn Optimizer + Send> {
    match spec {
        OptimizerSpec::Sgd {
            learning_rate,
            momentum,
            weight_decay,
            rescale_grad,
            clip_gradient,
        } => Box::new(
            Sgd::new(learning_rate, momentum, weight_decay)
                .with_rescale_grad(rescale_grad)
                .with_clip_gradient(clip_gradient),
        ),
        OptimizerSpec::GradientDescent { learning_rate } => {
            Box::new(GradientDescent::new(learning_rate))
        }
        OptimizerSpec::Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } => Box::new(Adam::new(learning_rate, beta1, beta2, epsilon)),
        OptimizerSpec::Assign => Box::new(Assign),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_spec() {
        let mut optimizer = from_spec(OptimizerSpec::GradientDescent { learning_rate: 1. });
        let mut params = [1.];
        optimizer.update_params(&[0.5], &mut params).unwrap();
        assert_eq!(params, [0.5]);

        let mut optimizer = from_spec(OptimizerSpec::Assign);
        optimizer.update_params(&[7.], &mut params).unwrap();
        assert_eq!(params, [7.]);
    }
}
