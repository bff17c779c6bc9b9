mod logistic;
mod loss_fn;
mod softmax;

pub use logistic::LogisticRegressionOutput;
pub use loss_fn::LossFn;
pub use softmax::SoftmaxOutput;
