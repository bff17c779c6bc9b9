mod activation;
mod conv;
mod dense;
mod layer;
mod pool;

pub use activation::{Activation, Flatten};
pub use conv::Conv2d;
pub use dense::Dense;
pub use layer::Layer;
pub use pool::MaxPool2d;
