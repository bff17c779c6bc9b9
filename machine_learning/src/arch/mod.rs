pub mod activations;
pub mod layers;
pub mod loss;
pub mod params;
mod sequential;
mod symbol;

pub use sequential::Sequential;
pub use symbol::Symbol;
