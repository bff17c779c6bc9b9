pub mod arch;
pub mod error;
pub mod executor;
pub mod initialization;
pub mod metrics;
pub mod optimization;

pub use error::{MlErr, Result};
pub use executor::Executor;
