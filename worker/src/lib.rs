pub mod ads;
pub mod config;
pub mod data;
pub mod error;
pub mod lenet;

pub use config::{AdsConfig, LenetConfig};
pub use error::{Result, WorkerErr};
