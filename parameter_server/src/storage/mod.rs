mod error;
mod handle;
mod shard;
mod store;

pub use error::{Result, SizeMismatchErr, StorageErr};
pub use handle::ParameterHandle;
use shard::ParameterShard;
pub use store::ParameterStore;
