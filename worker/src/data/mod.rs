pub mod csv;
pub mod dataloader;
pub mod dataset;
mod error;
pub mod fs;
pub mod records;
pub mod shard;

pub use self::csv::{LabeledData, load_csv};
pub use dataloader::DataLoader;
pub use dataset::{BatchRef, InMemoryDataset};
pub use error::{DataErr, Result};
pub use records::{DataReader, split_records};
pub use shard::{ShardSpec, round_robin, shard_range};
