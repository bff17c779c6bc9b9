pub mod config;
pub mod error;
pub mod kvstore;
pub mod server;
mod storage;
mod synchronization;

pub use config::{KvConfig, KvStoreKind, Role};
pub use error::{KvErr, Result};
pub use kvstore::{DistKvStore, KvStore, LocalKvStore};
pub use server::{DEFAULT_SHARD_SIZE, ParameterServer};
pub use synchronization::{BarrierSync, NoBlockingSync, Synchronizer};
