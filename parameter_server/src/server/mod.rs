mod pserver;
mod session;
mod table;

use log::info;
use tokio::net::TcpListener;

pub use pserver::{DEFAULT_SHARD_SIZE, ParameterServer};

use crate::{
    KvConfig, KvStoreKind, Result,
    synchronization::{BarrierSync, NoBlockingSync},
};

/// Runs the server of a distributed job until every worker leaves.
pub async fn run(config: &KvConfig) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", config.root_port)).await?;
    let n = config.num_workers;

    info!(
        "serving {} for {n} workers on port {}",
        config.kind, config.root_port
    );

    match config.kind {
        KvStoreKind::DistSync => {
            ParameterServer::new(n, DEFAULT_SHARD_SIZE, BarrierSync::new(n))
                .serve(listener)
                .await
        }
        _ => {
            ParameterServer::new(n, DEFAULT_SHARD_SIZE, NoBlockingSync::new())
                .serve(listener)
                .await
        }
    }
}
