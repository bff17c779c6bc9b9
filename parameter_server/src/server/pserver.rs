use std::{num::NonZeroUsize, sync::Arc};

use comms::{OnoReceiver, OnoSender};
use log::info;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
    sync::Barrier,
    task::JoinSet,
};

use super::{session::Session, table::ParamTable};
use crate::{KvErr, Result, synchronization::Synchronizer};

/// The default maximum amount of parameters per storage shard.
pub const DEFAULT_SHARD_SIZE: NonZeroUsize = NonZeroUsize::new(1 << 16).unwrap();

/// The central server structure, it handles task management and io between workers.
pub struct ParameterServer<S: Synchronizer> {
    tasks: JoinSet<Result<()>>,
    table: Arc<ParamTable>,
    barrier: Arc<Barrier>,
    sync: S,
    num_workers: usize,
    next_rank: usize,
}

impl<S: Synchronizer + Sync + 'static> ParameterServer<S> {
    /// Creates a new `ParameterServer`.
    ///
    /// # Arguments
    /// * `num_workers` - The amount of workers taking part in the job.
    /// * `shard_size` - The maximum amount of parameters per storage shard.
    /// * `sync` - Decides when pushed gradients are applied.
    pub fn new(num_workers: usize, shard_size: NonZeroUsize, sync: S) -> Self {
        Self {
            tasks: JoinSet::new(),
            table: Arc::new(ParamTable::new(shard_size)),
            barrier: Arc::new(Barrier::new(num_workers)),
            sync,
            num_workers,
            next_rank: 0,
        }
    }

    /// Binds a new worker to this server, ranks are given in order of arrival.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    pub fn spawn<R, W>(&mut self, rx: OnoReceiver<R>, tx: OnoSender<W>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let session = Session {
            rank: self.next_rank,
            num_workers: self.num_workers,
            rx,
            tx,
            table: Arc::clone(&self.table),
            sync: self.sync.clone(),
            barrier: Arc::clone(&self.barrier),
        };

        self.next_rank += 1;
        self.tasks.spawn(session.run());
    }

    /// Waits until every spawned worker disconnects.
    pub async fn run(&mut self) -> Result<()> {
        while let Some(res) = self.tasks.join_next().await {
            res.map_err(|e| KvErr::Remote(format!("worker session panicked: {e}")))??;
        }

        Ok(())
    }

    /// Accepts the connections of every worker and serves them until they all disconnect.
    pub async fn serve(mut self, listener: TcpListener) -> Result<()> {
        while self.next_rank < self.num_workers {
            let (stream, addr) = listener.accept().await?;
            info!("worker connected from {addr}");

            let (rx, tx) = stream.into_split();
            let (rx, tx) = comms::channel(rx, tx);
            self.spawn(rx, tx);
        }

        self.run().await
    }
}
