use std::{borrow::Cow, io, sync::Arc};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Key, Msg, Payload},
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::Barrier,
};

use super::table::ParamTable;
use crate::{KvErr, Result, synchronization::Synchronizer};

/// The server side of the conversation with a single worker.
pub(super) struct Session<S, R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub rank: usize,
    pub num_workers: usize,
    pub rx: OnoReceiver<R>,
    pub tx: OnoSender<W>,
    pub table: Arc<ParamTable>,
    pub sync: S,
    pub barrier: Arc<Barrier>,
}

impl<S, R, W> Session<S, R, W>
where
    S: Synchronizer + Sync,
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Serves the worker until it disconnects.
    pub async fn run(self) -> Result<()> {
        let Self {
            rank,
            num_workers,
            mut rx,
            mut tx,
            table,
            sync,
            barrier,
        } = self;

        let mut rx_buf: Vec<u32> = Vec::new();
        let mut out = Vec::new();

        let msg: Msg = rx.recv_into(&mut rx_buf).await?;
        let Msg::Control(Command::Connect) = msg else {
            return Err(KvErr::UnexpectedMessage(msg.kind()));
        };

        let assign = Command::Assign {
            rank,
            num_workers,
            synchronous: sync.synchronous(),
        };
        tx.send(&Msg::Control(assign)).await?;
        info!(rank = rank; "worker connected");

        loop {
            let msg: Msg = match rx.recv_into(&mut rx_buf).await {
                Ok(msg) => msg,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!(rank = rank; "worker left without disconnecting");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            debug!(rank = rank, kind = msg.kind(); "received message");

            let res = match msg {
                Msg::Data(Payload::Init { key, values }) => {
                    if !table.init(key, values) {
                        debug!(rank = rank, key = key; "key already initialized");
                    }
                    Ok(())
                }
                Msg::Data(Payload::Push { key, grad }) => push(&table, &sync, key, grad).await,
                Msg::Control(Command::Pull { key }) => match pull(&table, key, &mut out).await {
                    Ok(()) => {
                        let values = Msg::Data(Payload::Values {
                            key,
                            values: &mut out,
                        });
                        tx.send(&values).await?;
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                Msg::Control(Command::SetOptimizer(spec)) => {
                    info!("optimizer set to {spec:?}");
                    table.set_optimizer(spec);
                    Ok(())
                }
                Msg::Control(Command::Barrier) => {
                    barrier.wait().await;
                    tx.send(&Msg::Control(Command::BarrierDone)).await?;
                    Ok(())
                }
                Msg::Control(Command::Disconnect) => break,
                Msg::Err(e) => return Err(KvErr::Remote(e.into_owned())),
                other => Err(KvErr::UnexpectedMessage(other.kind())),
            };

            if let Err(e) = res {
                warn!(rank = rank; "{e}");
                tx.send(&Msg::Err(Cow::Owned(e.to_string()))).await?;
            }
        }

        info!(rank = rank; "worker disconnected");
        Ok(())
    }
}

async fn push<S>(table: &ParamTable, sync: &S, key: Key, grad: &[f32]) -> Result<()>
where
    S: Synchronizer + Sync,
{
    let handle = table.get(key)?;
    sync.push(&handle, grad).await.map_err(KvErr::for_key(key))
}

async fn pull(table: &ParamTable, key: Key, out: &mut Vec<f32>) -> Result<()> {
    let handle = table.get(key)?;
    out.resize(handle.len(), 0.);
    handle.pull_params(out).await.map_err(KvErr::for_key(key))
}
