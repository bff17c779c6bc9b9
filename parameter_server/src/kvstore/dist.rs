use std::{io, time::Duration};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Key, Msg, Payload},
    specs::OptimizerSpec,
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    time,
};

use super::KvStore;
use crate::{KvErr, Result};

const CONNECT_ATTEMPTS: usize = 30;
const CONNECT_BACKOFF: Duration = Duration::from_millis(500);

/// The worker side of a distributed store, every operation is a message to the server.
///
/// `init` and `push` are buffered and reach the server with the next `pull`, `barrier` or `close`.
pub struct DistKvStore<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: OnoReceiver<R>,
    tx: OnoSender<W>,
    rank: usize,
    num_workers: usize,
    synchronous: bool,
    rx_buf: Vec<u32>,
}

impl DistKvStore<OwnedReadHalf, OwnedWriteHalf> {
    /// Connects to the server at `addr`, retrying while it isn't listening yet.
    pub async fn connect(addr: &str) -> Result<Self> {
        let mut attempt = 1;

        let stream = loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => break stream,
                Err(e) if attempt < CONNECT_ATTEMPTS => {
                    warn!("couldn't connect to {addr} (attempt {attempt}): {e}");
                    attempt += 1;
                    time::sleep(CONNECT_BACKOFF).await;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);
        Self::handshake(rx, tx).await
    }
}

impl<R, W> DistKvStore<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Announces this worker to the server and waits for its rank.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    pub async fn handshake(mut rx: OnoReceiver<R>, mut tx: OnoSender<W>) -> Result<Self> {
        tx.send(&Msg::Control(Command::Connect)).await?;

        let mut rx_buf: Vec<u32> = Vec::new();
        let msg: Msg = rx.recv_into(&mut rx_buf).await?;
        let Msg::Control(Command::Assign {
            rank,
            num_workers,
            synchronous,
        }) = msg
        else {
            return Err(unexpected(msg));
        };

        info!(
            rank = rank, synchronous = synchronous;
            "joined the key-value store with {num_workers} workers"
        );

        Ok(Self {
            rx,
            tx,
            rank,
            num_workers,
            synchronous,
            rx_buf,
        })
    }
}

fn unexpected(msg: Msg) -> KvErr {
    match msg {
        Msg::Err(e) => KvErr::Remote(e.into_owned()),
        other => KvErr::UnexpectedMessage(other.kind()),
    }
}

impl<R, W> KvStore for DistKvStore<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn rank(&self) -> usize {
        self.rank
    }

    fn num_workers(&self) -> usize {
        self.num_workers
    }

    async fn set_optimizer(&mut self, spec: OptimizerSpec) -> Result<()> {
        if self.rank != 0 {
            return Ok(());
        }

        debug!("sending optimizer {spec:?}");
        self.tx.send(&Msg::Control(Command::SetOptimizer(spec))).await?;
        Ok(())
    }

    async fn init(&mut self, key: Key, values: &[f32]) -> Result<()> {
        let msg = Msg::Data(Payload::Init { key, values });
        self.tx.feed(&msg).await?;
        Ok(())
    }

    async fn push(&mut self, key: Key, grad: &[f32]) -> Result<()> {
        let msg = Msg::Data(Payload::Push { key, grad });
        self.tx.feed(&msg).await?;
        Ok(())
    }

    async fn pull(&mut self, key: Key, out: &mut [f32]) -> Result<()> {
        self.tx.send(&Msg::Control(Command::Pull { key })).await?;

        let msg: Msg = self.rx.recv_into(&mut self.rx_buf).await?;
        let Msg::Data(Payload::Values { key: got, values }) = msg else {
            return Err(unexpected(msg));
        };

        if got != key {
            return Err(KvErr::KeyMismatch { expected: key, got });
        }

        if values.len() != out.len() {
            return Err(KvErr::SizeMismatch {
                key,
                got: values.len(),
                expected: out.len(),
            });
        }

        out.copy_from_slice(values);
        Ok(())
    }

    async fn barrier(&mut self) -> Result<()> {
        self.tx.send(&Msg::Control(Command::Barrier)).await?;

        let msg: Msg = self.rx.recv_into(&mut self.rx_buf).await?;
        match msg {
            Msg::Control(Command::BarrierDone) => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.tx.send(&Msg::Control(Command::Disconnect)).await?;

        match self.tx.shutdown().await {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e.into()),
            _ => Ok(()),
        }
    }
}
