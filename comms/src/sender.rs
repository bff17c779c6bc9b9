//! The sending end of the application layer protocol.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{LEN_TYPE_SIZE, LenType, Serialize};

/// The sending end handle of the communication.
pub struct OnoSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    buf: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> OnoSender<W> {
    /// Creates a new `OnoSender` instance.
    ///
    /// # Arguments
    /// * `tx` - The underlying writer.
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            buf: Vec::new(),
        }
    }

    /// Sends `msg` and flushes the inner writer.
    ///
    /// # Arguments
    /// * `msg` - A serializable object.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        self.feed(msg).await?;
        self.flush().await
    }

    /// Writes `msg` as a single length prefixed frame without flushing the inner writer.
    ///
    /// Fed frames reach the peer once the writer is flushed, either by `flush` or by the next
    /// `send`.
    ///
    /// # Arguments
    /// * `msg` - A serializable object.
    pub async fn feed<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        let Self { buf, tx } = self;

        buf.clear();
        buf.resize(LEN_TYPE_SIZE, 0);

        // payloads of floats are written straight from the caller's slice
        let zero_copy_data = msg.serialize(buf);
        let len = buf.len() - LEN_TYPE_SIZE + zero_copy_data.map_or(0, <[u8]>::len);
        buf[..LEN_TYPE_SIZE].copy_from_slice(&(len as LenType).to_be_bytes());

        tx.write_all(buf).await?;
        if let Some(data) = zero_copy_data {
            tx.write_all(data).await?;
        }

        Ok(())
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        self.tx.flush().await
    }

    /// Flushes and shuts down the writing half of the underlying stream.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.tx.shutdown().await
    }
}
