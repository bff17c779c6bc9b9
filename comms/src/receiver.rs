//! The receiving end of the application layer protocol.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Align4, DEFAULT_MAX_FRAME_LEN, Deserialize, LEN_TYPE_SIZE, LenType};

/// The receiving end handle of the communication.
pub struct OnoReceiver<R: AsyncRead + Unpin> {
    rx: R,
    max_frame_len: usize,
}

impl<R: AsyncRead + Unpin> OnoReceiver<R> {
    /// Creates a new `OnoReceiver` instance accepting frames of up to `DEFAULT_MAX_FRAME_LEN`.
    ///
    /// # Arguments
    /// * `rx` - The underlying reader.
    pub(super) fn new(rx: R) -> Self {
        Self {
            rx,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Sets the size in bytes of the largest frame this receiver accepts.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Waits to receive a new message from the inner receiver.
    ///
    /// # Arguments
    /// * `buf` - The buffer to use for deserialization, the returned
    ///   `T`'s lifetimes will be tied to this buffer.
    ///
    /// # Returns
    /// The received message, or an `io::Error` if reading fails or the frame is over the limit.
    pub async fn recv_into<'buf, T, B>(&mut self, buf: &'buf mut Vec<B>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
        B: Align4,
    {
        let mut size_buf = [0; LEN_TYPE_SIZE];
        self.rx.read_exact(&mut size_buf).await?;

        let len = usize::try_from(LenType::from_be_bytes(size_buf))
            .ok()
            .filter(|&len| len <= self.max_frame_len)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("frame is over the {} bytes limit", self.max_frame_len),
                )
            })?;

        buf.clear();
        buf.resize(len.div_ceil(size_of::<B>()), B::zeroed());

        let view: &mut [u8] = bytemuck::cast_slice_mut(buf);
        let slice = &mut view[..len];
        self.rx.read_exact(slice).await?;

        T::deserialize(slice)
    }
}
