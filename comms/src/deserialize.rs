use std::io;

/// Reads a message back from a received frame, borrowing from it when possible.
pub trait Deserialize<'a>: Sized {
    fn deserialize(buf: &'a mut [u8]) -> io::Result<Self>;
}
