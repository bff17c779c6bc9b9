use std::{borrow::Cow, io};

use crate::{Deserialize, Serialize, specs::OptimizerSpec};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

/// Identifies a parameter array in the key-value store.
pub type Key = u32;
const KEY_SIZE: usize = size_of::<Key>();

const ERR_KIND: Header = 0;
const CONTROL_KIND: Header = 1;
const INIT_KIND: Header = 2;
const PUSH_KIND: Header = 3;
const VALUES_KIND: Header = 4;

/// The payload data for the `Data` variant of the `Msg` enum.
///
/// Every payload is bound to a key of the key-value store.
#[derive(Debug)]
pub enum Payload<'a> {
    /// Initial value for a key, only the first one received by the server is kept.
    Init { key: Key, values: &'a [f32] },
    /// A gradient pushed by a worker.
    Push { key: Key, grad: &'a [f32] },
    /// The current value of a key, answer to a `Command::Pull`.
    Values { key: Key, values: &'a mut [f32] },
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Connect,
    Assign {
        rank: usize,
        num_workers: usize,
        synchronous: bool,
    },
    SetOptimizer(OptimizerSpec),
    Pull { key: Key },
    Barrier,
    BarrierDone,
    Disconnect,
}

/// The application layer message for the entire system.
#[derive(Debug)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    /// A short name of the message kind, meant for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Control(_) => "control",
            Msg::Err(_) => "err",
            Msg::Data(Payload::Init { .. }) => "data/init",
            Msg::Data(Payload::Push { .. }) => "data/push",
            Msg::Data(Payload::Values { .. }) => "data/values",
        }
    }

    fn buf_is_too_small<T>(size: usize, needed: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {needed} bytes"),
        ))
    }

    fn invalid_kind<T>(kind: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind header {kind}"),
        ))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        match self {
            Msg::Err(e) => {
                buf.extend_from_slice(&ERR_KIND.to_be_bytes());
                Some(e.as_bytes())
            }
            Msg::Control(cmd) => {
                buf.extend_from_slice(&CONTROL_KIND.to_be_bytes());

                // SAFETY: Serialize impl for `Command` is derived and not implemented
                //         by hand. Nor has a non string-key map inside.
                serde_json::to_writer(buf, cmd).unwrap();
                None
            }
            Msg::Data(payload) => {
                let (kind, key, nums) = match payload {
                    Payload::Init { key, values } => (INIT_KIND, key, &**values),
                    Payload::Push { key, grad } => (PUSH_KIND, key, &**grad),
                    Payload::Values { key, values } => (VALUES_KIND, key, &**values),
                };

                buf.extend_from_slice(&kind.to_be_bytes());
                buf.extend_from_slice(&key.to_be_bytes());
                Some(bytemuck::cast_slice(nums))
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a mut [u8]) -> io::Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Self::buf_is_too_small(buf.len(), HEADER_SIZE);
        }

        let (kind_buf, rest) = buf.split_at_mut(HEADER_SIZE);

        // SAFETY: We splitted the buffer to be of size `HEADER_SIZE` just above.
        let kind = Header::from_be_bytes(kind_buf.try_into().unwrap());

        match kind {
            ERR_KIND => {
                let string = str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(string)))
            }
            CONTROL_KIND => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            INIT_KIND | PUSH_KIND | VALUES_KIND => {
                if rest.len() < KEY_SIZE {
                    return Self::buf_is_too_small(rest.len() + HEADER_SIZE, HEADER_SIZE + KEY_SIZE);
                }

                let (key_buf, nums) = rest.split_at_mut(KEY_SIZE);

                // SAFETY: Same as above, the split leaves exactly `KEY_SIZE` bytes.
                let key = Key::from_be_bytes((&*key_buf).try_into().unwrap());
                let nums: &mut [f32] = bytemuck::try_cast_slice_mut(nums)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, format!("{err:?}")))?;

                let payload = match kind {
                    INIT_KIND => Payload::Init { key, values: nums },
                    PUSH_KIND => Payload::Push { key, grad: nums },
                    _ => Payload::Values { key, values: nums },
                };

                Ok(Self::Data(payload))
            }
            kind => Self::invalid_kind(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(msg: &Msg) -> Vec<u32> {
        let mut buf = Vec::new();
        let tail = msg.serialize(&mut buf).map(<[u8]>::to_vec);
        buf.extend(tail.unwrap_or_default());

        // Copy into a 4 byte aligned buffer, like `OnoReceiver` does.
        let mut aligned = vec![0u32; buf.len().div_ceil(4)];
        bytemuck::cast_slice_mut::<u32, u8>(&mut aligned)[..buf.len()].copy_from_slice(&buf);
        aligned.truncate(buf.len() / 4);
        aligned
    }

    #[test]
    fn push_keeps_key_and_gradient() {
        let grad = [1.0, -2.5, 3.0];
        let mut aligned = frame(&Msg::Data(Payload::Push { key: 7, grad: &grad }));

        let msg = Msg::deserialize(bytemuck::cast_slice_mut(&mut aligned)).unwrap();
        let Msg::Data(Payload::Push { key, grad: got }) = msg else {
            panic!("unexpected message {msg:?}");
        };

        assert_eq!(key, 7);
        assert_eq!(got, grad);
    }

    #[test]
    fn control_command() {
        let cmd = Command::Assign {
            rank: 1,
            num_workers: 3,
            synchronous: true,
        };

        let mut buf = Vec::new();
        assert!(Msg::Control(cmd).serialize(&mut buf).is_none());

        let msg = Msg::deserialize(&mut buf).unwrap();
        assert!(matches!(msg, Msg::Control(c) if c == cmd));
    }

    #[test]
    fn invalid_kind_is_rejected() {
        let mut buf = 9u32.to_be_bytes().to_vec();
        let err = Msg::deserialize(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn data_without_key_is_rejected() {
        let mut buf = PUSH_KIND.to_be_bytes().to_vec();
        assert!(Msg::deserialize(&mut buf).is_err());
    }
}
