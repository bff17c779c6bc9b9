use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use comms::msg::Key;
use machine_learning::MlErr;

use crate::storage::{SizeMismatchErr, StorageErr};

/// The key-value store's result type.
pub type Result<T> = std::result::Result<T, KvErr>;

/// Failures of the key-value store, both on the worker and on the server side.
#[derive(Debug)]
pub enum KvErr {
    Io(io::Error),
    UnknownKey(Key),
    KeyMismatch {
        expected: Key,
        got: Key,
    },
    SizeMismatch {
        key: Key,
        got: usize,
        expected: usize,
    },
    UnexpectedMessage(&'static str),
    Remote(String),
    Config(String),
    Optimizer(MlErr),
}

impl Display for KvErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvErr::Io(e) => write!(f, "io error: {e}"),
            KvErr::UnknownKey(key) => write!(f, "key {key} was never initialized"),
            KvErr::KeyMismatch { expected, got } => {
                write!(f, "expected values for key {expected}, got key {got}")
            }
            KvErr::SizeMismatch { key, got, expected } => write!(
                f,
                "size mismatch for key {key}: got {got}, expected {expected}"
            ),
            KvErr::UnexpectedMessage(kind) => write!(f, "unexpected message: got {kind}"),
            KvErr::Remote(e) => write!(f, "the remote end failed: {e}"),
            KvErr::Config(e) => write!(f, "invalid configuration: {e}"),
            KvErr::Optimizer(e) => write!(f, "optimizer error: {e}"),
        }
    }
}

impl Error for KvErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            KvErr::Io(e) => Some(e),
            KvErr::Optimizer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for KvErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<MlErr> for KvErr {
    fn from(value: MlErr) -> Self {
        Self::Optimizer(value)
    }
}

impl KvErr {
    /// Attaches the key to a storage failure.
    pub(crate) fn for_key(key: Key) -> impl FnOnce(StorageErr) -> Self {
        move |e| match e {
            StorageErr::SizeMismatch(SizeMismatchErr { got, expected }) => {
                Self::SizeMismatch { key, got, expected }
            }
            StorageErr::Optimizer(e) => Self::Optimizer(e),
        }
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<KvErr> for io::Error {
    fn from(value: KvErr) -> Self {
        match value {
            KvErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
