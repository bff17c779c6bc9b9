use std::{error::Error, fmt, io};

use machine_learning::MlErr;
use parameter_server::KvErr;

use crate::data::DataErr;

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Driver failures.
#[derive(Debug)]
pub enum WorkerErr {
    Io(io::Error),
    Data(DataErr),
    Ml(MlErr),
    Kv(KvErr),
    Config(String),
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Io(e) => write!(f, "io error: {e}"),
            WorkerErr::Data(e) => write!(f, "data error: {e}"),
            WorkerErr::Ml(e) => write!(f, "network error: {e}"),
            WorkerErr::Kv(e) => write!(f, "key-value store error: {e}"),
            WorkerErr::Config(e) => write!(f, "invalid configuration: {e}"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Io(e) => Some(e),
            WorkerErr::Data(e) => Some(e),
            WorkerErr::Ml(e) => Some(e),
            WorkerErr::Kv(e) => Some(e),
            WorkerErr::Config(_) => None,
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DataErr> for WorkerErr {
    fn from(value: DataErr) -> Self {
        Self::Data(value)
    }
}

impl From<MlErr> for WorkerErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<KvErr> for WorkerErr {
    fn from(value: KvErr) -> Self {
        Self::Kv(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<WorkerErr> for io::Error {
    fn from(value: WorkerErr) -> Self {
        match value {
            WorkerErr::Io(e) => e,
            WorkerErr::Kv(e) => e.into(),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
