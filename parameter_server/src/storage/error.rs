use std::{
    error::Error,
    fmt::{self, Display},
};

use machine_learning::MlErr;

/// The specific result type for the operations of the storage module.
pub type Result<T> = std::result::Result<T, StorageErr>;

/// Error returned whenever there is a size mismatch between gradients, parameters and
/// external buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeMismatchErr {
    pub got: usize,
    pub expected: usize,
}

impl Display for SizeMismatchErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "the provided buffer has {} values but the storage holds {}",
            self.got, self.expected
        )
    }
}

impl Error for SizeMismatchErr {}

/// Failures of a stored parameter array.
#[derive(Debug)]
pub enum StorageErr {
    SizeMismatch(SizeMismatchErr),
    /// The optimizer couldn't apply the accumulated gradient.
    Optimizer(MlErr),
}

impl Display for StorageErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageErr::SizeMismatch(e) => write!(f, "{e}"),
            StorageErr::Optimizer(e) => write!(f, "the optimizer failed: {e}"),
        }
    }
}

impl Error for StorageErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StorageErr::SizeMismatch(e) => Some(e),
            StorageErr::Optimizer(e) => Some(e),
        }
    }
}

impl From<SizeMismatchErr> for StorageErr {
    fn from(value: SizeMismatchErr) -> Self {
        Self::SizeMismatch(value)
    }
}

impl From<MlErr> for StorageErr {
    fn from(value: MlErr) -> Self {
        Self::Optimizer(value)
    }
}
