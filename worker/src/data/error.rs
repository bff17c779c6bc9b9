use std::{error::Error, fmt, io};

/// The data module's result type.
pub type Result<T> = std::result::Result<T, DataErr>;

/// Input loading failures.
#[derive(Debug)]
pub enum DataErr {
    Io(io::Error),
    Csv(csv::Error),
    /// A field that isn't a number, `line` is 1-based and counts the header.
    Parse {
        line: u64,
        field: String,
    },
    /// A row whose width differs from the previous ones.
    RowWidth {
        line: u64,
        got: usize,
        expected: usize,
    },
    EmptyRow {
        line: u64,
    },
    /// A buffer that doesn't hold a whole number of records.
    PartialRecord {
        len: usize,
        sample_size: usize,
    },
    UnsupportedProtocol(String),
    InvalidArgument(&'static str),
}

impl fmt::Display for DataErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataErr::Io(e) => write!(f, "io error: {e}"),
            DataErr::Csv(e) => write!(f, "csv error: {e}"),
            DataErr::Parse { line, field } => {
                write!(f, "line {line}: {field:?} is not a number")
            }
            DataErr::RowWidth {
                line,
                got,
                expected,
            } => write!(f, "line {line}: got {got} fields, expected {expected}"),
            DataErr::EmptyRow { line } => write!(f, "line {line}: empty row"),
            DataErr::PartialRecord { len, sample_size } => write!(
                f,
                "{len} values can't be split in records of {sample_size} values"
            ),
            DataErr::UnsupportedProtocol(protocol) => {
                write!(f, "unsupported filesystem protocol {protocol:?}")
            }
            DataErr::InvalidArgument(e) => write!(f, "invalid argument: {e}"),
        }
    }
}

impl Error for DataErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DataErr::Io(e) => Some(e),
            DataErr::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DataErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for DataErr {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}
