use std::{
    error::Error,
    fmt::{self, Display},
};

use ndarray::ShapeError;
use rand_distr::{NormalError, uniform::Error as UniformError};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidShape {
        layer: String,
        reason: String,
    },
    InputShape {
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    InvalidLabel {
        label: f32,
        classes: usize,
    },
    EmptyBatch,
    BackwardWithoutForward,
    Shape(ShapeError),
    Rand(String),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::InvalidShape { layer, reason } => {
                write!(f, "Can't infer the shape of layer {layer}: {reason}")
            }
            MlErr::InputShape { got, expected } => write!(
                f,
                "The input sample shape {got:?} doesn't match the bound shape {expected:?}"
            ),
            MlErr::InvalidLabel { label, classes } => {
                write!(f, "Label {label} is not a class index in 0..{classes}")
            }
            MlErr::EmptyBatch => write!(f, "Tried to run the network over an empty batch"),
            MlErr::BackwardWithoutForward => {
                write!(f, "Backward called without a previous training forward pass")
            }
            MlErr::Shape(e) => write!(f, "shape error: {e}"),
            MlErr::Rand(e) => write!(f, "invalid random distribution: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<NormalError> for MlErr {
    fn from(value: NormalError) -> Self {
        Self::Rand(value.to_string())
    }
}

impl From<UniformError> for MlErr {
    fn from(value: UniformError) -> Self {
        Self::Rand(value.to_string())
    }
}
