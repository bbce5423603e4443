use std::{
    error::Error,
    fmt::{self, Display},
};

use ndarray::ShapeError;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        a: &'static str,
        b: &'static str,
        got: usize,
        expected: usize,
    },
    LabelOutOfRange {
        label: usize,
        classes: usize,
    },
    IndexOutOfRange {
        idx: usize,
        len: usize,
    },
    EmptyDataset,
    NotCompiled,
    InvalidParameter {
        what: &'static str,
        detail: String,
    },
    InvalidShape(ShapeError),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                a,
                b,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch between {a} and {b}, got {got} and expected {expected}"
            ),
            MlErr::LabelOutOfRange { label, classes } => {
                write!(f, "Label {label} is out of range, there are {classes} classes")
            }
            MlErr::IndexOutOfRange { idx, len } => {
                write!(f, "Tried to access sample {idx} of a dataset of length {len}")
            }
            MlErr::EmptyDataset => write!(f, "Can't draw samples from an empty dataset"),
            MlErr::NotCompiled => write!(f, "The model must be compiled before running it"),
            MlErr::InvalidParameter { what, detail } => {
                write!(f, "Invalid value for {what}: {detail}")
            }
            MlErr::InvalidShape(e) => write!(f, "Invalid shape: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::InvalidShape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::InvalidShape(value)
    }
}
