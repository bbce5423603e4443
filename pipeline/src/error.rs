use std::{error::Error, fmt, io};

use machine_learning::MlErr;
use ndarray::ShapeError;

/// The pipeline module's result type.
pub type Result<T> = std::result::Result<T, PipelineErr>;

/// Pipeline runtime failures.
#[derive(Debug)]
pub enum PipelineErr {
    Io(io::Error),
    Json(serde_json::Error),
    Ml(MlErr),
    Shape(ShapeError),
    InvalidConfig(String),
    BackendUnavailable,
    ShapeMismatch {
        what: &'static str,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    Stream {
        stream: usize,
        msg: String,
    },
    StreamClosed {
        stream: usize,
    },
    PinnedDeviceMemory,
}

impl fmt::Display for PipelineErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineErr::Io(e) => write!(f, "io error: {e}"),
            PipelineErr::Json(e) => write!(f, "json error: {e}"),
            PipelineErr::Ml(e) => write!(f, "model error: {e}"),
            PipelineErr::Shape(e) => write!(f, "shape error: {e}"),
            PipelineErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            PipelineErr::BackendUnavailable => write!(f, "compute backend unavailable"),
            PipelineErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "{what} shape mismatch: got {got:?}, expected {expected:?}"),
            PipelineErr::Stream { stream, msg } => {
                write!(f, "execution failed on stream {stream}: {msg}")
            }
            PipelineErr::StreamClosed { stream } => write!(f, "stream {stream} is closed"),
            PipelineErr::PinnedDeviceMemory => write!(f, "only host tensors can be pinned"),
        }
    }
}

impl Error for PipelineErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineErr::Io(e) => Some(e),
            PipelineErr::Json(e) => Some(e),
            PipelineErr::Ml(e) => Some(e),
            PipelineErr::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PipelineErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for PipelineErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<MlErr> for PipelineErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<ShapeError> for PipelineErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<PipelineErr> for io::Error {
    fn from(value: PipelineErr) -> Self {
        match value {
            PipelineErr::Io(e) => e,
            other => io::Error::other(other),
        }
    }
}
