use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

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
    Io(io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Dataset {
        line: u64,
        reason: String,
    },
    EmptyDataset,
    InvalidArtifact(String),
    NonFinite {
        what: &'static str,
    },
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
            MlErr::Io(e) => write!(f, "io error: {e}"),
            MlErr::Csv(e) => write!(f, "csv error: {e}"),
            MlErr::Json(e) => write!(f, "json error: {e}"),
            MlErr::Dataset { line, reason } => write!(f, "dataset line {line}: {reason}"),
            MlErr::EmptyDataset => write!(f, "the dataset has no samples"),
            MlErr::InvalidArtifact(reason) => write!(f, "invalid artifact: {reason}"),
            MlErr::NonFinite { what } => write!(f, "{what} is not a finite number"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Io(e) => Some(e),
            MlErr::Csv(e) => Some(e),
            MlErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for MlErr {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<serde_json::Error> for MlErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
