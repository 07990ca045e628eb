use std::{fmt, io};

use machine_learning::MlErr;

/// A raw feature value that can't be turned into a [`crate::FeatureVector`].
#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    /// The amount of values doesn't match the feature schema.
    WrongArity { got: usize, expected: usize },
    /// A value couldn't be parsed as a number.
    NotNumeric { feature: &'static str, value: String },
    /// A value parsed but is NaN or infinite.
    NonFinite { feature: &'static str },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongArity { got, expected } => {
                write!(f, "expected {expected} feature values, got {got}")
            }
            Self::NotNumeric { feature, value } => {
                write!(f, "{feature}: '{value}' is not a number")
            }
            Self::NonFinite { feature } => write!(f, "{feature}: value must be finite"),
        }
    }
}

impl std::error::Error for InputError {}

/// All errors that can occur in the prediction pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// A resource needed at startup is missing or malformed. Fatal.
    Configuration(String),
    /// The caller supplied unusable feature values. The caller may re-prompt.
    Input(InputError),
    /// The model failed while predicting. Deterministic, so never retried.
    Model(MlErr),
    /// `predict` was requested before the pipeline finished initializing.
    NotInitialized,
    /// Writing prediction records failed.
    Io(io::Error),
}

impl PipelineError {
    /// Wraps a startup failure with the resource it was about.
    pub(crate) fn config(context: impl fmt::Display, source: impl fmt::Display) -> Self {
        Self::Configuration(format!("{context}: {source}"))
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::Input(e) => write!(f, "input error: {e}"),
            Self::Model(e) => write!(f, "model error: {e}"),
            Self::NotInitialized => write!(f, "the prediction pipeline is not initialized"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Input(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<InputError> for PipelineError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

impl From<io::Error> for PipelineError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for PipelineError {
    fn from(e: csv::Error) -> Self {
        Self::Io(e.into())
    }
}
