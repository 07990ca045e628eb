mod cell;
pub mod configs;
pub mod error;
mod features;
mod prediction;
mod session;

pub use cell::{PipelineCell, PipelineState};
pub use configs::{PipelineConfig, ScalingSource};
pub use error::{InputError, PipelineError};
pub use features::{FEATURES, Feature, FeatureVector, N_FEATURES, feature_symbols};
pub use prediction::{FEATURE_RANGE, PredictionPipeline, fit_scaler};
pub use session::{PredictionRecord, Session, append_records};

/// Builds a prediction pipeline from the given config.
///
/// # Errors
/// Returns a `PipelineError::Configuration` if any resource is missing or malformed.
pub fn initialize(config: &PipelineConfig) -> Result<PredictionPipeline, PipelineError> {
    log::info!(
        "model: {}, scaling: {:?}",
        config.model.display(),
        config.scaling
    );
    PredictionPipeline::initialize(config)
}
