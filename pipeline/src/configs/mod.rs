mod pipeline;

pub use pipeline::{ENV_DATASET, ENV_MODEL, ENV_SCALER, PipelineConfig, ScalingSource};
