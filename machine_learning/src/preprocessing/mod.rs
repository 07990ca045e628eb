mod min_max;

pub use min_max::{MinMaxScaler, SCALER_FORMAT_VERSION, ScalerArtifact};
