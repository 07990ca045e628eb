use std::{fmt, fs::OpenOptions, path::Path};

use log::info;

use crate::{
    error::PipelineError,
    features::{FeatureVector, N_FEATURES},
    prediction::PredictionPipeline,
};

/// A prediction kept in the session history.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub features: FeatureVector,
    /// The values as typed, trimmed, in feature order.
    pub inputs: [String; N_FEATURES],
    pub prediction: f64,
}

impl PredictionRecord {
    /// The CSV fields of this record: the six values as typed then the prediction with two
    /// decimals.
    pub fn csv_fields(&self) -> Vec<String> {
        self.inputs
            .iter()
            .cloned()
            .chain(std::iter::once(format!("{:.2}", self.prediction)))
            .collect()
    }
}

impl fmt::Display for PredictionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Features: {} -> Mtest: {:.2}",
            self.features, self.prediction
        )
    }
}

/// An interactive session: predictions made through a shared pipeline and the in-memory history
/// of their results. The history lives as long as the session unless exported.
pub struct Session<'p> {
    pipeline: &'p PredictionPipeline,
    history: Vec<PredictionRecord>,
}

impl<'p> Session<'p> {
    /// Creates a new `Session` with an empty history.
    pub fn new(pipeline: &'p PredictionPipeline) -> Self {
        Self {
            pipeline,
            history: Vec::new(),
        }
    }

    /// Parses the raw fields, predicts and appends the result to the history.
    ///
    /// # Errors
    /// Input and model errors are returned as is and nothing is recorded.
    pub fn predict<S: AsRef<str>>(&mut self, raw: &[S]) -> Result<PredictionRecord, PipelineError> {
        let features = FeatureVector::parse(raw)?;
        let inputs = std::array::from_fn(|i| raw[i].as_ref().trim().to_string());
        self.record(features, inputs)
    }

    /// Same as [`Session::predict`] for already parsed features, recorded in their shortest
    /// decimal form.
    pub fn predict_features(
        &mut self,
        features: FeatureVector,
    ) -> Result<PredictionRecord, PipelineError> {
        let inputs = features.values().map(|v| v.to_string());
        self.record(features, inputs)
    }

    fn record(
        &mut self,
        features: FeatureVector,
        inputs: [String; N_FEATURES],
    ) -> Result<PredictionRecord, PipelineError> {
        let prediction = self.pipeline.predict(&features)?;
        let record = PredictionRecord {
            features,
            inputs,
            prediction,
        };

        self.history.push(record.clone());
        Ok(record)
    }

    pub fn history(&self) -> &[PredictionRecord] {
        &self.history
    }

    pub fn last(&self) -> Option<&PredictionRecord> {
        self.history.last()
    }

    /// The predicted values in history order, as plotted against the prediction count.
    pub fn predictions(&self) -> Vec<f64> {
        self.history.iter().map(|r| r.prediction).collect()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Appends the last prediction as one row to a header-less CSV file.
    ///
    /// # Returns
    /// Whether a row was written, `false` when nothing has been predicted yet.
    pub fn save_last<P: AsRef<Path>>(&self, path: P) -> Result<bool, PipelineError> {
        match self.history.last() {
            Some(record) => {
                append_records(path.as_ref(), std::slice::from_ref(record))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Appends the whole history to a header-less CSV file.
    ///
    /// Rows are never deduplicated: exporting twice, or after `save_last`, writes those
    /// predictions again.
    ///
    /// # Returns
    /// The amount of rows written.
    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<usize, PipelineError> {
        append_records(path.as_ref(), &self.history)?;
        Ok(self.history.len())
    }
}

/// Appends records to `path`, creating it if needed. No header is ever written.
pub fn append_records(path: &Path, records: &[PredictionRecord]) -> Result<(), PipelineError> {
    if records.is_empty() {
        return Ok(());
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    for record in records {
        writer.write_record(record.csv_fields())?;
    }

    writer.flush()?;
    info!("saved {} prediction(s) to {}", records.len(), path.display());
    Ok(())
}
