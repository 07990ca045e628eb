use std::{fmt, path::Path};

use log::{debug, info, warn};
use machine_learning::{
    arch::Model,
    artifact::ModelArtifact,
    dataset::Dataset,
    preprocessing::{MinMaxScaler, ScalerArtifact},
};
use ndarray::Array1;

use crate::{
    configs::{PipelineConfig, ScalingSource},
    error::PipelineError,
    features::{FeatureVector, N_FEATURES, feature_symbols},
};

/// The range every feature is mapped into when bounds are fitted here.
pub const FEATURE_RANGE: (f64, f64) = (-1.0, 1.0);

/// Turns raw feature vectors into predictions: min/max scaling followed by the pre-trained model.
///
/// Both parts are immutable once built, so a pipeline can be shared by reference between
/// threads and queried without locking.
pub struct PredictionPipeline {
    scaler: MinMaxScaler,
    model: Box<dyn Model>,
}

impl PredictionPipeline {
    /// Loads the scaling bounds and the model described by `config`.
    ///
    /// # Errors
    /// Returns `PipelineError::Configuration` if any resource is missing or malformed.
    pub fn initialize(config: &PipelineConfig) -> Result<Self, PipelineError> {
        info!("initializing prediction pipeline");
        config.validate()?;
        let scaler = resolve_scaler(config)?;

        let model = ModelArtifact::load(&config.model)
            .and_then(ModelArtifact::build)
            .map_err(|e| PipelineError::config(resource("model", &config.model), e))?;

        Self::from_parts(scaler, model)
    }

    /// Creates a pipeline from an already fitted scaler and an already loaded model.
    ///
    /// # Errors
    /// Returns `PipelineError::Configuration` if either part isn't six features wide or the
    /// scaler doesn't map into [`FEATURE_RANGE`].
    pub fn from_parts(scaler: MinMaxScaler, model: Box<dyn Model>) -> Result<Self, PipelineError> {
        if scaler.n_features() != N_FEATURES {
            return Err(PipelineError::Configuration(format!(
                "scaler has {} features, expected {N_FEATURES}",
                scaler.n_features()
            )));
        }

        if scaler.feature_range() != FEATURE_RANGE {
            return Err(PipelineError::Configuration(format!(
                "scaler maps into {:?}, expected {FEATURE_RANGE:?}",
                scaler.feature_range()
            )));
        }

        if model.n_features() != N_FEATURES {
            return Err(PipelineError::Configuration(format!(
                "model takes {} features, expected {N_FEATURES}",
                model.n_features()
            )));
        }

        Ok(Self { scaler, model })
    }

    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }

    /// Scales a feature vector with the fitted bounds. Values are never clamped.
    pub fn scale(&self, features: &FeatureVector) -> Result<Array1<f64>, PipelineError> {
        self.scaler
            .transform(features.view())
            .map_err(PipelineError::Model)
    }

    /// Predicts the flexural capacity for the given features.
    ///
    /// # Errors
    /// Returns `PipelineError::Model` if the model fails to produce a finite value.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, PipelineError> {
        let scaled = self.scale(features)?;
        let y = self
            .model
            .predict(scaled.view())
            .map_err(PipelineError::Model)?;

        debug!("predicted {y} for {features}");
        Ok(y)
    }

    /// Parses raw text fields and predicts.
    ///
    /// # Errors
    /// Returns `PipelineError::Input` without touching the model if the fields don't parse.
    pub fn predict_raw<S: AsRef<str>>(&self, raw: &[S]) -> Result<f64, PipelineError> {
        let features = FeatureVector::parse(raw)?;
        self.predict(&features)
    }
}

impl fmt::Debug for PredictionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictionPipeline")
            .field("scaler", &self.scaler)
            .field("model_features", &self.model.n_features())
            .finish()
    }
}

/// Fits a scaler over the feature columns of a reference dataset, leaving the target out.
///
/// # Errors
/// Returns `PipelineError::Configuration` if the dataset is missing or has the wrong shape.
pub fn fit_scaler<P: AsRef<Path>>(dataset: P) -> Result<MinMaxScaler, PipelineError> {
    let path = dataset.as_ref();
    let dataset = Dataset::from_csv(path, N_FEATURES)
        .map_err(|e| PipelineError::config(resource("reference dataset", path), e))?;

    info!(
        "fitting scaling bounds on {} samples from {}",
        dataset.len(),
        path.display()
    );

    MinMaxScaler::fit(dataset.features(), FEATURE_RANGE)
        .map_err(|e| PipelineError::config(resource("reference dataset", path), e))
}

fn resolve_scaler(config: &PipelineConfig) -> Result<MinMaxScaler, PipelineError> {
    match &config.scaling {
        ScalingSource::Artifact { path } => {
            let scaler = load_scaler(path)?;

            if let Some(reference) = &config.reference_dataset {
                let refit = fit_scaler(reference)?;
                if refit.same_bounds(&scaler) {
                    info!("reference dataset {} matches the scaler bounds", reference.display());
                } else {
                    warn!(
                        "reference dataset {} yields different scaling bounds than {}, keeping the artifact bounds",
                        reference.display(),
                        path.display()
                    );
                }
            }

            Ok(scaler)
        }
        ScalingSource::Dataset { path } => {
            warn!(
                "refitting scaling bounds from {}, predictions shift if it differs from the training data",
                path.display()
            );
            fit_scaler(path)
        }
    }
}

fn load_scaler(path: &Path) -> Result<MinMaxScaler, PipelineError> {
    let artifact = ScalerArtifact::load(path)
        .map_err(|e| PipelineError::config(resource("scaler", path), e))?;

    let expected = feature_symbols();
    if !artifact.feature_names.is_empty() && artifact.feature_names != expected {
        return Err(PipelineError::Configuration(format!(
            "{}: feature order {:?} does not match {:?}",
            resource("scaler", path),
            artifact.feature_names,
            expected
        )));
    }

    info!(
        "loaded scaler v{} fitted on {} samples from {}",
        artifact.format_version,
        artifact.n_samples_seen,
        path.display()
    );

    artifact
        .into_scaler()
        .map_err(|e| PipelineError::config(resource("scaler", path), e))
}

fn resource(what: &str, path: &Path) -> String {
    format!("{what} '{}'", path.display())
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use machine_learning::MlErr;
    use ndarray::{Array2, ArrayView1, array};

    use super::*;

    /// Sums the scaled features and counts how many times it was asked.
    struct CountingModel {
        calls: Arc<AtomicUsize>,
    }

    impl Model for CountingModel {
        fn n_features(&self) -> usize {
            N_FEATURES
        }

        fn predict(&self, x: ArrayView1<f64>) -> machine_learning::Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(x.sum())
        }
    }

    struct FailingModel;

    impl Model for FailingModel {
        fn n_features(&self) -> usize {
            N_FEATURES
        }

        fn predict(&self, _x: ArrayView1<f64>) -> machine_learning::Result<f64> {
            Err(MlErr::NonFinite {
                what: "the model output",
            })
        }
    }

    fn scaler() -> MinMaxScaler {
        let x: Array2<f64> = array![
            [10.0, 200.0, 5.0, 20.0, 150.0, 250.0],
            [20.0, 600.0, 25.0, 60.0, 300.0, 550.0],
        ];
        MinMaxScaler::fit(x.view(), FEATURE_RANGE).unwrap()
    }

    fn counting() -> (PredictionPipeline, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let model = CountingModel {
            calls: Arc::clone(&calls),
        };
        let pipeline = PredictionPipeline::from_parts(scaler(), Box::new(model)).unwrap();
        (pipeline, calls)
    }

    #[test]
    fn midpoint_scales_to_zero() {
        let (pipeline, _) = counting();
        let fv = FeatureVector::new([15.0, 200.0, 5.0, 20.0, 150.0, 250.0]).unwrap();
        assert_eq!(pipeline.scale(&fv).unwrap()[0], 0.0);
    }

    #[test]
    fn predict_passes_scaled_features() {
        let (pipeline, calls) = counting();
        let max = FeatureVector::new([20.0, 600.0, 25.0, 60.0, 300.0, 550.0]).unwrap();
        let min = FeatureVector::new([10.0, 200.0, 5.0, 20.0, 150.0, 250.0]).unwrap();

        assert_eq!(pipeline.predict(&max).unwrap(), 6.0);
        assert_eq!(pipeline.predict(&min).unwrap(), -6.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn predict_is_deterministic() {
        let (pipeline, _) = counting();
        let fv = FeatureVector::new([12.3, 450.0, 7.7, 33.0, 210.0, 480.0]).unwrap();
        let first = pipeline.predict(&fv).unwrap();
        for _ in 0..10 {
            assert_eq!(pipeline.predict(&fv).unwrap(), first);
        }
    }

    #[test]
    fn out_of_range_input_is_not_an_error() {
        let (pipeline, _) = counting();
        let fv = FeatureVector::new([40.0, -200.0, 5.0, 20.0, 150.0, 250.0]).unwrap();
        let scaled = pipeline.scale(&fv).unwrap();
        assert_eq!(scaled[0], 5.0);
        assert_eq!(scaled[1], -3.0);
        assert!(pipeline.predict(&fv).is_ok());
    }

    #[test]
    fn non_numeric_input_never_reaches_model() {
        let (pipeline, calls) = counting();
        let res = pipeline.predict_raw(&["15", "abc", "5", "20", "150", "250"]);
        assert!(matches!(res, Err(PipelineError::Input(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn model_failure_surfaces_as_model_error() {
        let pipeline = PredictionPipeline::from_parts(scaler(), Box::new(FailingModel)).unwrap();
        let fv = FeatureVector::new([15.0, 200.0, 5.0, 20.0, 150.0, 250.0]).unwrap();
        assert!(matches!(
            pipeline.predict(&fv),
            Err(PipelineError::Model(MlErr::NonFinite { .. }))
        ));
    }

    #[test]
    fn narrow_scaler_is_rejected() {
        let x: Array2<f64> = array![[1.0, 2.0], [3.0, 4.0]];
        let narrow = MinMaxScaler::fit(x.view(), FEATURE_RANGE).unwrap();
        let res = PredictionPipeline::from_parts(narrow, Box::new(FailingModel));
        assert!(matches!(res, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn scaler_with_other_range_is_rejected() {
        let x: Array2<f64> = array![
            [10.0, 200.0, 5.0, 20.0, 150.0, 250.0],
            [20.0, 600.0, 25.0, 60.0, 300.0, 550.0],
        ];
        let unit = MinMaxScaler::fit(x.view(), (0.0, 1.0)).unwrap();
        let res = PredictionPipeline::from_parts(unit, Box::new(FailingModel));
        assert!(matches!(res, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn concurrent_predictions_agree() {
        let (pipeline, calls) = counting();
        let fv = FeatureVector::new([11.0, 300.0, 9.0, 41.0, 222.0, 301.0]).unwrap();
        let expected = pipeline.predict(&fv).unwrap();

        let (pipeline, fv) = (&pipeline, &fv);
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(move || pipeline.predict(fv).unwrap()))
                .collect();

            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 9);
    }
}
