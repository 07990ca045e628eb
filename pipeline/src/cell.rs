use std::sync::{Mutex, OnceLock, PoisonError};

use log::debug;

use crate::{configs::PipelineConfig, error::PipelineError, prediction::PredictionPipeline};

/// The lifecycle of a [`PipelineCell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Ready,
}

/// Holds a single [`PredictionPipeline`] shared by every caller of a process.
///
/// Initialization runs at most once even with concurrent callers. A failed attempt leaves the
/// cell uninitialized so a later call may try again; once ready the pipeline never changes.
#[derive(Debug, Default)]
pub struct PipelineCell {
    init: Mutex<()>,
    pipeline: OnceLock<PredictionPipeline>,
}

impl PipelineCell {
    pub const fn new() -> Self {
        Self {
            init: Mutex::new(()),
            pipeline: OnceLock::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        match self.pipeline.get() {
            Some(_) => PipelineState::Ready,
            None => PipelineState::Uninitialized,
        }
    }

    /// Returns the pipeline if it was already initialized.
    ///
    /// # Errors
    /// Returns `PipelineError::NotInitialized` otherwise.
    pub fn get(&self) -> Result<&PredictionPipeline, PipelineError> {
        self.pipeline.get().ok_or(PipelineError::NotInitialized)
    }

    /// Returns the pipeline, initializing it from `config` on the first call.
    ///
    /// Later calls get the existing pipeline regardless of the config they pass.
    pub fn get_or_initialize(
        &self,
        config: &PipelineConfig,
    ) -> Result<&PredictionPipeline, PipelineError> {
        self.get_or_init_with(|| PredictionPipeline::initialize(config))
    }

    /// Same as [`PipelineCell::get_or_initialize`] with a custom constructor.
    pub fn get_or_init_with<F>(&self, init: F) -> Result<&PredictionPipeline, PipelineError>
    where
        F: FnOnce() -> Result<PredictionPipeline, PipelineError>,
    {
        if let Some(pipeline) = self.pipeline.get() {
            return Ok(pipeline);
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pipeline) = self.pipeline.get() {
            debug!("pipeline initialized by another caller");
            return Ok(pipeline);
        }

        let pipeline = init()?;
        Ok(self.pipeline.get_or_init(|| pipeline))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use machine_learning::{arch::Model, preprocessing::MinMaxScaler};
    use ndarray::{Array2, ArrayView1};

    use super::*;
    use crate::{features::N_FEATURES, prediction::FEATURE_RANGE};

    struct ConstModel(f64);

    impl Model for ConstModel {
        fn n_features(&self) -> usize {
            N_FEATURES
        }

        fn predict(&self, _x: ArrayView1<f64>) -> machine_learning::Result<f64> {
            Ok(self.0)
        }
    }

    fn build(value: f64) -> Result<PredictionPipeline, PipelineError> {
        let x = Array2::from_shape_fn((2, N_FEATURES), |(i, _)| i as f64);
        let scaler = MinMaxScaler::fit(x.view(), FEATURE_RANGE).unwrap();
        PredictionPipeline::from_parts(scaler, Box::new(ConstModel(value)))
    }

    #[test]
    fn get_before_init_fails() {
        let cell = PipelineCell::new();
        assert_eq!(cell.state(), PipelineState::Uninitialized);
        assert!(matches!(cell.get(), Err(PipelineError::NotInitialized)));
    }

    #[test]
    fn failed_init_stays_uninitialized() {
        let cell = PipelineCell::new();
        let res = cell.get_or_init_with(|| Err(PipelineError::Configuration("boom".into())));
        assert!(matches!(res, Err(PipelineError::Configuration(_))));
        assert_eq!(cell.state(), PipelineState::Uninitialized);

        cell.get_or_init_with(|| build(1.0)).unwrap();
        assert_eq!(cell.state(), PipelineState::Ready);
    }

    #[test]
    fn second_init_keeps_first_pipeline() {
        let cell = PipelineCell::new();
        cell.get_or_init_with(|| build(1.0)).unwrap();
        let pipeline = cell.get_or_init_with(|| build(2.0)).unwrap();

        let fv = crate::FeatureVector::new([0.5; 6]).unwrap();
        assert_eq!(pipeline.predict(&fv).unwrap(), 1.0);
    }

    #[test]
    fn concurrent_callers_initialize_once() {
        let cell = PipelineCell::new();
        let inits = AtomicUsize::new(0);
        let (cell, inits) = (&cell, &inits);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(move || {
                    cell.get_or_init_with(|| {
                        inits.fetch_add(1, Ordering::SeqCst);
                        build(3.0)
                    })
                    .unwrap();
                });
            }
        });

        assert_eq!(inits.load(Ordering::SeqCst), 1);
        assert_eq!(cell.state(), PipelineState::Ready);
    }
}
