use ndarray::ArrayView1;

use crate::error::Result;

/// A pre-trained regression model.
///
/// Implementors are immutable once built, so a single instance can be shared between threads
/// and queried concurrently.
pub trait Model: Send + Sync {
    /// Returns the amount of features the model expects per sample.
    fn n_features(&self) -> usize;

    /// Predicts the target for a single, already preprocessed, sample.
    ///
    /// # Arguments
    /// * `x` - The sample, must have `n_features` values.
    ///
    /// # Returns
    /// The predicted scalar or an error if the sample doesn't fit the model.
    fn predict(&self, x: ArrayView1<f64>) -> Result<f64>;
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn n_features(&self) -> usize {
        (**self).n_features()
    }

    fn predict(&self, x: ArrayView1<f64>) -> Result<f64> {
        (**self).predict(x)
    }
}
