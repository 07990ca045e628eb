use ndarray::ArrayView1;

use super::{Model, layers::Dense};
use crate::{MlErr, Result};

/// A sequential model: information flows forward through its dense layers, the last one must
/// have a single output.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Dense>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` or an error if the layers don't chain into a single output.
    pub fn new<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Dense>,
    {
        let layers: Vec<Dense> = layers.into_iter().collect();

        let Some(last) = layers.last() else {
            return Err(MlErr::InvalidArtifact(
                "model must have at least one layer".into(),
            ));
        };

        if last.dim().1 != 1 {
            return Err(MlErr::SizeMismatch {
                what: "model outputs",
                got: last.dim().1,
                expected: 1,
            });
        }

        for pair in layers.windows(2) {
            let (prev_m, curr_n) = (pair[0].dim().1, pair[1].dim().0);
            if prev_m != curr_n {
                return Err(MlErr::SizeMismatch {
                    what: "adjacent layers",
                    got: curr_n,
                    expected: prev_m,
                });
            }
        }

        Ok(Self { layers })
    }

    /// Returns the layers of this model.
    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }
}

impl Model for Sequential {
    fn n_features(&self) -> usize {
        self.layers[0].dim().0
    }

    fn predict(&self, x: ArrayView1<f64>) -> Result<f64> {
        let mut a = x.to_owned();

        for layer in &self.layers {
            a = layer.forward(a.view())?;
        }

        let y = a[0];
        if !y.is_finite() {
            return Err(MlErr::NonFinite {
                what: "the model output",
            });
        }

        Ok(y)
    }
}
