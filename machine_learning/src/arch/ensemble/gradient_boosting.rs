use ndarray::ArrayView1;

use super::RegressionTree;
use crate::{MlErr, Result, arch::Model};

/// A gradient boosted ensemble of regression trees with a squared error objective.
///
/// The prediction is `init + learning_rate * sum(tree(x))`.
#[derive(Debug, Clone)]
pub struct GradientBoosting {
    n_features: usize,
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    /// Creates a new `GradientBoosting`.
    ///
    /// # Arguments
    /// * `n_features` - The width of the samples.
    /// * `init` - The baseline prediction, usually the training target mean.
    /// * `learning_rate` - The shrinkage applied to every tree.
    /// * `trees` - The boosting stages, each built for `n_features`.
    pub fn new(
        n_features: usize,
        init: f64,
        learning_rate: f64,
        trees: Vec<RegressionTree>,
    ) -> Result<Self> {
        if n_features == 0 {
            return Err(MlErr::InvalidArtifact("ensemble has no features".into()));
        }

        if let Some(tree) = trees.iter().find(|t| t.n_features() != n_features) {
            return Err(MlErr::SizeMismatch {
                what: "ensemble tree features",
                got: tree.n_features(),
                expected: n_features,
            });
        }

        if !init.is_finite() || !learning_rate.is_finite() {
            return Err(MlErr::NonFinite {
                what: "an ensemble constant",
            });
        }

        Ok(Self {
            n_features,
            init,
            learning_rate,
            trees,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Model for GradientBoosting {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: ArrayView1<f64>) -> Result<f64> {
        if x.len() != self.n_features {
            return Err(MlErr::SizeMismatch {
                what: "ensemble input",
                got: x.len(),
                expected: self.n_features,
            });
        }

        let sum = self
            .trees
            .iter()
            .map(|tree| tree.predict(x))
            .sum::<Result<f64>>()?;
        let y = self.init + self.learning_rate * sum;

        if !y.is_finite() {
            return Err(MlErr::NonFinite {
                what: "the model output",
            });
        }

        Ok(y)
    }
}
