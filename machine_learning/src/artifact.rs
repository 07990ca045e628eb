use std::{fs, path::Path};

use log::info;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::{
    MlErr, Result,
    arch::{
        Model, Sequential,
        activations::ActFn,
        ensemble::{GradientBoosting, Node, RegressionTree},
        layers::Dense,
    },
};

/// A dense layer as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerArtifact {
    /// One row per input, one column per output.
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
    #[serde(default)]
    pub activation: Option<ActFn>,
}

/// A boosting stage as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeArtifact {
    pub nodes: Vec<Node>,
}

/// The serialized form of every supported pre-trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Sequential {
        layers: Vec<LayerArtifact>,
    },
    GradientBoosting {
        n_features: usize,
        init: f64,
        learning_rate: f64,
        trees: Vec<TreeArtifact>,
    },
}

impl ModelArtifact {
    /// Reads an artifact from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let artifact: Self = serde_json::from_str(&content)?;
        info!("loaded {} model from {}", artifact.kind(), path.display());
        Ok(artifact)
    }

    /// Writes the artifact as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::Sequential { .. } => "sequential",
            ModelArtifact::GradientBoosting { .. } => "gradient_boosting",
        }
    }

    /// Validates the artifact and builds the model it describes.
    pub fn build(self) -> Result<Box<dyn Model>> {
        match self {
            ModelArtifact::Sequential { layers } => {
                let layers = layers
                    .into_iter()
                    .map(build_dense)
                    .collect::<Result<Vec<_>>>()?;

                Ok(Box::new(Sequential::new(layers)?))
            }
            ModelArtifact::GradientBoosting {
                n_features,
                init,
                learning_rate,
                trees,
            } => {
                let trees = trees
                    .into_iter()
                    .map(|t| RegressionTree::new(t.nodes, n_features))
                    .collect::<Result<Vec<_>>>()?;

                Ok(Box::new(GradientBoosting::new(
                    n_features,
                    init,
                    learning_rate,
                    trees,
                )?))
            }
        }
    }
}

fn build_dense(layer: LayerArtifact) -> Result<Dense> {
    let n = layer.weights.len();
    let m = layer.weights.first().map(Vec::len).unwrap_or_default();

    if n == 0 || m == 0 {
        return Err(MlErr::InvalidArtifact("dense layer has no weights".into()));
    }

    let mut flat = Vec::with_capacity(n * m);
    for row in layer.weights {
        if row.len() != m {
            return Err(MlErr::SizeMismatch {
                what: "dense weight row",
                got: row.len(),
                expected: m,
            });
        }
        flat.extend(row);
    }

    let weights = Array2::from_shape_vec((n, m), flat).map_err(|_| MlErr::SizeMismatch {
        what: "dense weights",
        got: 0,
        expected: n * m,
    })?;

    Dense::new(weights, Array1::from(layer.biases), layer.activation)
}
