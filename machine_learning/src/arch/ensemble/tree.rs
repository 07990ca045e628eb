use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// A node of a flattened regression tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Samples with `x[feature] <= threshold` go to `left`, the rest to `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A binary regression tree stored as a flat node list rooted at index zero.
///
/// Children always live after their parent, so every walk ends in a leaf.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

impl RegressionTree {
    /// Creates a new `RegressionTree`.
    ///
    /// # Arguments
    /// * `nodes` - The flattened nodes, the root first.
    /// * `n_features` - The width of the samples this tree will see.
    ///
    /// # Returns
    /// A new `RegressionTree` or an error if the nodes don't form a valid tree.
    pub fn new(nodes: Vec<Node>, n_features: usize) -> Result<Self> {
        if nodes.is_empty() {
            return Err(MlErr::InvalidArtifact("tree has no nodes".into()));
        }

        let len = nodes.len();
        for (i, node) in nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(MlErr::InvalidArtifact(format!(
                            "node {i}: feature {feature} out of {n_features} features"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(MlErr::NonFinite {
                            what: "a split threshold",
                        });
                    }
                    for child in [left, right] {
                        if child <= i || child >= len {
                            return Err(MlErr::InvalidArtifact(format!(
                                "node {i}: child {child} must be after its parent and below {len}"
                            )));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(MlErr::NonFinite {
                            what: "a leaf value",
                        });
                    }
                }
            }
        }

        Ok(Self { nodes, n_features })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the width of the samples this tree was built for.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Walks the tree for the given sample and returns the reached leaf value.
    ///
    /// # Errors
    /// Returns `MlErr::SizeMismatch` if `x` isn't `n_features` wide.
    pub fn predict(&self, x: ArrayView1<f64>) -> Result<f64> {
        if x.len() != self.n_features {
            return Err(MlErr::SizeMismatch {
                what: "tree input",
                got: x.len(),
                expected: self.n_features,
            });
        }

        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if x[feature] <= threshold { left } else { right },
                Node::Leaf { value } => return Ok(value),
            }
        }
    }
}
