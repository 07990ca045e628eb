use ndarray::prelude::*;

use crate::{MlErr, Result, arch::activations::ActFn};

/// A fully connected layer with frozen parameters.
#[derive(Debug, Clone)]
pub struct Dense {
    dim: (usize, usize),
    weights: Array2<f64>,
    biases: Array1<f64>,
    act_fn: Option<ActFn>,
}

impl Dense {
    /// Creates a new `Dense`.
    ///
    /// # Arguments
    /// * `weights` - The `(n, m)` weight matrix, `n` inputs and `m` outputs.
    /// * `biases` - The `m` biases.
    /// * `act_fn` - The activation applied to the output, if any.
    ///
    /// # Returns
    /// A new `Dense` or an error if the biases don't match the weight columns.
    pub fn new(weights: Array2<f64>, biases: Array1<f64>, act_fn: Option<ActFn>) -> Result<Self> {
        let dim = weights.dim();

        if biases.len() != dim.1 {
            return Err(MlErr::SizeMismatch {
                what: "dense biases",
                got: biases.len(),
                expected: dim.1,
            });
        }

        if weights.iter().chain(biases.iter()).any(|v| !v.is_finite()) {
            return Err(MlErr::NonFinite {
                what: "a dense parameter",
            });
        }

        Ok(Self {
            dim,
            weights,
            biases,
            act_fn,
        })
    }

    /// Returns the `(inputs, outputs)` dimension of this layer.
    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn forward(&self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        if x.len() != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                what: "dense input",
                got: x.len(),
                expected: self.dim.0,
            });
        }

        let mut z = x.dot(&self.weights) + &self.biases;

        if let Some(act_fn) = self.act_fn {
            z.mapv_inplace(|z| act_fn.f(z));
        }

        Ok(z)
    }
}
