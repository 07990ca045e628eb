use serde::{Deserialize, Serialize};

/// Element-wise activation applied after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFn {
    Identity,
    Relu,
    #[serde(alias = "logistic")]
    Sigmoid,
    Tanh,
}
use ActFn::*;

impl ActFn {
    pub fn f(&self, z: f64) -> f64 {
        match self {
            Identity => z,
            Relu => z.max(0.0),
            Sigmoid => 1. / (1. + (-z).exp()),
            Tanh => z.tanh(),
        }
    }
}
