pub mod arch;
pub mod artifact;
pub mod dataset;
pub mod error;
pub mod preprocessing;

pub use error::{MlErr, Result};
