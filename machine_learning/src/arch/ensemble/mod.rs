mod gradient_boosting;
mod tree;

pub use gradient_boosting::GradientBoosting;
pub use tree::{Node, RegressionTree};
