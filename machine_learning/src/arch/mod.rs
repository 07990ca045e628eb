pub mod activations;
pub mod ensemble;
pub mod layers;
mod model;
mod sequential;

pub use model::Model;
pub use sequential::Sequential;
