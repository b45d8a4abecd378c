//! Validation rules shared by the CLI and the storage layer.

mod validation;

pub use validation::*;
