//! Model selection helpers.
//! Cross validation of the complexity parameter.

/// Provides K-fold cross validation.
pub mod cross_validation;

pub use cross_validation::CrossValidation;
