//! Error type shared by sample construction, fitting, pruning
//! and prediction.
use std::io;
use thiserror::Error;


/// Errors reported by this crate.
///
/// Fitting either returns a complete tree or fails with one of these;
/// no partially grown tree is ever handed back.
#[derive(Error, Debug)]
pub enum TreeError {
    /// The observations (or a column) disagree with the schema.
    #[error("schema mismatch: {message}")]
    SchemaMismatch {
        /// What disagreed.
        message: String,
    },

    /// Inconsistent `StoppingConfig` or `TreeConfig`.
    #[error("configuration error: {message}")]
    Configuration {
        /// The offending setting.
        message: String,
    },

    /// A feature needed for routing has no value
    /// and no fallback policy is configured.
    #[error("missing value for feature `{feature}`")]
    MissingFeature {
        /// Name of the feature.
        feature: String,
    },

    /// A categorical level that the split at this node never saw.
    #[error("unknown level `{level}` for feature `{feature}`")]
    UnknownCategory {
        /// Name of the feature.
        feature: String,
        /// The unseen level.
        level: String,
    },

    /// The target value of a training observation is missing.
    #[error("missing target value at row {row}")]
    MissingTarget {
        /// Zero-based row index.
        row: usize,
    },

    /// A negative or non-finite observation weight.
    #[error("invalid weight {weight} at row {row}")]
    InvalidWeight {
        /// Zero-based row index.
        row: usize,
        /// The rejected weight.
        weight: f64,
    },

    /// Drawing the tree failed.
    #[error("render error: {message}")]
    Render {
        /// Message of the drawing backend.
        message: String,
    },

    /// File I/O errors.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying error.
        #[from]
        source: io::Error,
    },

    /// Errors raised while reading a data frame.
    #[error("data frame error: {source}")]
    Polars {
        /// The underlying error.
        #[from]
        source: polars::prelude::PolarsError,
    },

    /// Model (de)serialization errors.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying error.
        #[from]
        source: serde_json::Error,
    },
}


impl TreeError {
    #[inline]
    pub(crate) fn schema<T: Into<String>>(message: T) -> Self {
        Self::SchemaMismatch { message: message.into() }
    }


    #[inline]
    pub(crate) fn config<T: Into<String>>(message: T) -> Self {
        Self::Configuration { message: message.into() }
    }


    #[inline]
    pub(crate) fn missing<T: Into<String>>(feature: T) -> Self {
        Self::MissingFeature { feature: feature.into() }
    }
}


/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TreeError>;
