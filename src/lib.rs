#![warn(missing_docs)]

//!
//! A crate that grows, prunes and applies CART decision trees.
//!
//! Trees are fitted to small, optionally weighted, tabular samples.
//! Both classification (Gini index or entropy) and regression
//! (weighted squared error) are supported;
//! predictors may be numeric or categorical.
//!
//! - Growth stops at `max_depth`, at the minimal node sizes
//!     `min_split` / `min_bucket`, or when the best split
//!     lowers the deviance by less than `cp` times the root deviance.
//! - The fitted [`TreeModel`] can be pruned at any
//!     complexity parameter, and carries the cp table of
//!     its nested subtrees.
//!     [`research::CrossValidation`] fills the cross-validated error
//!     of that table.
//!
//! # Example
//! ```no_run
//! use cartree::prelude::*;
//!
//! let sample = SampleReader::default()
//!     .file("/path/to/titanic.csv")
//!     .formula("survived ~ class + sex + age")
//!     .read()
//!     .unwrap()
//!     .aggregate();
//!
//! let model = DecisionTreeBuilder::new()
//!     .min_split(1.0)
//!     .min_bucket(1.0)
//!     .cp(0.0)
//!     .build()
//!     .fit(&sample)
//!     .unwrap()
//!     .prune(0.01)
//!     .unwrap();
//!
//! println!("{model}");
//! model.print_cp_table();
//! ```

pub mod constants;
pub mod error;
pub mod sample;
pub mod tree;
pub mod research;
pub mod prelude;


pub use error::{Result, TreeError};

pub use sample::{
    Feature,
    FeatureKind,
    Formula,
    Observation,
    Sample,
    SampleReader,
    Schema,
    Target,
    Value,
};

pub use tree::{
    DecisionTree,
    DecisionTreeBuilder,
    Method,
    MissingPolicy,
    Prediction,
    SplitBy,
    StoppingConfig,
    TreeConfig,
    TreeModel,
};

pub use research::CrossValidation;
