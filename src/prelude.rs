//! Exports the types needed to read a sample, fit a tree and use it.
//!
pub use crate::sample::{
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


pub use crate::tree::{
    // Fitting --------------------------------
    DecisionTree,
    DecisionTreeBuilder,
    TreeConfig,
    StoppingConfig,
    Method,
    MissingPolicy,
    SplitBy,


    // Fitted tree ----------------------------
    TreeModel,
    Node,
    NodeId,
    NodeView,
    Prediction,
    CpEntry,
};


pub use crate::research::CrossValidation;


pub use crate::error::TreeError;
