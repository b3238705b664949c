//! Struct `Sample` represents a batch of weighted observations.

// Provides feature struct.
pub(crate) mod feature;
// Provides the target column.
pub(crate) mod target;
// Provides row-oriented observations and schemas.
pub(crate) mod observation;
// Provides the model formula.
pub(crate) mod formula;
// Provides sample struct.
pub(crate) mod sample_struct;

// Provides a struct that reads a file.
pub(crate) mod reader;


pub use reader::SampleReader;
pub use sample_struct::Sample;
pub use feature::{Feature, FeatureKind};
pub use target::{Target, TargetInfo};
pub use observation::{Observation, Schema, Value};
pub use formula::{Formula, Predictors};
