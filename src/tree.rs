//! Growing, pruning and using a single decision tree.

// Provides the configuration structs.
pub(crate) mod config;
// Provides the impurities and the split search.
pub(crate) mod split_by;
// Provides the sufficient statistics of a node.
pub(crate) mod stats;
// Provides the splitting rules.
pub(crate) mod rule;
// Provides the nodes of the arena.
pub(crate) mod node;
// Provides the growth algorithm.
pub(crate) mod dtree;
// Provides a builder for `DecisionTree`.
pub(crate) mod builder;
// Provides the fitted tree.
pub(crate) mod model;
// Provides cost-complexity pruning.
pub(crate) mod prune;
// Provides text, DOT and SVG output.
pub(crate) mod render;


pub use config::{Method, MissingPolicy, StoppingConfig, TreeConfig};
pub use split_by::SplitBy;
pub use rule::{LeftRight, Splitter};
pub use node::{Branch, Node, NodeId, Prediction};
pub use dtree::DecisionTree;
pub use builder::DecisionTreeBuilder;
pub use model::{FeatureInfo, NodeView, TreeModel};
pub use prune::CpEntry;
