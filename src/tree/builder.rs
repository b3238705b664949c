use super::config::*;
use super::dtree::DecisionTree;
use super::split_by::SplitBy;


/// A struct that builds [`DecisionTree`].
/// `DecisionTreeBuilder` keeps parameters for constructing `DecisionTree`.
///
/// Values are checked when the tree is fitted,
/// so that an inconsistent configuration surfaces as
/// [`TreeError::Configuration`](crate::TreeError::Configuration)
/// instead of a panic.
///
/// # Example
///
/// ```no_run
/// use cartree::prelude::*;
///
/// let sample = SampleReader::default()
///     .file("/path/to/titanic.csv")
///     .formula("survived ~ .")
///     .read()
///     .unwrap();
///
/// let model = DecisionTreeBuilder::new()
///     .max_depth(3)
///     .split_by(SplitBy::Entropy)
///     .build()
///     .fit(&sample)
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct DecisionTreeBuilder {
    config: TreeConfig,
}


impl DecisionTreeBuilder {
    /// Construct a new instance of [`DecisionTreeBuilder`].
    /// By default, [`DecisionTreeBuilder`] sets the parameters as follows;
    /// ```text
    /// method: inferred from the target,
    /// split_by: SplitBy::Gini,
    /// max_depth: DEFAULT_MAX_DEPTH == 30,
    /// min_split: DEFAULT_MIN_SPLIT == 20,
    /// min_bucket: DEFAULT_MIN_BUCKET == 7,
    /// cp: DEFAULT_CP == 0.01,
    /// missing: MissingPolicy::Fail,
    /// ```
    pub fn new() -> Self {
        Self::default()
    }


    /// Start from an existing configuration.
    pub fn config(mut self, config: TreeConfig) -> Self {
        self.config = config;
        self
    }


    /// Specify the maximal depth of the tree.
    /// The root has depth `0`.
    pub fn max_depth(mut self, depth: i32) -> Self {
        self.config.stopping.max_depth = depth;
        self
    }


    /// Minimal weighted size of a node to attempt a split.
    pub fn min_split(mut self, size: f64) -> Self {
        self.config.stopping.min_split = size;
        self
    }


    /// Minimal weighted size of each child of a split.
    pub fn min_bucket(mut self, size: f64) -> Self {
        self.config.stopping.min_bucket = size;
        self
    }


    /// Complexity parameter.
    /// A split must lower the deviance by at least `cp` times
    /// the deviance of the root.
    pub fn cp(mut self, cp: f64) -> Self {
        self.config.stopping.cp = cp;
        self
    }


    /// Fix the method instead of inferring it from the target.
    pub fn method(mut self, method: Method) -> Self {
        self.config.method = Some(method);
        self
    }


    /// Set the node splitting rule.
    /// Default value is `SplitBy::Gini`.
    /// See [`SplitBy`] for other rules.
    #[inline]
    pub fn split_by(mut self, split_by: SplitBy) -> Self {
        self.config.split_by = split_by;
        self
    }


    /// Set the policy for missing values of split features.
    pub fn missing(mut self, policy: MissingPolicy) -> Self {
        self.config.missing = policy;
        self
    }


    /// Build a `DecisionTree`.
    /// This method consumes `self`.
    pub fn build(self) -> DecisionTree {
        DecisionTree::new(self.config)
    }
}
