//! The fitted tree.
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use std::fs;
use std::path::Path;

use crate::error::{Result, TreeError};
use crate::sample::{Feature, FeatureKind, Observation, Sample, TargetInfo, Value};
use super::config::{Method, MissingPolicy, StoppingConfig};
use super::node::{Node, NodeId, Prediction};
use super::prune::{weakest_links, CpEntry};
use super::rule::{LeftRight, Route, Splitter};
use super::split_by::SplitBy;


/// A predictor column as seen during fitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureInfo {
    /// Column name.
    pub name: String,
    /// Numeric or categorical.
    pub kind: FeatureKind,
    /// Levels of a categorical feature, in code order.
    pub levels: Vec<String>,
}


impl From<&Feature> for FeatureInfo {
    fn from(feature: &Feature) -> Self {
        Self {
            name: feature.name().to_string(),
            kind: feature.kind(),
            levels: feature.levels().to_vec(),
        }
    }
}


/// A node together with its position in the pre-order traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeView<'a> {
    /// Arena index of the node.
    pub id: NodeId,
    /// Distance from the root.
    pub depth: usize,
    /// The node itself.
    pub node: &'a Node,
    /// Label of the edge leading into the node, `root` for the root.
    pub condition: String,
    /// Share of the root weight, in percent.
    pub percent: f64,
}


/// A fitted decision tree.
///
/// Nodes live in an arena in pre-order, the root at index `0`.
/// The model never changes after fitting;
/// [`TreeModel::prune`] returns a new model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeModel {
    pub(super) nodes: Vec<Node>,
    pub(super) features: Vec<FeatureInfo>,
    pub(super) target: TargetInfo,
    pub(super) method: Method,
    pub(super) split_by: SplitBy,
    pub(super) missing: MissingPolicy,
    pub(super) stopping: StoppingConfig,
    pub(super) cp_table: Vec<CpEntry>,
}


impl TreeModel {
    pub(super) fn from_components(
        nodes: Vec<Node>,
        features: Vec<FeatureInfo>,
        target: TargetInfo,
        method: Method,
        split_by: SplitBy,
        missing: MissingPolicy,
        stopping: StoppingConfig,
    ) -> Self
    {
        let cp_table = weakest_links(&nodes[..], stopping.cp);
        Self {
            nodes, features, target, method, split_by, missing, stopping, cp_table,
        }
    }


    /// Predict the response of `observation`.
    pub fn predict(&self, observation: &Observation) -> Result<Prediction> {
        let id = self.leaf_of(observation)?;
        Ok(self.nodes[id.0].prediction.clone())
    }


    /// Returns the leaf that `observation` falls into.
    pub fn leaf_of(&self, observation: &Observation) -> Result<NodeId> {
        self.descend(|name| {
            observation.get(name).cloned().unwrap_or(Value::Missing)
        })
    }


    /// Predict the response of the `row`-th observation of `sample`.
    pub fn predict_row(&self, sample: &Sample, row: usize) -> Result<Prediction> {
        let id = self.descend(|name| {
            sample.feature(name)
                .map(|feat| feat.value(row))
                .unwrap_or(Value::Missing)
        })?;
        Ok(self.nodes[id.0].prediction.clone())
    }


    /// Predict every observation of `sample`.
    pub fn predict_all(&self, sample: &Sample) -> Result<Vec<Prediction>> {
        let n_sample = sample.shape().0;
        (0..n_sample).into_par_iter()
            .map(|row| self.predict_row(sample, row))
            .collect()
    }


    /// Walk from the root to a leaf.
    /// `lookup` returns the value of a feature by name.
    fn descend<F>(&self, lookup: F) -> Result<NodeId>
        where F: Fn(&str) -> Value
    {
        let mut id = NodeId(0);
        while let Some(branch) = &self.nodes[id.0].branch {
            let name = branch.rule.feature();
            let value = lookup(name);
            let route = branch.rule.route_value(&value, self.levels_of(name))?;

            let side = match (route, self.missing) {
                (Route::Go(side), _) => side,
                (_, MissingPolicy::Majority) => branch.majority,
                (Route::Missing, MissingPolicy::Fail) => {
                    return Err(TreeError::missing(name));
                },
                (Route::Unseen(level), MissingPolicy::Fail) => {
                    return Err(TreeError::UnknownCategory {
                        feature: name.to_string(),
                        level,
                    });
                },
            };
            id = branch.child(side);
        }
        Ok(id)
    }


    /// Fitted levels of the feature named `name`.
    pub(super) fn levels_of(&self, name: &str) -> &[String] {
        self.features.iter()
            .find(|f| f.name == name)
            .map(|f| &f.levels[..])
            .unwrap_or(&[])
    }


    /// The nodes in pre-order with the edge labels leading into them.
    pub fn preorder(&self) -> Vec<NodeView<'_>> {
        let mut conditions = vec![String::from("root"); self.nodes.len()];
        for node in self.nodes.iter() {
            let Some(branch) = &node.branch else { continue; };
            let levels = self.levels_of(branch.rule.feature());
            for side in [LeftRight::Left, LeftRight::Right] {
                conditions[branch.child(side).0] = branch.rule.describe(side, levels);
            }
        }

        let root_weight = self.root().weight;
        self.nodes.iter()
            .zip(conditions)
            .enumerate()
            .map(|(i, (node, condition))| {
                let percent = if root_weight > 0f64 {
                    100f64 * node.weight / root_weight
                } else {
                    0f64
                };
                NodeView {
                    id: NodeId(i),
                    depth: node.depth,
                    node,
                    condition,
                    percent,
                }
            })
            .collect()
    }


    /// The root node.
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }


    /// The node at `id`, if the arena has one.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }


    /// The arena of nodes, in pre-order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes[..]
    }


    /// Number of nodes, leaves included.
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }


    /// Number of terminal nodes.
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }


    /// Depth of the deepest node. A single leaf has depth `0`.
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }


    /// Sum of the deviances of the leaves.
    pub fn training_deviance(&self) -> f64 {
        self.nodes.iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.deviance)
            .sum()
    }


    /// For each feature, the sum of the improvements of the splits
    /// on it, normalized to sum to `1`.
    /// A single leaf gives zeros.
    pub fn feature_importance(&self) -> Vec<(String, f64)> {
        let mut importance = vec![0f64; self.features.len()];
        for branch in self.nodes.iter().filter_map(|n| n.branch.as_ref()) {
            let name = branch.rule.feature();
            if let Some(k) = self.features.iter().position(|f| f.name == name) {
                importance[k] += branch.improvement;
            }
        }

        let total = importance.iter().sum::<f64>();
        if total > 0f64 {
            importance.iter_mut().for_each(|v| { *v /= total; });
        }

        self.features.iter()
            .map(|f| f.name.clone())
            .zip(importance)
            .collect()
    }


    /// The predictors, in fitting order.
    pub fn features(&self) -> &[FeatureInfo] {
        &self.features[..]
    }


    /// Name and labels of the response.
    pub fn target(&self) -> &TargetInfo {
        &self.target
    }


    /// Regression or classification.
    pub fn method(&self) -> Method {
        self.method
    }


    /// Impurity used for classification splits.
    pub fn split_by(&self) -> SplitBy {
        self.split_by
    }


    /// Routing of missing split values at prediction time.
    pub fn missing(&self) -> MissingPolicy {
        self.missing
    }


    /// The stopping criteria the tree was grown with.
    pub fn stopping(&self) -> &StoppingConfig {
        &self.stopping
    }


    /// The complexity-parameter table, the root-only tree first.
    pub fn cp_table(&self) -> &[CpEntry] {
        &self.cp_table[..]
    }


    /// Serialize the model to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }


    /// Deserialize a model written by [`TreeModel::to_json`].
    ///
    /// The arena is checked before the model is handed back:
    /// every child comes after its parent, has exactly one parent,
    /// and every rule names a fitted feature of the matching kind.
    pub fn from_json(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.check_arena()?;
        Ok(model)
    }


    fn check_arena(&self) -> Result<()> {
        let n_nodes = self.nodes.len();
        if n_nodes == 0 {
            return Err(TreeError::schema("a model needs at least one node"));
        }

        let n_labels = self.target.labels.len();
        let mut n_parents = vec![0usize; n_nodes];
        for (i, node) in self.nodes.iter().enumerate() {
            if let Prediction::Class { probabilities, .. } = &node.prediction {
                if probabilities.len() != n_labels {
                    return Err(TreeError::schema(format!(
                        "node {i} predicts {} classes, the target has {n_labels}",
                        probabilities.len(),
                    )));
                }
            }
            let Some(branch) = &node.branch else { continue; };
            for child in [branch.left, branch.right] {
                if child.0 <= i || child.0 >= n_nodes {
                    return Err(TreeError::schema(format!(
                        "node {i} has an invalid child {child}"
                    )));
                }
                n_parents[child.0] += 1;
            }

            let name = branch.rule.feature();
            let info = self.features.iter()
                .find(|f| f.name == name)
                .ok_or_else(|| {
                    TreeError::schema(format!(
                        "node {i} splits on the unknown feature `{name}`"
                    ))
                })?;
            let fits = match &branch.rule {
                Splitter::Numeric { .. } => info.kind == FeatureKind::Numeric,
                Splitter::Categorical { left, right, .. } => {
                    let n_levels = info.levels.len();
                    info.kind == FeatureKind::Categorical
                        && left.ones().chain(right.ones()).all(|c| c < n_levels)
                },
            };
            if !fits {
                return Err(TreeError::schema(format!(
                    "the rule of node {i} does not match feature `{name}`"
                )));
            }
        }

        if n_parents[0] != 0 || n_parents[1..].iter().any(|&p| p != 1) {
            return Err(TreeError::schema(
                "every node but the root needs exactly one parent"
            ));
        }
        Ok(())
    }


    /// Write the model to `path` as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }


    /// Read a model written by [`TreeModel::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Target;
    use crate::tree::{DecisionTreeBuilder, Splitter};

    fn class_sample() -> Sample {
        let raw = ["1st", "1st", "3rd", "3rd", "crew", "crew"];
        let raw = raw.iter().map(|s| Some(*s)).collect::<Vec<_>>();
        let class = Feature::categorical_from("class", &raw[..]);
        let age = Feature::numeric_from(
            "age", vec![Some(30.0), Some(8.0), Some(30.0), Some(8.0), Some(30.0), Some(40.0)],
        );
        let target = Target::class("survived", &["yes", "yes", "no", "no", "no", "no"]);
        Sample::new(vec![class, age], target, None).unwrap()
    }

    fn fit(sample: &Sample, missing: MissingPolicy) -> TreeModel {
        DecisionTreeBuilder::new()
            .min_split(1.0)
            .min_bucket(1.0)
            .cp(0.0)
            .missing(missing)
            .build()
            .fit(sample)
            .unwrap()
    }

    #[test]
    fn test_predict_and_preorder() {
        let sample = class_sample();
        let model = fit(&sample, MissingPolicy::Fail);

        assert_eq!(model.n_nodes(), 3);
        let branch = model.root().branch.as_ref().unwrap();
        assert!(matches!(branch.rule, Splitter::Categorical { .. }));

        let obs = Observation::new()
            .with("class", "1st")
            .with("age", 50.0);
        let prediction = model.predict(&obs).unwrap();
        assert_eq!(prediction.label(), Some("yes"));

        let views = model.preorder();
        assert_eq!(views[0].condition, "root");
        assert_eq!(views[1].condition, "class = 3rd, crew");
        assert_eq!(views[2].condition, "class = 1st");
        let percent = views[1].percent + views[2].percent;
        assert!((percent - 100.0).abs() < 1e-9, "got {percent}");
    }

    #[test]
    fn test_missing_and_unknown_values() {
        let sample = class_sample();
        let model = fit(&sample, MissingPolicy::Fail);

        let obs = Observation::new().with("age", 3.0);
        let err = model.predict(&obs).unwrap_err();
        assert!(matches!(err, TreeError::MissingFeature { .. }));

        let obs = Observation::new().with("class", "2nd");
        let err = model.predict(&obs).unwrap_err();
        assert!(matches!(err, TreeError::UnknownCategory { .. }));

        let obs = Observation::new().with("class", 2.0);
        let err = model.predict(&obs).unwrap_err();
        assert!(matches!(err, TreeError::SchemaMismatch { .. }));

        // The left child holds 4 of 6 observations.
        let model = fit(&sample, MissingPolicy::Majority);
        let obs = Observation::new().with("class", "2nd");
        let prediction = model.predict(&obs).unwrap();
        assert_eq!(prediction.label(), Some("no"));
    }

    #[test]
    fn test_predict_all_matches_leaves() {
        let sample = class_sample();
        let model = fit(&sample, MissingPolicy::Fail);
        let predictions = model.predict_all(&sample).unwrap();
        for (row, prediction) in predictions.iter().enumerate() {
            let id = model.leaf_of(&sample.observation(row)).unwrap();
            assert_eq!(&model.node(id).unwrap().prediction, prediction);
        }
    }

    #[test]
    fn test_feature_importance() {
        let sample = class_sample();
        let model = fit(&sample, MissingPolicy::Fail);
        let importance = model.feature_importance();
        assert_eq!(importance[0], ("class".to_string(), 1.0));
        assert_eq!(importance[1], ("age".to_string(), 0.0));
    }

    #[test]
    fn test_corrupted_arena_is_rejected() {
        let sample = class_sample();
        let model = fit(&sample, MissingPolicy::Fail);

        let mut broken = model.clone();
        if let Some(branch) = broken.nodes[0].branch.as_mut() {
            branch.left = NodeId(99);
        }
        let err = TreeModel::from_json(&broken.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, TreeError::SchemaMismatch { .. }), "got {err:?}");

        // A child pointing back at its parent.
        let mut broken = model.clone();
        if let Some(branch) = broken.nodes[0].branch.as_mut() {
            branch.right = NodeId(0);
        }
        let err = TreeModel::from_json(&broken.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, TreeError::SchemaMismatch { .. }), "got {err:?}");

        // Both edges into the same node.
        let mut broken = model.clone();
        if let Some(branch) = broken.nodes[0].branch.as_mut() {
            branch.right = branch.left;
        }
        let err = TreeModel::from_json(&broken.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, TreeError::SchemaMismatch { .. }), "got {err:?}");

        // A level outside the fitted ones.
        let mut broken = model.clone();
        if let Some(branch) = broken.nodes[0].branch.as_mut() {
            if let Splitter::Categorical { left, .. } = &mut branch.rule {
                left.grow(8);
                left.insert(7);
            }
        }
        let err = TreeModel::from_json(&broken.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, TreeError::SchemaMismatch { .. }), "got {err:?}");
    }

    #[test]
    fn test_json_round_trip() {
        let sample = class_sample();
        let model = fit(&sample, MissingPolicy::Majority);
        let json = model.to_json().unwrap();
        let loaded = TreeModel::from_json(&json).unwrap();
        assert_eq!(model, loaded);
    }
}
