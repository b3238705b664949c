use log::{debug, info, trace, warn};

use std::borrow::Cow;

use crate::constants::PARALLEL_THRESHOLD;
use crate::error::{Result, TreeError};
use crate::sample::{Feature, Sample, Target};
use super::config::*;
use super::model::{FeatureInfo, TreeModel};
use super::node::{Branch, Node, NodeId};
use super::rule::{LeftRight, Route};
use super::split_by::{Candidate, SplitBy, SplitEvaluator};
use super::stats::{is_pure, Stats};


/// The CART algorithm.
/// Given a set of weighted training examples,
/// [`DecisionTree`] grows a binary tree top-down,
/// choosing at each node the split that lowers the deviance most,
/// and outputs the fitted [`TreeModel`].
///
/// The code is based on the book:
/// [Classification and Regression
/// Trees](https://www.amazon.com/Classification-Regression-Wadsworth-Statistics-Probability/dp/0412048418)
/// by Leo Breiman, Jerome H. Friedman, Richard A. Olshen, and Charles J. Stone.
///
/// [`DecisionTree`] is constructed
/// by [`DecisionTreeBuilder`](crate::DecisionTreeBuilder)
/// or directly from a [`TreeConfig`].
///
/// # Example
/// ```no_run
/// use cartree::prelude::*;
///
/// let sample = SampleReader::default()
///     .file("/path/to/titanic.csv")
///     .formula("survived ~ .")
///     .read()
///     .unwrap()
///     .aggregate();
///
/// let tree = DecisionTreeBuilder::new()
///     .max_depth(3)
///     .min_split(1.0)
///     .min_bucket(1.0)
///     .build();
///
/// let model = tree.fit(&sample).unwrap();
/// println!("{model}");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DecisionTree {
    config: TreeConfig,
}


impl DecisionTree {
    /// Initialize [`DecisionTree`].
    #[inline]
    pub fn new(config: TreeConfig) -> Self {
        Self { config, }
    }


    /// The configuration this tree is fitted with.
    #[inline]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }


    /// Fit a tree to `sample`.
    ///
    /// Either returns the complete tree or fails;
    /// rows with zero weight are ignored.
    pub fn fit(&self, sample: &Sample) -> Result<TreeModel> {
        let stopping = self.config.stopping;
        stopping.validate()?;

        let method = self.resolve_method(sample.target())?;
        let target: Cow<'_, Target> = match method {
            Method::Classification if !sample.target().is_class() => {
                Cow::Owned(sample.target().clone().into_class())
            },
            _ => Cow::Borrowed(sample.target()),
        };

        if sample.features().is_empty() {
            return Err(TreeError::config("the sample has no predictor"));
        }

        let weights = sample.weights();
        let rows = (0..sample.shape().0)
            .filter(|&i| weights[i] > 0f64)
            .collect::<Vec<_>>();
        if rows.is_empty() {
            return Err(TreeError::config(
                "the sample has no observation with positive weight"
            ));
        }

        let split_by = self.config.split_by;
        let root_stats = Stats::from_rows(&target, weights, &rows[..]);
        let root_deviance = root_stats.deviance(split_by);

        let grower = Grower {
            sample,
            target: &target,
            evaluator: SplitEvaluator::new(
                sample, &target, split_by, stopping.min_bucket
            ),
            split_by,
            missing: self.config.missing,
            max_depth: stopping.max_depth as usize,
            min_split: stopping.min_split,
            // `cp * 0` is `NaN` for `cp = inf`; a pure root never splits.
            threshold: if root_deviance > 0f64 {
                stopping.cp * root_deviance
            } else {
                0f64
            },
        };

        let nodes = grower.grow(rows, 0)?;

        let features = sample.features()
            .iter()
            .map(FeatureInfo::from)
            .collect::<Vec<_>>();
        let model = TreeModel::from_components(
            nodes,
            features,
            target.info(),
            method,
            split_by,
            self.config.missing,
            stopping,
        );

        info!(
            "fitted a {} tree: {} nodes, {} leaves, depth {}, \
             deviance {:.4} -> {:.4}",
            method,
            model.n_nodes(),
            model.n_leaves(),
            model.depth(),
            root_deviance,
            model.training_deviance(),
        );

        Ok(model)
    }


    /// `None` chooses classification for a class target
    /// and regression for a numeric one.
    fn resolve_method(&self, target: &Target) -> Result<Method> {
        let method = match self.config.method {
            Some(method) => method,
            None if target.is_class() => Method::Classification,
            None => Method::Regression,
        };

        if method == Method::Regression {
            if target.is_class() {
                return Err(TreeError::config(format!(
                    "regression needs a numeric target, \
                     but `{}` is categorical",
                    target.name()
                )));
            }
            if self.config.split_by != SplitBy::default() {
                warn!(
                    "`{}` is ignored by regression trees",
                    self.config.split_by
                );
            }
        }

        Ok(method)
    }
}


/// Read-only state shared by the recursive growth.
struct Grower<'a> {
    sample: &'a Sample,
    target: &'a Target,
    evaluator: SplitEvaluator<'a>,
    split_by: SplitBy,
    missing: MissingPolicy,
    max_depth: usize,
    min_split: f64,
    /// Minimal improvement of a split.
    threshold: f64,
}


impl<'a> Grower<'a> {
    /// Grow the subtree holding `rows`.
    /// Returns its arena in pre-order, the subtree root first.
    fn grow(&self, rows: Vec<usize>, depth: usize) -> Result<Vec<Node>> {
        let weights = self.sample.weights();
        let stats = Stats::from_rows(self.target, weights, &rows[..]);
        let deviance = stats.deviance(self.split_by);
        let prediction = stats.prediction(self.target.labels());
        let node = Node::leaf(
            depth, stats.n(), stats.weight(), deviance, prediction
        );


        if depth >= self.max_depth
            || stats.weight() < self.min_split
            || deviance <= 0f64
            || is_pure(self.target, &rows[..])
        {
            trace!("leaf at depth {depth}: {} observations", stats.n());
            return Ok(vec![node]);
        }


        let candidate = match self.evaluator.best_split(&rows[..]) {
            Some(c) if c.improvement >= self.threshold => c,
            _ => {
                trace!("leaf at depth {depth}: no admissible split");
                return Ok(vec![node]);
            },
        };


        let (lrows, rrows, majority) = self.partition(&candidate, rows)?;
        if lrows.is_empty() || rrows.is_empty() {
            return Ok(vec![node]);
        }

        debug!(
            "split at depth {depth}: {:?} improves the deviance by {:.4} \
             ({} | {})",
            candidate.rule,
            candidate.improvement,
            lrows.len(),
            rrows.len(),
        );


        let depth = depth + 1;
        let (left, right) = if lrows.len() + rrows.len() >= PARALLEL_THRESHOLD {
            rayon::join(
                || self.grow(lrows, depth),
                || self.grow(rrows, depth),
            )
        } else {
            (self.grow(lrows, depth), self.grow(rrows, depth))
        };

        Ok(assemble(node, candidate, majority, left?, right?))
    }


    /// Send the rows of a node to the children of `candidate`.
    /// Returns the left rows, the right rows and the heavier side.
    fn partition(&self, candidate: &Candidate, rows: Vec<usize>)
        -> Result<(Vec<usize>, Vec<usize>, LeftRight)>
    {
        let weights = self.sample.weights();
        let feature = &self.sample.features()[candidate.feature];
        let rule = &candidate.rule;

        let mut left = Vec::with_capacity(rows.len());
        let mut right = Vec::with_capacity(rows.len());
        let mut pending = Vec::new();
        let (mut lw, mut rw) = (0f64, 0f64);

        for i in rows {
            let route = match feature {
                Feature::Numeric { vals, .. } => rule.route_number(vals[i]),
                Feature::Categorical { codes, levels, .. } => {
                    rule.route_code(codes[i], levels)
                },
            };

            match (route, self.missing) {
                (Route::Go(LeftRight::Left), _) => {
                    lw += weights[i];
                    left.push(i);
                },
                (Route::Go(LeftRight::Right), _) => {
                    rw += weights[i];
                    right.push(i);
                },
                (Route::Missing, MissingPolicy::Fail) => {
                    return Err(TreeError::missing(feature.name()));
                },
                (Route::Unseen(level), MissingPolicy::Fail) => {
                    return Err(TreeError::UnknownCategory {
                        feature: feature.name().to_string(),
                        level,
                    });
                },
                (_, MissingPolicy::Majority) => { pending.push(i); },
            }
        }

        let majority = if lw >= rw { LeftRight::Left } else { LeftRight::Right };
        match majority {
            LeftRight::Left  => left.append(&mut pending),
            LeftRight::Right => right.append(&mut pending),
        }

        Ok((left, right, majority))
    }
}


/// Join a decision node and the arenas of its subtrees.
fn assemble(
    mut node: Node,
    candidate: Candidate,
    majority: LeftRight,
    left: Vec<Node>,
    right: Vec<Node>,
) -> Vec<Node>
{
    let l_offset = 1;
    let r_offset = 1 + left.len();

    node.branch = Some(Branch {
        rule: candidate.rule,
        improvement: candidate.improvement,
        left: NodeId(l_offset),
        right: NodeId(r_offset),
        majority,
    });

    let mut nodes = Vec::with_capacity(1 + left.len() + right.len());
    nodes.push(node);
    nodes.extend(left.into_iter().map(|n| n.shifted(l_offset)));
    nodes.extend(right.into_iter().map(|n| n.shifted(r_offset)));
    nodes
}
