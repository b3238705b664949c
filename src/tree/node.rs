//! A node struct used in the decision tree algorithm.
//!
//! Nodes live in an arena (`Vec<Node>`) owned by the model.
//! Children are referred to by [`NodeId`]; every node except the root
//! has exactly one parent.
use serde::{Serialize, Deserialize};

use std::fmt;

use super::rule::{LeftRight, Splitter};


/// Index of a node in the arena of a tree.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);


impl NodeId {
    #[inline]
    pub(crate) fn shift(self, offset: usize) -> Self {
        Self(self.0 + offset)
    }
}


impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}


/// The fitted value of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Prediction {
    /// Weighted mean of the response.
    Value(f64),
    /// Weighted class proportions and the majority class.
    Class {
        /// Index of the majority class.
        class: usize,
        /// Label of the majority class.
        label: String,
        /// Weighted share of each class, in label order.
        probabilities: Vec<f64>,
    },
}


impl Prediction {
    /// The predicted value for regression,
    /// the majority class index (as `f64`) for classification.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Value(v) => *v,
            Self::Class { class, .. } => *class as f64,
        }
    }


    /// The predicted class label, if any.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Value(_) => None,
            Self::Class { label, .. } => Some(label),
        }
    }
}


impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:.4}"),
            Self::Class { label, probabilities, .. } => {
                let probs = probabilities.iter()
                    .map(|p| format!("{p:.2}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                write!(f, "{label} ({probs})")
            },
        }
    }
}


/// The splitting part of a decision node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// The test sending an observation left or right.
    pub rule: Splitter,
    /// Deviance reduction achieved by this split.
    pub improvement: f64,
    /// Child taking observations that satisfy the rule.
    pub left: NodeId,
    /// Child taking the remaining observations.
    pub right: NodeId,
    /// The child that received more training weight.
    pub majority: LeftRight,
}


impl Branch {
    /// The child on `side`.
    #[inline]
    pub fn child(&self, side: LeftRight) -> NodeId {
        match side {
            LeftRight::Left  => self.left,
            LeftRight::Right => self.right,
        }
    }
}


/// A leaf node (`branch == None`) or a decision node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Distance from the root, which has depth `0`.
    pub depth: usize,
    /// Number of training observations.
    pub n_obs: usize,
    /// Total training weight.
    pub weight: f64,
    /// Deviance of the node as a leaf.
    pub deviance: f64,
    /// Fitted value of the node.
    pub prediction: Prediction,
    /// The split, `None` for a leaf.
    pub branch: Option<Branch>,
}


impl Node {
    pub(crate) fn leaf(
        depth: usize,
        n_obs: usize,
        weight: f64,
        deviance: f64,
        prediction: Prediction,
    ) -> Self
    {
        Self { depth, n_obs, weight, deviance, prediction, branch: None, }
    }


    /// Returns `true` if the node has no split.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.branch.is_none()
    }


    /// Drop the split, turning this node into a leaf.
    #[inline]
    pub(crate) fn collapse(&mut self) {
        self.branch = None;
    }


    /// Move the node `offset` slots down an arena.
    #[inline]
    pub(crate) fn shifted(mut self, offset: usize) -> Self {
        if let Some(branch) = self.branch.as_mut() {
            branch.left = branch.left.shift(offset);
            branch.right = branch.right.shift(offset);
        }
        self
    }
}
