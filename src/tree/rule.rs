//! Splitting rules of the branch nodes.
use fixedbitset::FixedBitSet;
use serde::{Serialize, Deserialize};

use crate::error::{Result, TreeError};
use crate::sample::Value;


/// The output of the function `split` of `Splitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeftRight {
    /// The left child.
    Left,
    /// The right child.
    Right,
}


/// Where an observation goes at a branch node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Route {
    Go(LeftRight),
    /// The value of the split feature is missing.
    Missing,
    /// A categorical level on neither side of the split.
    Unseen(String),
}


/// A binary splitting rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Splitter {
    /// `x <= threshold` goes left.
    Numeric {
        /// Name of the split feature.
        feature: String,
        /// Largest value going left.
        threshold: f64,
    },
    /// Levels in `left` go left, levels in `right` go right.
    /// Bits index the levels of the fitted feature.
    Categorical {
        /// Name of the split feature.
        feature: String,
        /// Levels going left.
        left: FixedBitSet,
        /// Levels going right.
        right: FixedBitSet,
    },
}


impl Splitter {
    /// A numeric rule on `name`.
    #[inline]
    pub fn numeric(name: &str, threshold: f64) -> Self {
        Self::Numeric { feature: name.to_string(), threshold, }
    }


    /// A categorical rule on `name`.
    /// The two sets must be disjoint.
    #[inline]
    pub fn categorical(name: &str, left: FixedBitSet, right: FixedBitSet)
        -> Self
    {
        Self::Categorical { feature: name.to_string(), left, right, }
    }


    /// Name of the feature this rule reads.
    pub fn feature(&self) -> &str {
        match self {
            Self::Numeric     { feature, .. } => feature,
            Self::Categorical { feature, .. } => feature,
        }
    }


    /// Route a numeric entry of the training sample.
    #[inline]
    pub(crate) fn route_number(&self, x: Option<f64>) -> Route {
        match (self, x) {
            (_, None) => Route::Missing,
            (Self::Numeric { threshold, .. }, Some(x)) => {
                if x <= *threshold {
                    Route::Go(LeftRight::Left)
                } else {
                    Route::Go(LeftRight::Right)
                }
            },
            (Self::Categorical { .. }, Some(_)) => {
                unreachable!("numeric entry routed by a categorical rule")
            },
        }
    }


    /// Route a level code of the training sample.
    #[inline]
    pub(crate) fn route_code(&self, code: Option<u32>, levels: &[String])
        -> Route
    {
        match (self, code) {
            (_, None) => Route::Missing,
            (Self::Categorical { left, right, .. }, Some(c)) => {
                let c = c as usize;
                if left.contains(c) {
                    Route::Go(LeftRight::Left)
                } else if right.contains(c) {
                    Route::Go(LeftRight::Right)
                } else {
                    Route::Unseen(levels[c].clone())
                }
            },
            (Self::Numeric { .. }, Some(_)) => {
                unreachable!("level code routed by a numeric rule")
            },
        }
    }


    /// Route a cell of an observation.
    /// `levels` are the fitted levels of the split feature.
    pub(crate) fn route_value(&self, value: &Value, levels: &[String])
        -> Result<Route>
    {
        match (self, value) {
            (_, Value::Missing) => Ok(Route::Missing),
            (Self::Numeric { .. }, Value::Numeric(x)) => {
                Ok(self.route_number(Some(*x)))
            },
            (Self::Categorical { .. }, Value::Categorical(s)) => {
                let code = levels.iter().position(|l| l == s);
                match code {
                    Some(c) => Ok(self.route_code(Some(c as u32), levels)),
                    None => Ok(Route::Unseen(s.clone())),
                }
            },
            (rule, value) => Err(TreeError::schema(format!(
                "feature `{}` cannot take the value `{value}`", rule.feature()
            ))),
        }
    }


    /// Human readable condition of the edge to `side`,
    /// e.g., `age <= 9.5` or `sex = female`.
    pub fn describe(&self, side: LeftRight, levels: &[String]) -> String {
        match (self, side) {
            (Self::Numeric { feature, threshold }, LeftRight::Left) => {
                format!("{feature} <= {threshold}")
            },
            (Self::Numeric { feature, threshold }, LeftRight::Right) => {
                format!("{feature} > {threshold}")
            },
            (Self::Categorical { feature, left, right }, side) => {
                let set = match side {
                    LeftRight::Left  => left,
                    LeftRight::Right => right,
                };
                let names = set.ones()
                    .filter_map(|c| levels.get(c).map(|s| s.as_str()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{feature} = {names}")
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> Vec<String> {
        vec!["1st".into(), "2nd".into(), "3rd".into(), "crew".into()]
    }

    fn class_rule() -> Splitter {
        let mut left = FixedBitSet::with_capacity(4);
        left.insert(0);
        left.insert(1);
        let mut right = FixedBitSet::with_capacity(4);
        right.insert(2);
        Splitter::categorical("class", left, right)
    }

    #[test]
    fn test_numeric_route() {
        let rule = Splitter::numeric("age", 9.5);
        assert_eq!(rule.route_number(Some(9.5)), Route::Go(LeftRight::Left));
        assert_eq!(rule.route_number(Some(9.6)), Route::Go(LeftRight::Right));
        assert_eq!(rule.route_number(None), Route::Missing);
    }

    #[test]
    fn test_categorical_route() {
        let rule = class_rule();
        let levels = levels();
        let route = rule.route_value(&Value::from("2nd"), &levels).unwrap();
        assert_eq!(route, Route::Go(LeftRight::Left));
        let route = rule.route_value(&Value::from("3rd"), &levels).unwrap();
        assert_eq!(route, Route::Go(LeftRight::Right));
        let route = rule.route_value(&Value::from("crew"), &levels).unwrap();
        assert_eq!(route, Route::Unseen("crew".into()));
        let route = rule.route_value(&Value::from("4th"), &levels).unwrap();
        assert_eq!(route, Route::Unseen("4th".into()));
    }

    #[test]
    fn test_kind_mismatch() {
        let rule = Splitter::numeric("age", 9.5);
        let err = rule.route_value(&Value::from("old"), &[]).unwrap_err();
        assert!(matches!(err, TreeError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_describe() {
        let rule = class_rule();
        assert_eq!(rule.describe(LeftRight::Left, &levels()), "class = 1st, 2nd");
        let rule = Splitter::numeric("age", 9.5);
        assert_eq!(rule.describe(LeftRight::Right, &[]), "age > 9.5");
    }
}
