//! Plain configuration structures for fitting a tree.
use serde::{Serialize, Deserialize};

use std::fmt;

use crate::constants::*;
use crate::error::{Result, TreeError};
use super::split_by::SplitBy;


/// Regression or classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    /// Leaves predict the weighted mean,
    /// splits minimize the weighted sum of squared errors.
    Regression,
    /// Leaves predict weighted class proportions,
    /// splits minimize an impurity (see [`SplitBy`]).
    Classification,
}


impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Regression => "Regression",
            Self::Classification => "Classification",
        };
        write!(f, "{name}")
    }
}


/// What to do with an observation whose split feature is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingPolicy {
    /// Fail with [`TreeError::MissingFeature`].
    #[default]
    Fail,
    /// Send the observation to the child
    /// that received more training weight.
    Majority,
}


/// Stopping criteria of the tree growth.
///
/// | field        | default | meaning                                     |
/// |--------------|---------|---------------------------------------------|
/// | `max_depth`  | `30`    | depth of the deepest node (root is `0`)     |
/// | `min_split`  | `20`    | weighted size needed to attempt a split     |
/// | `min_bucket` | `7`     | weighted size of each child of a split      |
/// | `cp`         | `0.01`  | minimal improvement relative to the root    |
///
/// With these defaults a node weighing less than `20` is never split,
/// so a handful of unit-weight rows stays a single leaf.
/// Lower `min_split` and `min_bucket` when fitting tiny samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoppingConfig {
    /// Maximal node depth. Must be non-negative.
    pub max_depth: i32,
    /// Minimal node weight to attempt a split.
    pub min_split: f64,
    /// Minimal weight of each child.
    pub min_bucket: f64,
    /// Complexity parameter. Splits improving the deviance by less than
    /// `cp` times the root deviance are not kept.
    #[serde(with = "unbounded")]
    pub cp: f64,
}


impl Default for StoppingConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            min_split: DEFAULT_MIN_SPLIT,
            min_bucket: DEFAULT_MIN_BUCKET,
            cp: DEFAULT_CP,
        }
    }
}


impl StoppingConfig {
    /// Check the consistency of the values.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth < 0 {
            return Err(TreeError::config(format!(
                "max_depth must be non-negative, got {}", self.max_depth
            )));
        }
        if self.cp.is_nan() || self.cp < 0f64 {
            return Err(TreeError::config(
                format!("cp must be non-negative, got {}", self.cp)
            ));
        }
        if !self.min_bucket.is_finite() || self.min_bucket < 1f64 {
            return Err(TreeError::config(format!(
                "min_bucket must be a finite value >= 1, got {}",
                self.min_bucket
            )));
        }
        if !self.min_split.is_finite() || self.min_split < 1f64 {
            return Err(TreeError::config(format!(
                "min_split must be a finite value >= 1, got {}",
                self.min_split
            )));
        }
        Ok(())
    }
}


/// `serde_json` writes non-finite floats as `null`,
/// so an infinite `cp` is stored as the string `"inf"`.
mod unbounded {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde::de::Error;


    pub(super) fn serialize<S>(value: &f64, serializer: S)
        -> Result<S::Ok, S::Error>
        where S: Serializer
    {
        if *value == f64::INFINITY {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_f64(*value)
        }
    }


    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }


    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
        where D: Deserializer<'de>
    {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) if text == "inf" => Ok(f64::INFINITY),
            Repr::Text(text) => {
                Err(D::Error::custom(format!("invalid cp value `{text}`")))
            },
        }
    }
}


/// Everything needed to fit a tree.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TreeConfig {
    /// `None` chooses classification for a class target
    /// and regression for a numeric one.
    pub method: Option<Method>,
    /// Impurity for classification. Ignored by regression.
    pub split_by: SplitBy,
    /// When to stop growing.
    pub stopping: StoppingConfig,
    /// How prediction routes a missing split value.
    pub missing: MissingPolicy,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(StoppingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_negative_depth() {
        let config = StoppingConfig { max_depth: -1, ..Default::default() };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TreeError::Configuration { .. }));
    }

    #[test]
    fn test_invalid_cp_and_sizes() {
        let bad = [
            StoppingConfig { cp: -0.1, ..Default::default() },
            StoppingConfig { cp: f64::NAN, ..Default::default() },
            StoppingConfig { min_bucket: 0.0, ..Default::default() },
            StoppingConfig { min_split: f64::INFINITY, ..Default::default() },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?} passed");
        }
    }

    #[test]
    fn test_infinite_cp_is_valid() {
        let config = StoppingConfig { cp: f64::INFINITY, ..Default::default() };
        assert!(config.validate().is_ok());

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"inf\""), "got {json}");
        let back: StoppingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
