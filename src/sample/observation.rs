//! Row-oriented view of the data:
//! [`Value`], [`Observation`] and [`Schema`].
use serde::{Serialize, Deserialize};

use std::fmt;
use std::collections::HashMap;

use super::feature::FeatureKind;


/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A real number.
    Numeric(f64),
    /// A categorical level.
    Categorical(String),
    /// No value.
    Missing,
}


impl Value {
    /// Returns `true` for [`Value::Missing`].
    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}


impl From<f64> for Value {
    #[inline]
    fn from(x: f64) -> Self {
        Self::Numeric(x)
    }
}


impl From<i32> for Value {
    #[inline]
    fn from(x: i32) -> Self {
        Self::Numeric(x as f64)
    }
}


impl From<&str> for Value {
    #[inline]
    fn from(s: &str) -> Self {
        Self::Categorical(s.to_string())
    }
}


impl From<String> for Value {
    #[inline]
    fn from(s: String) -> Self {
        Self::Categorical(s)
    }
}


impl<T> From<Option<T>> for Value
    where T: Into<Value>,
{
    #[inline]
    fn from(x: Option<T>) -> Self {
        x.map(Into::into).unwrap_or(Self::Missing)
    }
}


impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(x) => write!(f, "{x}"),
            Self::Categorical(s) => write!(f, "{s}"),
            Self::Missing => write!(f, "NA"),
        }
    }
}


/// A row: named feature values, an optional target and a weight.
///
/// ```
/// use cartree::Observation;
///
/// let obs = Observation::new()
///     .with("sex", "female")
///     .with("age", 29.0)
///     .target(1.0);
/// assert_eq!(obs.weight(), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    values: HashMap<String, Value>,
    target: Option<Value>,
    weight: f64,
}


impl Default for Observation {
    fn default() -> Self {
        Self::new()
    }
}


impl Observation {
    /// An observation without values. The weight is `1`.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            target: None,
            weight: 1f64,
        }
    }


    /// Set the value of feature `name`.
    pub fn with<S, V>(mut self, name: S, value: V) -> Self
        where S: ToString,
              V: Into<Value>,
    {
        self.values.insert(name.to_string(), value.into());
        self
    }


    /// Set the target value.
    pub fn target<V: Into<Value>>(mut self, value: V) -> Self {
        self.target = Some(value.into());
        self
    }


    /// Set the weight.
    pub fn weight_of(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }


    /// Observation weight, `1` unless set.
    pub fn weight(&self) -> f64 {
        self.weight
    }


    /// Returns the value of feature `name`, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }


    /// The response, if set.
    pub fn target_value(&self) -> Option<&Value> {
        self.target.as_ref()
    }


    /// Names of the features with a value.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }


    /// Number of feature values.
    pub fn len(&self) -> usize {
        self.values.len()
    }


    /// Returns `true` if no feature value is set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}


/// Ordered list of predictor names and kinds.
/// The order is the tie-breaking order of the split search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<(String, FeatureKind)>,
}


impl Schema {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }


    /// Append a numeric column.
    pub fn numeric<S: ToString>(mut self, name: S) -> Self {
        self.columns.push((name.to_string(), FeatureKind::Numeric));
        self
    }


    /// Append a categorical column.
    pub fn categorical<S: ToString>(mut self, name: S) -> Self {
        self.columns.push((name.to_string(), FeatureKind::Categorical));
        self
    }


    /// Names and kinds, in order.
    pub fn columns(&self) -> &[(String, FeatureKind)] {
        &self.columns[..]
    }


    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }


    /// Returns `true` if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }


    /// Returns `true` if a column is named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }
}
