use serde::{Serialize, Deserialize};

use std::collections::BTreeSet;

use crate::error::{Result, TreeError};
use super::observation::Value;


/// The response column of a [`Sample`](super::Sample).
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Real valued response. Used for regression.
    Numeric {
        /// Column name.
        name: String,
        /// One value per row.
        vals: Vec<f64>,
    },
    /// Class response. `codes[i]` indexes into `labels`.
    Class {
        /// Column name.
        name: String,
        /// One class index per row.
        codes: Vec<usize>,
        /// Distinct labels, sorted.
        labels: Vec<String>,
    },
}


/// Describes the target a tree was fitted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    /// Column name of the response.
    pub name: String,
    /// Class labels. Empty for regression.
    pub labels: Vec<String>,
}


impl Target {
    /// Numeric target.
    pub fn numeric<S: ToString>(name: S, vals: Vec<f64>) -> Self {
        Self::Numeric { name: name.to_string(), vals, }
    }


    /// Class target from raw labels.
    /// Labels are sorted lexicographically.
    pub fn class<S, T>(name: S, raw: &[T]) -> Self
        where S: ToString,
              T: AsRef<str>,
    {
        let labels = raw.iter()
            .map(|s| s.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let codes = raw.iter()
            .map(|s| {
                labels.partition_point(|l| l.as_str() < s.as_ref())
            })
            .collect();

        Self::Class { name: name.to_string(), codes, labels, }
    }


    /// Build a target from cells.
    /// All numeric cells give a numeric target,
    /// all categorical cells give a class target.
    pub(crate) fn from_values<S: ToString>(name: S, values: &[&Value])
        -> Result<Self>
    {
        if let Some(row) = values.iter().position(|v| v.is_missing()) {
            return Err(TreeError::MissingTarget { row });
        }

        let all_numeric = values.iter()
            .all(|v| matches!(v, Value::Numeric(_)));
        if all_numeric {
            let vals = values.iter()
                .map(|v| match v {
                    Value::Numeric(x) => *x,
                    _ => unreachable!(),
                })
                .collect();
            return Ok(Self::numeric(name, vals));
        }

        let all_class = values.iter()
            .all(|v| matches!(v, Value::Categorical(_)));
        if !all_class {
            return Err(TreeError::schema(
                "the target mixes numeric and categorical values"
            ));
        }

        let raw = values.iter()
            .map(|v| match v {
                Value::Categorical(s) => s.as_str(),
                _ => unreachable!(),
            })
            .collect::<Vec<_>>();
        Ok(Self::class(name, &raw[..]))
    }


    /// Column name.
    pub fn name(&self) -> &str {
        match self {
            Self::Numeric { name, .. } => name,
            Self::Class   { name, .. } => name,
        }
    }


    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric { vals,  .. } => vals.len(),
            Self::Class   { codes, .. } => codes.len(),
        }
    }


    /// Returns `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }


    /// Returns `true` for a class response.
    pub fn is_class(&self) -> bool {
        matches!(self, Self::Class { .. })
    }


    /// Class labels. Empty for a numeric target.
    pub fn labels(&self) -> &[String] {
        match self {
            Self::Numeric { .. } => &[],
            Self::Class { labels, .. } => &labels[..],
        }
    }


    /// Number of classes. `0` for a numeric target.
    pub fn n_class(&self) -> usize {
        self.labels().len()
    }


    /// Returns the `row`-th response as a [`Value`].
    pub fn value(&self, row: usize) -> Value {
        match self {
            Self::Numeric { vals, .. } => Value::Numeric(vals[row]),
            Self::Class { codes, labels, .. } => {
                Value::Categorical(labels[codes[row]].clone())
            },
        }
    }


    /// Numeric response at `row`. Panics for a class target.
    #[inline]
    pub(crate) fn numeric_at(&self, row: usize) -> f64 {
        match self {
            Self::Numeric { vals, .. } => vals[row],
            Self::Class { .. } => panic!("class target has no numeric value"),
        }
    }


    /// Class index at `row`. Panics for a numeric target.
    #[inline]
    pub(crate) fn class_at(&self, row: usize) -> usize {
        match self {
            Self::Class { codes, .. } => codes[row],
            Self::Numeric { .. } => panic!("numeric target has no class"),
        }
    }


    /// Convert a numeric target into classes.
    /// Labels are the distinct values in ascending order,
    /// formatted with `Display` (`0`, `1`, `2.5`, ...).
    pub fn into_class(self) -> Self {
        match self {
            Self::Class { .. } => self,
            Self::Numeric { name, vals } => {
                let mut distinct = vals.clone();
                distinct.sort_by(|a, b| a.total_cmp(b));
                distinct.dedup();

                let labels = distinct.iter()
                    .map(|v| v.to_string())
                    .collect();
                let codes = vals.iter()
                    .map(|v| distinct.partition_point(|d| d.total_cmp(v).is_lt()))
                    .collect();
                Self::Class { name, codes, labels, }
            },
        }
    }


    pub(crate) fn select(&self, rows: &[usize]) -> Self {
        match self {
            Self::Numeric { name, vals } => {
                let vals = rows.iter().map(|&i| vals[i]).collect();
                Self::Numeric { name: name.clone(), vals, }
            },
            Self::Class { name, codes, labels } => {
                let codes = rows.iter().map(|&i| codes[i]).collect();
                Self::Class {
                    name: name.clone(),
                    codes,
                    labels: labels.clone(),
                }
            },
        }
    }


    pub(crate) fn info(&self) -> TargetInfo {
        TargetInfo {
            name: self.name().to_string(),
            labels: self.labels().to_vec(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_class_formats_values() {
        let target = Target::numeric("survived", vec![1.0, 0.0, 1.0, 2.5]);
        let target = target.into_class();

        let expected = ["0".to_string(), "1".into(), "2.5".into()];
        assert_eq!(target.labels(), &expected[..]);
        assert_eq!(target.class_at(0), 1);
        assert_eq!(target.class_at(1), 0);
        assert_eq!(target.class_at(3), 2);
    }

    #[test]
    fn test_from_values_rejects_missing() {
        let a = Value::Numeric(1.0);
        let b = Value::Missing;
        let err = Target::from_values("y", &[&a, &b]).unwrap_err();
        assert!(matches!(err, TreeError::MissingTarget { row: 1 }));
    }

    #[test]
    fn test_from_values_rejects_mixed() {
        let a = Value::Numeric(1.0);
        let b = Value::Categorical("yes".into());
        let err = Target::from_values("y", &[&a, &b]).unwrap_err();
        assert!(matches!(err, TreeError::SchemaMismatch { .. }));
    }
}
