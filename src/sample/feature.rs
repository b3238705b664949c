use serde::{Serialize, Deserialize};

use std::mem;
use std::collections::{BTreeSet, HashMap};

use crate::constants::BUFFER_SIZE;
use super::observation::Value;


/// The kind of a predictor column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Real valued column. Split by `x <= threshold`.
    Numeric,
    /// Column of unordered levels. Split by a subset of levels.
    Categorical,
}


/// A predictor column.
/// Missing entries are stored as `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    /// Real-valued column.
    Numeric {
        /// Column name.
        name: String,
        /// One entry per row.
        vals: Vec<Option<f64>>,
    },
    /// Column of level codes.
    Categorical {
        /// Column name.
        name: String,
        /// Index into `levels`, one entry per row.
        codes: Vec<Option<u32>>,
        /// Distinct levels, sorted.
        levels: Vec<String>,
    },
}


impl Feature {
    /// Construct an empty numeric column named `name`.
    pub fn numeric<T: ToString>(name: T) -> Self {
        Self::Numeric {
            name: name.to_string(),
            vals: Vec::with_capacity(BUFFER_SIZE),
        }
    }


    /// Construct a numeric column from the given values.
    pub fn numeric_from<T: ToString>(name: T, vals: Vec<Option<f64>>)
        -> Self
    {
        Self::Numeric { name: name.to_string(), vals, }
    }


    /// Construct a categorical column from raw levels.
    /// Levels are sorted lexicographically and
    /// each entry is stored as the index of its level.
    pub fn categorical_from<T, S>(name: T, raw: &[Option<S>]) -> Self
        where T: ToString,
              S: AsRef<str>,
    {
        let levels = raw.iter()
            .flatten()
            .map(|s| s.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();

        let index = levels.iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i as u32))
            .collect::<HashMap<_, _>>();
        let codes = raw.iter()
            .map(|s| s.as_ref().and_then(|s| index.get(s.as_ref()).copied()))
            .collect::<Vec<_>>();

        Self::Categorical { name: name.to_string(), codes, levels, }
    }


    /// Column name.
    pub fn name(&self) -> &str {
        match self {
            Self::Numeric     { name, .. } => name,
            Self::Categorical { name, .. } => name,
        }
    }


    /// Numeric or categorical.
    pub fn kind(&self) -> FeatureKind {
        match self {
            Self::Numeric     { .. } => FeatureKind::Numeric,
            Self::Categorical { .. } => FeatureKind::Categorical,
        }
    }


    /// Returns the levels of a categorical column,
    /// or an empty slice for a numeric one.
    pub fn levels(&self) -> &[String] {
        match self {
            Self::Numeric     { .. } => &[],
            Self::Categorical { levels, .. } => &levels[..],
        }
    }


    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric     { vals,  .. } => vals.len(),
            Self::Categorical { codes, .. } => codes.len(),
        }
    }


    /// Returns `true` if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }


    /// Appends a numeric value. Panics for a categorical column.
    pub fn append(&mut self, val: Option<f64>) {
        match self {
            Self::Numeric { vals, .. } => vals.push(val),
            Self::Categorical { name, .. } => {
                panic!("Tried to append a number to categorical `{name}`");
            },
        }
    }


    pub(crate) fn replace_name<T>(&mut self, name: T) -> String
        where T: ToString,
    {
        let n = name.to_string();
        match self {
            Self::Numeric     { name, .. } => mem::replace(name, n),
            Self::Categorical { name, .. } => mem::replace(name, n),
        }
    }


    /// Returns `true` if the `row`-th entry is missing.
    #[inline]
    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Self::Numeric     { vals,  .. } => vals[row].is_none(),
            Self::Categorical { codes, .. } => codes[row].is_none(),
        }
    }


    /// Numeric value at `row`. `None` for missing or categorical entries.
    #[inline]
    pub fn numeric_at(&self, row: usize) -> Option<f64> {
        match self {
            Self::Numeric { vals, .. } => vals[row],
            Self::Categorical { .. } => None,
        }
    }


    /// Level code at `row`. `None` for missing or numeric entries.
    #[inline]
    pub fn code_at(&self, row: usize) -> Option<u32> {
        match self {
            Self::Numeric { .. } => None,
            Self::Categorical { codes, .. } => codes[row],
        }
    }


    /// Returns the `row`-th entry as a [`Value`].
    pub fn value(&self, row: usize) -> Value {
        match self {
            Self::Numeric { vals, .. } => {
                vals[row].map(Value::Numeric).unwrap_or(Value::Missing)
            },
            Self::Categorical { codes, levels, .. } => {
                codes[row]
                    .map(|c| Value::Categorical(levels[c as usize].clone()))
                    .unwrap_or(Value::Missing)
            },
        }
    }


    /// Returns a column holding only the given rows, in the given order.
    /// Categorical columns keep their full level set.
    pub(crate) fn select(&self, rows: &[usize]) -> Self {
        match self {
            Self::Numeric { name, vals } => {
                let vals = rows.iter().map(|&i| vals[i]).collect();
                Self::Numeric { name: name.clone(), vals, }
            },
            Self::Categorical { name, codes, levels } => {
                let codes = rows.iter().map(|&i| codes[i]).collect();
                Self::Categorical {
                    name: name.clone(),
                    codes,
                    levels: levels.clone(),
                }
            },
        }
    }


    /// Number of distinct present values.
    pub fn distinct_value_count(&self) -> usize {
        match self {
            Self::Numeric { vals, .. } => {
                let mut values = vals.iter()
                    .flatten()
                    .copied()
                    .collect::<Vec<_>>();
                values.sort_by(|a, b| a.total_cmp(b));
                values.dedup();
                values.len()
            },
            Self::Categorical { codes, .. } => {
                codes.iter()
                    .flatten()
                    .collect::<BTreeSet<_>>()
                    .len()
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorical_levels_are_sorted() {
        let raw = [Some("male"), None, Some("female"), Some("male")];
        let feat = Feature::categorical_from("sex", &raw[..]);

        assert_eq!(feat.levels(), &["female".to_string(), "male".into()]);
        assert_eq!(feat.code_at(0), Some(1));
        assert_eq!(feat.code_at(1), None);
        assert_eq!(feat.code_at(2), Some(0));
        assert!(feat.is_missing(1));
        assert_eq!(feat.distinct_value_count(), 2);
    }

    #[test]
    fn test_numeric_value_and_select() {
        let mut feat = Feature::numeric("age");
        feat.append(Some(22.0));
        feat.append(None);
        feat.append(Some(38.0));

        assert_eq!(feat.value(0), Value::Numeric(22.0));
        assert_eq!(feat.value(1), Value::Missing);

        let sub = feat.select(&[2, 0]);
        assert_eq!(sub.numeric_at(0), Some(38.0));
        assert_eq!(sub.numeric_at(1), Some(22.0));
        assert_eq!(sub.len(), 2);
    }
}
