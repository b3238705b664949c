use polars::prelude::*;
use rayon::prelude::*;

use std::path::Path;
use std::ops::Index;
use std::collections::{HashMap, HashSet};

use crate::error::{Result, TreeError};
use super::feature::{Feature, FeatureKind};
use super::formula::Formula;
use super::observation::{Observation, Schema, Value};
use super::target::Target;


/// Struct `Sample` holds a batch of weighted observations
/// in column-major form.
///
/// Invariants (checked on construction):
/// every column has `n_sample` rows,
/// weights are finite and non-negative,
/// the target has no missing value.
#[derive(Debug, Clone)]
pub struct Sample {
    pub(super) name_to_index: HashMap<String, usize>,
    pub(super) features: Vec<Feature>,
    pub(super) target: Target,
    pub(super) weights: Vec<f64>,
    pub(super) n_sample: usize,
    pub(super) n_feature: usize,
}


impl Sample {
    /// Construct a new `Sample` from columns.
    /// If `weights` is `None`, every observation has weight `1`.
    pub fn new(
        features: Vec<Feature>,
        target: Target,
        weights: Option<Vec<f64>>,
    ) -> Result<Self>
    {
        let n_sample = target.len();

        if let Some(feat) = features.iter().find(|f| f.len() != n_sample) {
            return Err(TreeError::schema(format!(
                "feature `{}` has {} rows, but the target has {n_sample}",
                feat.name(), feat.len(),
            )));
        }

        if let Target::Numeric { vals, .. } = &target {
            if let Some(row) = vals.iter().position(|y| y.is_nan()) {
                return Err(TreeError::MissingTarget { row });
            }
        }

        let mut seen = HashSet::new();
        for feat in features.iter() {
            if !seen.insert(feat.name()) {
                return Err(TreeError::schema(
                    format!("duplicated feature name `{}`", feat.name())
                ));
            }
        }
        if seen.contains(target.name()) {
            return Err(TreeError::schema(format!(
                "target `{}` is also a feature", target.name()
            )));
        }

        let weights = weights.unwrap_or_else(|| vec![1f64; n_sample]);
        if weights.len() != n_sample {
            return Err(TreeError::schema(format!(
                "{} weights are given for {n_sample} rows", weights.len()
            )));
        }
        let invalid = weights.iter()
            .position(|w| !w.is_finite() || *w < 0f64);
        if let Some(row) = invalid {
            let weight = weights[row];
            return Err(TreeError::InvalidWeight { row, weight });
        }

        let n_feature = features.len();
        let name_to_index = features.iter()
            .enumerate()
            .map(|(i, f)| (f.name().to_string(), i))
            .collect::<HashMap<_, _>>();

        Ok(Self {
            name_to_index, features, target, weights, n_sample, n_feature,
        })
    }


    /// Build a `Sample` from row-oriented observations.
    ///
    /// Every observation must carry exactly the columns of `schema`,
    /// with values of the declared kind (or `Value::Missing`),
    /// a target value and a non-negative weight.
    pub fn from_observations<S: ToString>(
        schema: &Schema,
        target: S,
        rows: &[Observation],
    ) -> Result<Self>
    {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(TreeError::schema(format!(
                    "row {i} has {} features, the schema has {}",
                    row.len(), schema.len(),
                )));
            }
            if let Some(name) = row.names().find(|n| !schema.contains(n)) {
                return Err(TreeError::schema(
                    format!("row {i} has a feature `{name}` not in the schema")
                ));
            }
        }

        let features = schema.columns()
            .iter()
            .map(|(name, kind)| column_of(name, *kind, rows))
            .collect::<Result<Vec<_>>>()?;

        let mut values = Vec::with_capacity(rows.len());
        for (row, obs) in rows.iter().enumerate() {
            let value = obs.target_value()
                .ok_or(TreeError::MissingTarget { row })?;
            values.push(value);
        }
        let target = Target::from_values(target, &values[..])?;

        let weights = rows.iter()
            .map(|obs| obs.weight())
            .collect::<Vec<_>>();

        Self::new(features, target, Some(weights))
    }


    /// Convert a `polars::DataFrame` into `Sample`.
    /// The target and predictors are chosen by `formula`;
    /// `weight` names an optional column of case weights.
    /// Numeric columns become numeric features,
    /// every other column is treated as categorical.
    pub fn from_dataframe(
        data: &DataFrame,
        formula: &Formula,
        weight: Option<&str>,
    ) -> Result<Self>
    {
        let names = data.get_column_names();
        let predictors = formula.select_excluding(&names[..], weight)?;

        let features = predictors.par_iter()
            .map(|name| {
                let series = data.column(name)?;
                feature_from_series(series)
            })
            .collect::<Result<Vec<_>>>()?;

        let target = target_from_series(data.column(formula.target())?)?;

        let weights = match weight {
            None => None,
            Some(name) => Some(weights_from_series(data.column(name)?)?),
        };

        Self::new(features, target, weights)
    }


    /// Read a CSV file and convert it with [`Sample::from_dataframe`].
    pub fn from_csv<P>(
        file: P,
        has_header: bool,
        formula: &Formula,
        weight: Option<&str>,
    ) -> Result<Self>
        where P: AsRef<Path>,
    {
        let data = CsvReader::from_path(file.as_ref())?
            .has_header(has_header)
            .finish()?;
        Self::from_dataframe(&data, formula, weight)
    }


    /// Returns the pair of the number of examples and
    /// the number of features
    pub fn shape(&self) -> (usize, usize) {
        (self.n_sample, self.n_feature)
    }


    /// Returns a slice of the features.
    pub fn features(&self) -> &[Feature] {
        &self.features[..]
    }


    /// Returns the feature named `name`, if any.
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.name_to_index.get(name)
            .map(|&i| &self.features[i])
    }


    /// The response column.
    pub fn target(&self) -> &Target {
        &self.target
    }


    /// Observation weights, one per row.
    pub fn weights(&self) -> &[f64] {
        &self.weights[..]
    }


    /// Sum of the weights.
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }


    /// Returns the schema of the predictors.
    pub fn schema(&self) -> Schema {
        self.features.iter()
            .fold(Schema::new(), |schema, feat| match feat.kind() {
                FeatureKind::Numeric => schema.numeric(feat.name()),
                FeatureKind::Categorical => schema.categorical(feat.name()),
            })
    }


    /// Returns the `row`-th observation, target and weight included.
    pub fn observation(&self, row: usize) -> Observation {
        self.features.iter()
            .fold(Observation::new(), |obs, feat| {
                obs.with(feat.name(), feat.value(row))
            })
            .target(self.target.value(row))
            .weight_of(self.weights[row])
    }


    /// Returns a new sample holding the given rows in the given order.
    pub fn subset(&self, rows: &[usize]) -> Self {
        let features = self.features.iter()
            .map(|f| f.select(rows))
            .collect();
        let target = self.target.select(rows);
        let weights = rows.iter().map(|&i| self.weights[i]).collect();

        Self {
            name_to_index: self.name_to_index.clone(),
            features,
            target,
            weights,
            n_sample: rows.len(),
            n_feature: self.n_feature,
        }
    }


    /// Collapse identical rows into one weighted observation.
    ///
    /// Two rows are identical when every feature and the target agree
    /// (missing equals missing). The surviving row is the first
    /// occurrence; its weight is the sum of the group's weights.
    pub fn aggregate(&self) -> Self {
        let mut groups: HashMap<Vec<Cell>, usize> = HashMap::new();
        let mut rows = Vec::new();
        let mut weights: Vec<f64> = Vec::new();

        for i in 0..self.n_sample {
            let key = self.row_key(i);
            match groups.get(&key) {
                Some(&g) => { weights[g] += self.weights[i]; },
                None => {
                    groups.insert(key, rows.len());
                    rows.push(i);
                    weights.push(self.weights[i]);
                },
            }
        }

        let mut sample = self.subset(&rows[..]);
        sample.weights = weights;
        sample
    }


    fn row_key(&self, row: usize) -> Vec<Cell> {
        let mut key = self.features.iter()
            .map(|feat| match feat {
                Feature::Numeric { vals, .. } => {
                    vals[row].map(Cell::number).unwrap_or(Cell::Missing)
                },
                Feature::Categorical { codes, .. } => {
                    codes[row].map(Cell::Code).unwrap_or(Cell::Missing)
                },
            })
            .collect::<Vec<_>>();
        let y = match &self.target {
            Target::Numeric { vals, .. } => Cell::number(vals[row]),
            Target::Class { codes, .. } => Cell::Code(codes[row] as u32),
        };
        key.push(y);
        key
    }


    /// Set the feature (column) names.
    /// Returns the old names.
    pub fn replace_names<S, T>(&mut self, names: T) -> Result<Vec<String>>
        where S: ToString,
              T: AsRef<[S]>,
    {
        let names = names.as_ref();

        if names.len() != self.n_feature {
            return Err(TreeError::schema(format!(
                "{} names are given for {} features",
                names.len(), self.n_feature,
            )));
        }

        let old_names = names.iter()
            .zip(&mut self.features[..])
            .map(|(name, feature)| feature.replace_name(name.to_string()))
            .collect();

        self.name_to_index = self.features.iter()
            .map(|feature| feature.name().to_string())
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();
        Ok(old_names)
    }
}


impl<S> Index<S> for Sample
    where S: AsRef<str>
{
    type Output = Feature;
    fn index(&self, name: S) -> &Self::Output {
        let name = name.as_ref();
        let idx = self.name_to_index.get(name)
            .unwrap_or_else(|| panic!("The feature `{name}` does not exist"));
        &self.features[*idx]
    }
}


/// Hashable cell used by [`Sample::aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Cell {
    Number(u64),
    Code(u32),
    Missing,
}


impl Cell {
    #[inline]
    fn number(x: f64) -> Self {
        // `-0.0` and `0.0` belong to the same group.
        let x = if x == 0f64 { 0f64 } else { x };
        Self::Number(x.to_bits())
    }
}


fn column_of(name: &str, kind: FeatureKind, rows: &[Observation])
    -> Result<Feature>
{
    let mismatch = |i: usize, value: &Value| {
        TreeError::schema(format!(
            "row {i}: feature `{name}` is {kind:?}, but got `{value}`"
        ))
    };

    match kind {
        FeatureKind::Numeric => {
            let mut vals = Vec::with_capacity(rows.len());
            for (i, obs) in rows.iter().enumerate() {
                match obs.get(name) {
                    Some(Value::Numeric(x)) => vals.push(Some(*x)),
                    Some(Value::Missing) => vals.push(None),
                    Some(value) => return Err(mismatch(i, value)),
                    None => return Err(TreeError::schema(
                        format!("row {i} has no feature `{name}`")
                    )),
                }
            }
            Ok(Feature::numeric_from(name, vals))
        },
        FeatureKind::Categorical => {
            let mut raw = Vec::with_capacity(rows.len());
            for (i, obs) in rows.iter().enumerate() {
                match obs.get(name) {
                    Some(Value::Categorical(s)) => raw.push(Some(s.as_str())),
                    Some(Value::Missing) => raw.push(None),
                    Some(value) => return Err(mismatch(i, value)),
                    None => return Err(TreeError::schema(
                        format!("row {i} has no feature `{name}`")
                    )),
                }
            }
            Ok(Feature::categorical_from(name, &raw[..]))
        },
    }
}


fn feature_from_series(series: &Series) -> Result<Feature> {
    let name = series.name();
    if series.dtype().is_numeric() {
        let casted = series.cast(&DataType::Float64)?;
        let vals = casted.f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect::<Vec<_>>();
        Ok(Feature::numeric_from(name, vals))
    } else {
        let casted = series.cast(&DataType::Utf8)?;
        let raw = casted.utf8()?
            .into_iter()
            .collect::<Vec<_>>();
        Ok(Feature::categorical_from(name, &raw[..]))
    }
}


fn target_from_series(series: &Series) -> Result<Target> {
    let name = series.name();
    if series.dtype().is_numeric() {
        let casted = series.cast(&DataType::Float64)?;
        let vals = casted.f64()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.filter(|x| !x.is_nan())
                    .ok_or(TreeError::MissingTarget { row })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Target::numeric(name, vals))
    } else {
        let casted = series.cast(&DataType::Utf8)?;
        let raw = casted.utf8()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.ok_or(TreeError::MissingTarget { row }))
            .collect::<Result<Vec<_>>>()?;
        Ok(Target::class(name, &raw[..]))
    }
}


fn weights_from_series(series: &Series) -> Result<Vec<f64>> {
    let casted = series.cast(&DataType::Float64)?;
    let weights = casted.f64()?
        .into_iter()
        .enumerate()
        .map(|(row, w)| {
            w.ok_or(TreeError::InvalidWeight { row, weight: f64::NAN })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(weights)
}
