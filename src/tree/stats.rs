//! Sufficient statistics of a set of weighted observations.
//!
//! Regression sums are taken around a pivot, the weighted mean of the
//! node the statistics were started from, so that the deviance of
//! responses with a large common offset keeps its precision.
use crate::sample::Target;
use super::node::Prediction;
use super::split_by::SplitBy;


/// Weighted sums that determine the deviance and
/// the prediction of a node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stats {
    Regression {
        n: usize,
        weight: f64,
        /// Responses are accumulated as `y - pivot`.
        pivot: f64,
        sum: f64,
        sum_sq: f64,
    },
    Class {
        n: usize,
        weight: f64,
        counts: Vec<f64>,
    },
}


impl Stats {
    /// Statistics of the empty set, centered at `pivot`.
    pub(crate) fn empty(target: &Target, pivot: f64) -> Self {
        match target {
            Target::Numeric { .. } => {
                Self::Regression {
                    n: 0, weight: 0f64, pivot, sum: 0f64, sum_sq: 0f64,
                }
            },
            Target::Class { labels, .. } => {
                let counts = vec![0f64; labels.len()];
                Self::Class { n: 0, weight: 0f64, counts, }
            },
        }
    }


    /// Statistics of the empty set with the same pivot as `self`.
    pub(crate) fn empty_like(&self) -> Self {
        match self {
            Self::Regression { pivot, .. } => Self::Regression {
                n: 0, weight: 0f64, pivot: *pivot, sum: 0f64, sum_sq: 0f64,
            },
            Self::Class { counts, .. } => Self::Class {
                n: 0, weight: 0f64, counts: vec![0f64; counts.len()],
            },
        }
    }


    /// Statistics of `rows`, centered at their weighted mean.
    pub(crate) fn from_rows(target: &Target, weights: &[f64], rows: &[usize])
        -> Self
    {
        let pivot = match target {
            Target::Numeric { vals, .. } => {
                let (sum, weight) = rows.iter()
                    .fold((0f64, 0f64), |(s, w), &i| {
                        (s + weights[i] * vals[i], w + weights[i])
                    });
                if weight > 0f64 { sum / weight } else { 0f64 }
            },
            Target::Class { .. } => 0f64,
        };

        let mut stats = Self::empty(target, pivot);
        for &i in rows {
            stats.push(target, weights[i], i);
        }
        stats
    }


    /// Add the `row`-th observation with weight `w`.
    #[inline]
    pub(crate) fn push(&mut self, target: &Target, w: f64, row: usize) {
        match self {
            Self::Regression { n, weight, pivot, sum, sum_sq } => {
                let y = target.numeric_at(row) - *pivot;
                *n += 1;
                *weight += w;
                *sum += w * y;
                *sum_sq += w * y * y;
            },
            Self::Class { n, weight, counts } => {
                let k = target.class_at(row);
                *n += 1;
                *weight += w;
                counts[k] += w;
            },
        }
    }


    /// Merge `other` into `self`. Both share the same pivot.
    #[inline]
    pub(crate) fn merge(&mut self, other: &Self) {
        match (self, other) {
            (
                Self::Regression { n, weight, sum, sum_sq, .. },
                Self::Regression { n: n2, weight: w2, sum: s2, sum_sq: q2, .. },
            ) => {
                *n += n2;
                *weight += w2;
                *sum += s2;
                *sum_sq += q2;
            },
            (
                Self::Class { n, weight, counts },
                Self::Class { n: n2, weight: w2, counts: c2 },
            ) => {
                *n += n2;
                *weight += w2;
                counts.iter_mut()
                    .zip(c2)
                    .for_each(|(c, d)| { *c += d; });
            },
            _ => unreachable!("statistics of different kinds"),
        }
    }


    /// Returns `self - other`, the statistics of the complement.
    #[inline]
    pub(crate) fn minus(&self, other: &Self) -> Self {
        match (self, other) {
            (
                Self::Regression { n, weight, pivot, sum, sum_sq },
                Self::Regression { n: n2, weight: w2, sum: s2, sum_sq: q2, .. },
            ) => {
                Self::Regression {
                    n: n - n2,
                    weight: (weight - w2).max(0f64),
                    pivot: *pivot,
                    sum: sum - s2,
                    sum_sq: sum_sq - q2,
                }
            },
            (
                Self::Class { n, weight, counts },
                Self::Class { n: n2, weight: w2, counts: c2 },
            ) => {
                let counts = counts.iter()
                    .zip(c2)
                    .map(|(c, d)| (c - d).max(0f64))
                    .collect();
                Self::Class { n: n - n2, weight: (weight - w2).max(0f64), counts, }
            },
            _ => unreachable!("statistics of different kinds"),
        }
    }


    /// Number of observations.
    #[inline]
    pub(crate) fn n(&self) -> usize {
        match self {
            Self::Regression { n, .. } => *n,
            Self::Class { n, .. } => *n,
        }
    }


    /// Total weight.
    #[inline]
    pub(crate) fn weight(&self) -> f64 {
        match self {
            Self::Regression { weight, .. } => *weight,
            Self::Class { weight, .. } => *weight,
        }
    }


    /// Deviance of the set:
    /// the weighted sum of squared errors for regression,
    /// `weight * impurity` for classification.
    #[inline]
    pub(crate) fn deviance(&self, split_by: SplitBy) -> f64 {
        match self {
            Self::Regression { weight, sum, sum_sq, .. } => {
                if *weight <= 0f64 { return 0f64; }
                (sum_sq - sum * sum / weight).max(0f64)
            },
            Self::Class { weight, counts, .. } => {
                if *weight <= 0f64 { return 0f64; }
                weight * split_by.impurity(counts, *weight)
            },
        }
    }


    /// Mean response for regression,
    /// the share of the last class for classification.
    /// Orders the two sides of a categorical split.
    pub(crate) fn response(&self) -> f64 {
        match self {
            Self::Regression { weight, pivot, sum, .. } => {
                if *weight > 0f64 { pivot + sum / weight } else { 0f64 }
            },
            Self::Class { weight, counts, .. } => {
                match counts.last() {
                    Some(c) if *weight > 0f64 => c / weight,
                    _ => 0f64,
                }
            },
        }
    }


    /// The prediction of a leaf holding this set.
    /// `labels` are the class labels (unused for regression).
    pub(crate) fn prediction(&self, labels: &[String]) -> Prediction {
        match self {
            Self::Regression { .. } => Prediction::Value(self.response()),
            Self::Class { weight, counts, .. } => {
                let probabilities = counts.iter()
                    .map(|c| if *weight > 0f64 { c / weight } else { 0f64 })
                    .collect::<Vec<_>>();

                // Ties go to the lowest class index.
                let class = counts.iter()
                    .enumerate()
                    .fold(0, |best, (k, c)| if *c > counts[best] { k } else { best });

                Prediction::Class {
                    class,
                    label: labels[class].clone(),
                    probabilities,
                }
            },
        }
    }
}


/// Returns `true` if every observation has the same response.
pub(crate) fn is_pure(target: &Target, rows: &[usize]) -> bool {
    let Some(&first) = rows.first() else { return true; };
    match target {
        Target::Numeric { vals, .. } => {
            rows.iter().all(|&i| vals[i] == vals[first])
        },
        Target::Class { codes, .. } => {
            rows.iter().all(|&i| codes[i] == codes[first])
        },
    }
}
