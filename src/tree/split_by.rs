use fixedbitset::FixedBitSet;
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use std::fmt;

use crate::constants::{MAX_EXHAUSTIVE_LEVELS, NUMERIC_TOLERANCE};
use crate::sample::{Feature, Sample, Target};
use super::rule::Splitter;
use super::stats::Stats;


/// Impurity used to grow classification trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SplitBy {
    /// Gini index.
    #[default]
    Gini,
    /// Entropy (natural logarithm).
    Entropy,
}


impl fmt::Display for SplitBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gini => "Gini index",
            Self::Entropy => "Entropy",
        };

        write!(f, "{name}")
    }
}


impl SplitBy {
    /// Impurity of the class weights `counts` summing to `total`.
    #[inline]
    pub(crate) fn impurity(&self, counts: &[f64], total: f64) -> f64 {
        if total <= 0f64 { return 0f64; }
        match self {
            Self::Gini => {
                let correct = counts.iter()
                    .map(|&w| (w / total).powi(2))
                    .sum::<f64>();
                (1f64 - correct).max(0f64)
            },
            Self::Entropy => {
                counts.iter()
                    .map(|&w| {
                        let r = w / total;
                        if r <= 0f64 { 0f64 } else { -r * r.ln() }
                    })
                    .sum::<f64>()
            },
        }
    }
}


/// The best split found for one feature.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    /// Position of the feature in the sample.
    pub(crate) feature: usize,
    pub(crate) rule: Splitter,
    pub(crate) improvement: f64,
}


/// Searches the best binary split of a node.
/// Pure: reads the sample, never mutates it.
pub(crate) struct SplitEvaluator<'a> {
    pub(crate) sample: &'a Sample,
    pub(crate) target: &'a Target,
    pub(crate) split_by: SplitBy,
    pub(crate) min_bucket: f64,
}


impl<'a> SplitEvaluator<'a> {
    pub(crate) fn new(
        sample: &'a Sample,
        target: &'a Target,
        split_by: SplitBy,
        min_bucket: f64,
    ) -> Self
    {
        Self { sample, target, split_by, min_bucket, }
    }


    /// Returns the split with the largest improvement over all features.
    /// Ties go to the earlier feature.
    /// `None` means that no feature yields a valid split.
    pub(crate) fn best_split(&self, rows: &[usize]) -> Option<Candidate> {
        self.sample.features()
            .par_iter()
            .enumerate()
            .map(|(f, feature)| self.best_split_of(f, feature, rows))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .fold(None, |best: Option<Candidate>, cand| match best {
                Some(b) if b.improvement >= cand.improvement => Some(b),
                _ => Some(cand),
            })
    }


    /// Returns the best split on a single feature.
    pub(crate) fn best_split_of(
        &self,
        f: usize,
        feature: &Feature,
        rows: &[usize],
    ) -> Option<Candidate>
    {
        match feature {
            Feature::Numeric { name, vals } => {
                self.numeric_split(vals, rows)
                    .map(|(improvement, threshold)| Candidate {
                        feature: f,
                        rule: Splitter::numeric(name, threshold),
                        improvement,
                    })
            },
            Feature::Categorical { name, codes, levels } => {
                self.categorical_split(codes, levels.len(), rows)
                    .map(|(improvement, left, right)| Candidate {
                        feature: f,
                        rule: Splitter::categorical(name, left, right),
                        improvement,
                    })
            },
        }
    }


    /// Both sides of a split must hold an observation
    /// and at least `min_bucket` weight.
    #[inline]
    fn admissible(&self, stats: &Stats) -> bool {
        stats.n() > 0 && stats.weight() >= self.min_bucket
    }


    /// Only strictly positive improvements count.
    #[inline]
    fn accept(&self, improvement: f64, parent: f64) -> bool {
        improvement > NUMERIC_TOLERANCE * parent
            && improvement > 0f64
    }


    /// Scans the sorted values of a numeric feature.
    /// Returns `(improvement, threshold)`; `x <= threshold` goes left.
    fn numeric_split(&self, vals: &[Option<f64>], rows: &[usize])
        -> Option<(f64, f64)>
    {
        let weights = self.sample.weights();
        let mut present = rows.iter()
            .filter_map(|&i| vals[i].map(|x| (x, i)))
            .collect::<Vec<_>>();
        if present.len() < 2 { return None; }

        present.sort_by(|a, b| a.0.total_cmp(&b.0));

        let present_rows = present.iter()
            .map(|&(_, i)| i)
            .collect::<Vec<_>>();
        let total = Stats::from_rows(self.target, weights, &present_rows[..]);
        let parent = total.deviance(self.split_by);

        let mut left = total.empty_like();
        let mut best: Option<(f64, f64)> = None;

        for k in 0..present.len() - 1 {
            let (x, i) = present[k];
            left.push(self.target, weights[i], i);

            // Cut only between distinct values.
            if present[k + 1].0 <= x { continue; }

            let right = total.minus(&left);
            if !self.admissible(&left) || !self.admissible(&right) {
                continue;
            }

            let improvement = parent
                - left.deviance(self.split_by)
                - right.deviance(self.split_by);

            if best.map_or(true, |(b, _)| improvement > b) {
                best = Some((improvement, x));
            }
        }

        best.filter(|&(improvement, _)| self.accept(improvement, parent))
    }


    /// Searches the partitions of the observed levels.
    /// Returns `(improvement, left levels, right levels)`,
    /// oriented so that the left levels have the smaller mean response
    /// (the smaller share of the last class for classification).
    fn categorical_split(
        &self,
        codes: &[Option<u32>],
        n_levels: usize,
        rows: &[usize],
    ) -> Option<(f64, FixedBitSet, FixedBitSet)>
    {
        let weights = self.sample.weights();

        let present = rows.iter()
            .copied()
            .filter(|&i| codes[i].is_some())
            .collect::<Vec<_>>();
        let total = Stats::from_rows(self.target, weights, &present[..]);

        let mut per_level = vec![total.empty_like(); n_levels];
        for &i in present.iter() {
            if let Some(c) = codes[i] {
                per_level[c as usize].push(self.target, weights[i], i);
            }
        }

        let observed = (0..n_levels)
            .filter(|&c| per_level[c].n() > 0)
            .collect::<Vec<_>>();
        let k = observed.len();
        if k < 2 { return None; }

        let parent = total.deviance(self.split_by);

        // Each partition is a subset of positions in `observed`.
        // With exhaustive search, the last level always stays right
        // so that every partition is visited once.
        let partitions: Box<dyn Iterator<Item = Vec<usize>>> =
            if k <= MAX_EXHAUSTIVE_LEVELS {
                Box::new((1u32..(1u32 << (k - 1))).map(move |mask| {
                    (0..k).filter(|j| mask & (1 << j) != 0).collect()
                }))
            } else {
                Box::new((0..k).map(|j| vec![j]))
            };

        let mut best: Option<(f64, Vec<usize>)> = None;
        for subset in partitions {
            let mut left = total.empty_like();
            for &j in subset.iter() {
                left.merge(&per_level[observed[j]]);
            }
            let right = total.minus(&left);
            if !self.admissible(&left) || !self.admissible(&right) {
                continue;
            }

            let improvement = parent
                - left.deviance(self.split_by)
                - right.deviance(self.split_by);

            if best.as_ref().map_or(true, |(b, _)| improvement > *b) {
                best = Some((improvement, subset));
            }
        }

        let (improvement, subset) = best?;
        if !self.accept(improvement, parent) { return None; }

        let mut left = FixedBitSet::with_capacity(n_levels);
        let mut right = FixedBitSet::with_capacity(n_levels);
        let mut left_stats = total.empty_like();
        for (j, &c) in observed.iter().enumerate() {
            if subset.contains(&j) {
                left.insert(c);
                left_stats.merge(&per_level[c]);
            } else {
                right.insert(c);
            }
        }

        // The side with the smaller response goes left.
        let right_stats = total.minus(&left_stats);
        if left_stats.response() > right_stats.response() {
            return Some((improvement, right, left));
        }
        Some((improvement, left, right))
    }
}
