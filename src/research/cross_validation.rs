use rand::prelude::*;
use colored::Colorize;
use log::info;

use std::iter::Iterator;

use crate::error::{Result, TreeError};
use crate::sample::{Sample, Value};
use crate::tree::{
    CpEntry,
    DecisionTree,
    Method,
    MissingPolicy,
    Prediction,
    SplitBy,
    TreeModel,
};

const WIDTH: usize = 9;

/// A struct that generates
/// pairs of training/test sample for cross validation,
/// and estimates the cross-validated error of a cp table.
///
/// # Example
/// ```no_run
/// use cartree::prelude::*;
/// use cartree::research::CrossValidation;
///
/// let sample = SampleReader::default()
///     .file("/path/to/titanic.csv")
///     .formula("survived ~ .")
///     .read()
///     .unwrap();
/// let tree = DecisionTreeBuilder::new()
///     .cp(0.001)
///     .build();
///
/// let table = CrossValidation::new(&sample)
///     .n_folds(10)
///     .seed(777)
///     .shuffle()
///     .cp_table(&tree)
///     .unwrap();
/// for entry in table {
///     println!("{entry}");
/// }
/// ```
pub struct CrossValidation<'a> {
    current_fold: usize,
    n_folds: usize,
    seed: u64,
    sample: &'a Sample,
    ix: Vec<usize>,
    verbose: bool,
}


impl<'a> CrossValidation<'a> {
    /// Construct a new instance of `CrossValidation.`
    #[inline]
    pub fn new(sample: &'a Sample) -> Self {
        let n_sample = sample.shape().0;
        let ix = (0..n_sample).collect::<Vec<_>>();
        Self {
            current_fold: 0,
            n_folds: 5,
            seed: 1234,
            verbose: false,
            sample,
            ix,
        }
    }


    /// Set the number of folds.
    /// Default value is `5.`
    #[inline]
    pub fn n_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }


    /// Set the seed of the randomness for shuffling.
    /// Default vaule is `1234.`
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }


    /// Set the verbose parameter.
    /// If `true`, `CrossValidation` prints some information
    /// when generating a train/test pair.
    /// Default vaule is `false.`
    #[inline]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }


    /// Shuffle the training sample.
    /// By default, `CrossValidation` does not shuffle the sample.
    #[inline]
    pub fn shuffle(mut self) -> Self {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.ix.shuffle(&mut rng);
        self
    }


    /// Returns the training/test sample for `i`th fold.
    /// Fold sizes differ by at most one.
    #[inline]
    fn fold_at(&self, i: usize) -> (Sample, Sample) {
        let n_sample = self.ix.len();
        let start = i * n_sample / self.n_folds;
        let end = (i + 1) * n_sample / self.n_folds;

        let train = self.ix[..start].iter()
            .chain(&self.ix[end..])
            .copied()
            .collect::<Vec<_>>();
        let test = &self.ix[start..end];
        (self.sample.subset(&train[..]), self.sample.subset(test))
    }


    fn print_fold(&self, fold: usize, train: &Sample, test: &Sample) {
        if !self.verbose { return; }
        println!(
            "{}    {}    {}",
            format!("  [{: >3}'th fold]", fold).bold().red(),
            format!("[TRAIN {:>WIDTH$}]", train.shape().0).bold().green(),
            format!("[TEST {:>WIDTH$}]", test.shape().0).bold().yellow(),
        );
    }


    /// Fit `tree` on the whole sample and fill the
    /// `xerror` and `xstd` columns of its cp table.
    ///
    /// Each fold is fitted with the same configuration and pruned at
    /// the geometric mean of consecutive `cp` values of the table;
    /// the held-out loss is the per-observation deviance
    /// (squared error, or the loss whose sum is the Gini / entropy
    /// deviance), relative to the deviance of the root.
    /// Held-out values that a fold cannot route
    /// follow the heavier child.
    pub fn cp_table(&self, tree: &DecisionTree) -> Result<Vec<CpEntry>> {
        let n_sample = self.ix.len();
        if self.n_folds < 2 || self.n_folds > n_sample {
            return Err(TreeError::config(format!(
                "the number of folds must be in [2, {n_sample}], got {}",
                self.n_folds,
            )));
        }

        let full = tree.fit(self.sample)?;
        let mut table = full.cp_table().to_vec();

        let cps = table.iter()
            .enumerate()
            .map(|(j, entry)| {
                if j == 0 {
                    f64::INFINITY
                } else {
                    (entry.cp * table[j - 1].cp).sqrt()
                }
            })
            .collect::<Vec<_>>();

        let mut config = *tree.config();
        config.missing = MissingPolicy::Majority;
        let fold_tree = DecisionTree::new(config);

        // `losses[j]` holds the held-out losses for the `j`-th entry.
        let mut losses = vec![Vec::with_capacity(n_sample); table.len()];
        for fold in 0..self.n_folds {
            let (train, test) = self.fold_at(fold);
            self.print_fold(fold + 1, &train, &test);

            let model = fold_tree.fit(&train)?;
            for (j, &cp) in cps.iter().enumerate() {
                let pruned = model.prune(cp)?;
                for row in 0..test.shape().0 {
                    let w = test.weights()[row];
                    if w <= 0f64 { continue; }
                    let prediction = pruned.predict_row(&test, row)?;
                    let y = test.target().value(row);
                    losses[j].push(w * loss(&pruned, &prediction, &y));
                }
            }
            info!("cross validation: fold {} of {} done", fold + 1, self.n_folds);
        }

        let root_deviance = full.root().deviance;
        let scale = if root_deviance > 0f64 { root_deviance } else { 1f64 };
        for (entry, errors) in table.iter_mut().zip(losses) {
            let n = errors.len().max(1) as f64;
            let total = errors.iter().sum::<f64>();
            let mean = total / n;
            let var = errors.iter()
                .map(|e| (e - mean).powi(2))
                .sum::<f64>();

            entry.xerror = Some(total / scale);
            entry.xstd = Some(var.sqrt() / scale);
        }

        Ok(table)
    }
}


/// Loss of one observation with response `y`,
/// before multiplying by its weight.
fn loss(model: &TreeModel, prediction: &Prediction, y: &Value) -> f64 {
    match (model.method(), prediction) {
        (Method::Regression, Prediction::Value(p)) => {
            let y = match y {
                Value::Numeric(v) => *v,
                _ => return 0f64,
            };
            (y - p).powi(2)
        },
        (_, Prediction::Class { probabilities, .. }) => {
            let label = match y {
                Value::Categorical(s) => s.clone(),
                Value::Numeric(v) => v.to_string(),
                Value::Missing => return 0f64,
            };
            let p_y = model.target().labels.iter()
                .position(|l| *l == label)
                .map(|k| probabilities[k])
                .unwrap_or(0f64);

            match model.split_by() {
                SplitBy::Gini => {
                    let sq = probabilities.iter()
                        .map(|p| p * p)
                        .sum::<f64>();
                    1f64 - 2f64 * p_y + sq
                },
                SplitBy::Entropy => -p_y.max(f64::EPSILON).ln(),
            }
        },
        _ => 0f64,
    }
}


impl<'a> Iterator for CrossValidation<'a> {
    type Item = (Sample, Sample);
    fn next(&mut self) -> Option<Self::Item> {
        if self.current_fold >= self.n_folds { return None; }

        let output = self.fold_at(self.current_fold);
        self.current_fold += 1;

        self.print_fold(self.current_fold, &output.0, &output.1);

        Some(output)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{Feature, Target};
    use crate::tree::DecisionTreeBuilder;

    fn sample() -> Sample {
        let x = Feature::numeric_from(
            "x", (0..40).map(|i| Some(i as f64)).collect(),
        );
        let y = Target::numeric(
            "y", (0..40).map(|i| if i < 20 { 1.0 } else { 3.0 }).collect(),
        );
        Sample::new(vec![x], y, None).unwrap()
    }

    #[test]
    fn test_folds_partition_the_sample() {
        let sample = sample();
        let cv = CrossValidation::new(&sample)
            .n_folds(3)
            .shuffle();
        let mut n_test = 0;
        for (train, test) in cv {
            assert_eq!(train.shape().0 + test.shape().0, 40);
            n_test += test.shape().0;
        }
        assert_eq!(n_test, 40);
    }

    #[test]
    fn test_cross_validated_table() {
        let sample = sample();
        let tree = DecisionTreeBuilder::new()
            .min_split(2.0)
            .min_bucket(1.0)
            .build();
        let table = CrossValidation::new(&sample)
            .n_folds(4)
            .seed(7)
            .shuffle()
            .cp_table(&tree)
            .unwrap();

        assert_eq!(table.len(), 2);
        // The root-only tree predicts the training mean of each fold.
        let root = table[0].xerror.unwrap();
        assert!(root > 0.9, "got {root}");
        // At most `x = 19` is misrouted, with loss `4 / 40`.
        let split = table[1].xerror.unwrap();
        assert!(split <= 0.1 + 1e-9, "got {split}");
        assert!(table.iter().all(|e| e.xstd.is_some()));
    }

    #[test]
    fn test_invalid_number_of_folds() {
        let sample = sample();
        let tree = DecisionTreeBuilder::new().build();
        let err = CrossValidation::new(&sample)
            .n_folds(1)
            .cp_table(&tree)
            .unwrap_err();
        assert!(matches!(err, TreeError::Configuration { .. }));
    }
}
