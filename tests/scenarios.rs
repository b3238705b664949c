use cartree::prelude::*;
use rand::prelude::*;

use std::collections::HashMap;


const TEST_TOLERANCE: f64 = 1e-9;


fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}


fn sex_sample() -> Sample {
    let schema = Schema::new().categorical("sex");
    let rows = [("M", 0), ("M", 0), ("F", 1), ("F", 1)]
        .into_iter()
        .map(|(sex, survived)| {
            Observation::new()
                .with("sex", sex)
                .target(survived)
        })
        .collect::<Vec<_>>();
    Sample::from_observations(&schema, "survived", &rows[..]).unwrap()
}


fn small_tree(max_depth: i32) -> DecisionTree {
    DecisionTreeBuilder::new()
        .max_depth(max_depth)
        .min_split(1.0)
        .min_bucket(1.0)
        .cp(0.0)
        .build()
}


/// A noisy step function of a numeric and a categorical predictor,
/// with random case weights.
fn random_sample(seed: u64, n_sample: usize) -> Sample {
    let mut rng = StdRng::seed_from_u64(seed);
    let levels = ["a", "b", "c", "d"];

    let mut x1 = Vec::with_capacity(n_sample);
    let mut x2 = Vec::with_capacity(n_sample);
    let mut y = Vec::with_capacity(n_sample);
    let mut w = Vec::with_capacity(n_sample);
    for _ in 0..n_sample {
        let a: f64 = rng.gen_range(0.0..10.0);
        let k = rng.gen_range(0..levels.len());
        let step = if a < 4.0 { 1.0 } else { 5.0 };
        let shift = if k % 2 == 0 { 0.0 } else { 2.0 };
        let noise: f64 = rng.gen_range(-0.5..0.5);

        x1.push(Some(a));
        x2.push(Some(levels[k]));
        y.push(step + shift + noise);
        w.push(rng.gen_range(0.5..2.0));
    }

    let x1 = Feature::numeric_from("x1", x1);
    let x2 = Feature::categorical_from("x2", &x2[..]);
    let y = Target::numeric("y", y);
    Sample::new(vec![x1, x2], y, Some(w)).unwrap()
}


#[test]
fn sex_scenario() {
    init_logger();
    let sample = sex_sample();
    let model = small_tree(1).fit(&sample).unwrap();

    assert_eq!(model.method(), Method::Regression);
    assert_eq!(model.n_nodes(), 3);
    let branch = model.root().branch.as_ref().unwrap();
    assert_eq!(branch.rule.feature(), "sex");

    // The left leaf holds `M` and predicts 0, the right one `F` and 1.
    let views = model.preorder();
    assert_eq!(views[1].condition, "sex = M");
    assert_eq!(views[1].node.prediction, Prediction::Value(0.0));
    assert_eq!(views[2].condition, "sex = F");
    assert_eq!(views[2].node.prediction, Prediction::Value(1.0));

    let male = Observation::new().with("sex", "M");
    let female = Observation::new().with("sex", "F");
    assert_eq!(model.predict(&male).unwrap(), Prediction::Value(0.0));
    assert_eq!(model.predict(&female).unwrap(), Prediction::Value(1.0));
    assert_eq!(model.training_deviance(), 0.0);
}


#[test]
fn default_stopping_keeps_tiny_sample_a_leaf() {
    let sample = sex_sample();
    let model = DecisionTreeBuilder::new()
        .max_depth(1)
        .build()
        .fit(&sample)
        .unwrap();

    // Total weight 4 is below the default `min_split` of 20.
    assert_eq!(model.n_nodes(), 1);
    assert_eq!(model.root().prediction, Prediction::Value(0.5));
}


#[test]
fn large_response_offset_is_split() {
    let offset = 1e9;
    let x = Feature::numeric_from("x", (0..4).map(|i| Some(i as f64)).collect());
    let y = Target::numeric("y", vec![offset, offset, offset + 1.0, offset + 1.0]);
    let sample = Sample::new(vec![x], y, None).unwrap();

    let model = small_tree(3).fit(&sample).unwrap();
    let got = model.root().deviance;
    assert!((got - 1.0).abs() < TEST_TOLERANCE, "expected 1, got {got}.");
    assert_eq!(model.n_nodes(), 3);
    assert!(model.training_deviance().abs() < TEST_TOLERANCE);

    let low = Observation::new().with("x", 0.0);
    let high = Observation::new().with("x", 3.0);
    assert_eq!(model.predict(&low).unwrap(), Prediction::Value(offset));
    assert_eq!(model.predict(&high).unwrap(), Prediction::Value(offset + 1.0));
}


#[test]
fn sex_scenario_as_classification() {
    let sample = sex_sample();
    let model = DecisionTreeBuilder::new()
        .max_depth(1)
        .min_split(1.0)
        .min_bucket(1.0)
        .method(Method::Classification)
        .build()
        .fit(&sample)
        .unwrap();

    let male = Observation::new().with("sex", "M");
    let female = Observation::new().with("sex", "F");
    assert_eq!(model.predict(&male).unwrap().label(), Some("0"));
    assert_eq!(model.predict(&female).unwrap().label(), Some("1"));

    let errors = model.predict_all(&sample).unwrap()
        .into_iter()
        .enumerate()
        .filter(|(row, p)| {
            let y = sample.target().value(*row).to_string();
            p.label() != Some(y.as_str())
        })
        .count();
    assert_eq!(errors, 0);
}


#[test]
fn constant_target_is_a_single_leaf() {
    let x = Feature::numeric_from("x", (0..10).map(|i| Some(i as f64)).collect());
    let y = Target::numeric("y", vec![3.0; 10]);
    let sample = Sample::new(vec![x], y, None).unwrap();

    let model = small_tree(5).fit(&sample).unwrap();
    assert_eq!(model.n_nodes(), 1);
    assert!(model.root().is_leaf());
    assert_eq!(model.root().prediction, Prediction::Value(3.0));
}


#[test]
fn negative_depth_is_rejected() {
    let err = small_tree(-1).fit(&sex_sample()).unwrap_err();
    assert!(
        matches!(err, TreeError::Configuration { .. }),
        "expected a configuration error, got {err:?}"
    );
}


#[test]
fn training_rows_reach_their_leaves() {
    init_logger();
    let sample = random_sample(11, 200);
    let model = small_tree(6).fit(&sample).unwrap();

    let mut counts: HashMap<NodeId, usize> = HashMap::new();
    let mut sums: HashMap<NodeId, (f64, f64)> = HashMap::new();
    for row in 0..sample.shape().0 {
        let obs = sample.observation(row);
        let leaf = model.leaf_of(&obs).unwrap();
        let prediction = model.predict(&obs).unwrap();
        assert_eq!(model.node(leaf).unwrap().prediction, prediction);

        *counts.entry(leaf).or_insert(0) += 1;
        let Value::Numeric(y) = obs.target_value().unwrap() else {
            panic!("expected a numeric target");
        };
        let entry = sums.entry(leaf).or_insert((0.0, 0.0));
        entry.0 += obs.weight() * y;
        entry.1 += obs.weight();
    }

    for (leaf, (sum, weight)) in sums {
        let node = model.node(leaf).unwrap();
        assert!(node.is_leaf());
        assert_eq!(node.n_obs, counts[&leaf]);

        let mean = sum / weight;
        let got = node.prediction.as_f64();
        assert!(
            (mean - got).abs() < TEST_TOLERANCE,
            "expected {mean}, got {got}."
        );
    }
}


#[test]
fn deeper_trees_fit_no_worse() {
    let sample = random_sample(5, 150);
    let deviances = (0..7)
        .map(|depth| small_tree(depth).fit(&sample).unwrap().training_deviance())
        .collect::<Vec<_>>();

    for pair in deviances.windows(2) {
        assert!(
            pair[1] <= pair[0] + TEST_TOLERANCE,
            "deviance increased with depth: {deviances:?}"
        );
    }
    assert!(deviances[6] < deviances[0]);
}


#[test]
fn pruning_properties() {
    let sample = random_sample(3, 200);
    let model = small_tree(8).fit(&sample).unwrap();
    assert!(model.n_nodes() > 1);

    // Every split of a `cp = 0` tree lowers the deviance.
    let kept = model.prune(0.0).unwrap();
    assert_eq!(kept.n_nodes(), model.n_nodes());

    let root = model.prune(f64::INFINITY).unwrap();
    assert_eq!(root.n_nodes(), 1);
    assert_eq!(root.root().prediction, model.root().prediction);

    for cp in [0.001, 0.01, 0.05, 0.2] {
        let once = model.prune(cp).unwrap();
        let twice = once.prune(cp).unwrap();
        assert_eq!(once.nodes(), twice.nodes(), "re-pruning at {cp} changed the tree");
        assert!(once.n_nodes() <= model.n_nodes());
    }

    // The input tree is left alone.
    assert_eq!(kept.nodes(), model.nodes());
}


#[test]
fn cp_table_is_monotone() {
    let sample = random_sample(17, 200);
    let model = small_tree(8).fit(&sample).unwrap();
    let table = model.cp_table();

    assert_eq!(table[0].n_split, 0);
    assert!((table[0].rel_error - 1.0).abs() < TEST_TOLERANCE);
    assert_eq!(table.last().unwrap().n_split, model.n_leaves() - 1);

    for pair in table.windows(2) {
        assert!(pair[0].cp >= pair[1].cp, "cp increased: {pair:?}");
        assert!(pair[0].n_split < pair[1].n_split);
        assert!(pair[0].rel_error + TEST_TOLERANCE >= pair[1].rel_error);
    }

    // Pruning at (just above) a row's cp gives that row's tree.
    for entry in table.iter() {
        let pruned = model.prune(entry.cp * (1.0 + 1e-9)).unwrap();
        assert_eq!(pruned.n_leaves() - 1, entry.n_split, "at cp {}", entry.cp);
    }
}


#[test]
fn missing_value_policies() {
    let sample = sex_sample();

    let model = small_tree(1).fit(&sample).unwrap();
    let empty = Observation::new();
    let err = model.predict(&empty).unwrap_err();
    assert!(matches!(err, TreeError::MissingFeature { .. }));

    let unknown = Observation::new().with("sex", "X");
    let err = model.predict(&unknown).unwrap_err();
    assert!(matches!(err, TreeError::UnknownCategory { .. }));

    let model = DecisionTreeBuilder::new()
        .max_depth(1)
        .min_split(1.0)
        .min_bucket(1.0)
        .missing(MissingPolicy::Majority)
        .build()
        .fit(&sample)
        .unwrap();
    let missing = Observation::new().with("sex", Value::Missing);
    // Both children weigh 2; ties go left, to level `M`.
    assert_eq!(model.predict(&missing).unwrap(), Prediction::Value(0.0));
}


#[test]
fn model_survives_a_file_round_trip() {
    let sample = random_sample(23, 100);
    let model = small_tree(4).fit(&sample).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    model.save(&path).unwrap();
    let loaded = TreeModel::load(&path).unwrap();

    assert_eq!(model, loaded);
    for row in 0..sample.shape().0 {
        assert_eq!(
            model.predict_row(&sample, row).unwrap(),
            loaded.predict_row(&sample, row).unwrap(),
        );
    }
}


#[test]
fn large_samples_grow_in_parallel_consistently() {
    let sample = random_sample(29, 5_000);
    let tree = DecisionTreeBuilder::new()
        .max_depth(5)
        .cp(0.001)
        .build();
    let first = tree.fit(&sample).unwrap();
    let second = tree.fit(&sample).unwrap();
    assert_eq!(first, second);
}
