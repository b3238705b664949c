use cartree::prelude::*;


const TEST_TOLERANCE: f64 = 1e-9;
const FILE: &str = "tests/dataset/titanic.csv";


fn titanic() -> Sample {
    SampleReader::default()
        .file(FILE)
        .has_header(true)
        .formula("survived ~ .")
        .weight_feature("n")
        .read()
        .unwrap()
}


fn passenger(class: &str, sex: &str, age: &str) -> Observation {
    Observation::new()
        .with("class", class)
        .with("sex", sex)
        .with("age", age)
}


#[test]
fn read_titanic() {
    let sample = titanic();
    assert_eq!(sample.shape(), (32, 3));
    assert_eq!(sample.total_weight(), 2201.0);

    let names = sample.features()
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["class", "sex", "age"]);
    assert_eq!(sample["class"].levels(), ["1st", "2nd", "3rd", "crew"]);
    assert!(sample.target().is_class());
}


#[test]
fn titanic_default_tree() {
    let _ = env_logger::builder().is_test(true).try_init();
    let sample = titanic();
    let model = DecisionTreeBuilder::new()
        .build()
        .fit(&sample)
        .unwrap();

    assert_eq!(model.method(), Method::Classification);
    // Rows with zero passengers never reach the tree.
    assert_eq!(model.root().n_obs, 24);
    assert_eq!(model.root().weight, 2201.0);

    let conditions = model.preorder()
        .into_iter()
        .map(|view| view.condition)
        .collect::<Vec<_>>();
    assert_eq!(
        conditions,
        vec![
            "root",
            "sex = male",
            "sex = female",
            "class = 3rd",
            "class = 1st, 2nd, crew",
        ]
    );

    let cases = [
        (passenger("1st", "female", "adult"), "yes"),
        (passenger("3rd", "female", "child"), "no"),
        (passenger("crew", "male", "adult"), "no"),
        (passenger("2nd", "male", "child"), "no"),
    ];
    for (obs, expected) in cases {
        let got = model.predict(&obs).unwrap();
        assert_eq!(got.label(), Some(expected), "{obs:?}");
    }

    let Prediction::Class { probabilities, .. } = &model.root().prediction else {
        panic!("expected class proportions at the root");
    };
    let expected = 711.0 / 2201.0;
    assert!(
        (probabilities[1] - expected).abs() < TEST_TOLERANCE,
        "expected {expected}, got {}.", probabilities[1],
    );
}


#[test]
fn titanic_full_tree_pruned_back() {
    let sample = titanic();
    let full = DecisionTreeBuilder::new()
        .min_split(1.0)
        .min_bucket(1.0)
        .cp(0.0)
        .build()
        .fit(&sample)
        .unwrap();
    let default = DecisionTreeBuilder::new()
        .build()
        .fit(&sample)
        .unwrap();

    assert!(full.n_nodes() > default.n_nodes());

    let conditions = |m: &TreeModel| {
        m.preorder()
            .into_iter()
            .map(|view| view.condition)
            .collect::<Vec<_>>()
    };

    // Pruning is not the stopping rule: a weak split may survive
    // under a strong one.
    let pruned = full.prune(0.01).unwrap();
    assert_eq!(
        conditions(&pruned),
        vec![
            "root",
            "sex = male",
            "age = adult",
            "age = child",
            "class = 3rd",
            "class = 1st, 2nd",
            "sex = female",
            "class = 3rd",
            "class = 1st, 2nd, crew",
        ]
    );

    let pruned = full.prune(0.02).unwrap();
    assert_eq!(conditions(&pruned), conditions(&default));

    let importance = pruned.feature_importance();
    assert_eq!(importance[2].0, "age");
    assert_eq!(importance[2].1, 0.0);
    let total = importance.iter().map(|(_, v)| v).sum::<f64>();
    assert!((total - 1.0).abs() < TEST_TOLERANCE);
}


#[test]
fn titanic_aggregate_keeps_weights() {
    let sample = titanic();
    let doubled = {
        let rows = (0..sample.shape().0)
            .chain(0..sample.shape().0)
            .collect::<Vec<_>>();
        sample.subset(&rows[..])
    };
    assert_eq!(doubled.shape().0, 64);

    let grouped = doubled.aggregate();
    assert_eq!(grouped.shape().0, 32);
    assert_eq!(grouped.total_weight(), 2.0 * 2201.0);
}


#[test]
fn titanic_cross_validation() {
    let sample = titanic();
    let tree = DecisionTreeBuilder::new()
        .min_split(1.0)
        .min_bucket(1.0)
        .cp(0.001)
        .build();
    let table = CrossValidation::new(&sample)
        .n_folds(4)
        .shuffle()
        .cp_table(&tree)
        .unwrap();

    assert_eq!(table[0].n_split, 0);
    for entry in table.iter() {
        let xerror = entry.xerror.unwrap();
        let xstd = entry.xstd.unwrap();
        assert!(xerror.is_finite() && xerror >= 0.0);
        assert!(xstd.is_finite() && xstd >= 0.0);
    }
}


#[test]
fn titanic_outputs() {
    let sample = titanic();
    let model = DecisionTreeBuilder::new()
        .build()
        .fit(&sample)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let dot = dir.path().join("titanic.dot");
    model.to_dot_file(&dot).unwrap();
    let text = std::fs::read_to_string(&dot).unwrap();
    assert_eq!(text, model.to_dot());
    assert!(text.contains("sex = female"));

    let svg = dir.path().join("titanic.svg");
    model.render_svg(&svg, (800, 480)).unwrap();
    assert!(svg.exists());

    let summary = model.to_string();
    assert_eq!(summary.lines().filter(|l| l.ends_with('*')).count(), 3);
    model.print_cp_table();
}
