//! Model lifecycle against a stand-in simulator.
#![cfg(unix)]

mod common;

use std::{fs, time::Duration};

use common::Fixture;
use slimwrap::{
    sublaunch::{gather, sublaunch},
    Matrix, Model, ParameterSet, RunOptions, Template, Value, WrapError, WrapperConfig,
};

fn constants() -> ParameterSet {
    ParameterSet::new()
        .with("twoFloat", 2.0)
        .unwrap()
        .with("yes", true)
        .unwrap()
        .with("int_vector", vec![1, 2, 3])
        .unwrap()
        .with("matrix", Matrix::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap())
        .unwrap()
}

#[tokio::test]
async fn valid_model_passes_check() {
    let fx = Fixture::new();
    let model = Model::from_code("// ok\n", fx.config()).await.unwrap();
    assert_eq!(model.source().unwrap(), "// ok\n");
    assert!(model.script_path().exists());
}

#[tokio::test]
async fn invalid_model_is_rejected_with_stderr() {
    let fx = Fixture::new();
    let err = Model::from_code("INVALID", fx.config()).await.unwrap_err();
    match err {
        WrapError::InvalidModel { stderr, .. } => assert!(stderr.contains("syntax error")),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn model_from_source_file() {
    let fx = Fixture::new();
    let path = fx.bin.path().join("model.slim");
    fs::write(&path, "SEED").unwrap();
    let mut model = Model::from_source(&path, fx.config()).await.unwrap();
    let outcome = model.run(&RunOptions::default().with_seed(1000)).await.unwrap();
    assert_eq!(outcome.seed, 1000);
    assert_eq!(model.last_seed(), Some(1000));

    let missing = Model::from_source(&fx.bin.path().join("missing.slim"), fx.config()).await;
    assert!(matches!(missing, Err(WrapError::Io { .. })));
}

#[tokio::test]
async fn script_is_removed_with_the_model() {
    let fx = Fixture::new();
    let model = Model::from_code("ok", fx.config()).await.unwrap();
    let path = model.script_path().to_path_buf();
    drop(model);
    assert!(!path.exists());
}

#[tokio::test]
async fn constants_round_trip_through_the_simulator() {
    let fx = Fixture::new();
    let mut model = Model::from_code("ECHO", fx.config()).await.unwrap();
    let opts = RunOptions::default().with_seed(42).with_constants(constants());
    let outcome = model.run(&opts).await.unwrap();

    assert_eq!(outcome.output.code, Some(0));
    assert!(outcome.output.stdout.contains("ran with seed 42"));
    assert_eq!(outcome.results, Some(constants()));
    assert!(outcome.input_path.is_none());
    assert!(fx.leftovers().is_empty(), "{:?}", fx.leftovers());
}

#[tokio::test]
async fn constants_reach_the_simulator_as_dictionary_and_definitions() {
    let fx = Fixture::new();
    let mut model = Model::from_code("ARGV", fx.config()).await.unwrap();
    let outcome = model
        .run(&RunOptions::default().with_constants(constants()))
        .await
        .unwrap();
    let argv = &outcome.output.stdout;
    assert!(
        argv.contains(
            "SLIM_WRAP_PARAMS=Dictionary('int_vector', asInteger(c(1,2,3)), \
             'matrix', matrix(asInteger(c(1,2,3,4)), nrow=2, ncol=2, byrow=T), \
             'twoFloat', asFloat(c(2.0)), 'yes', asLogical(c(T)))"
        ),
        "{argv}"
    );
    assert!(argv.contains("twoFloat=asFloat(c(2.0))"), "{argv}");

    let bare = model.run(&RunOptions::default()).await.unwrap();
    assert!(!bare.output.stdout.contains("SLIM_WRAP_PARAMS"));
}

#[tokio::test]
async fn silent_simulation_has_no_results() {
    let fx = Fixture::new();
    let mut model = Model::from_code("quiet", fx.config()).await.unwrap();
    let outcome = model.run(&RunOptions::default()).await.unwrap();
    assert!(outcome.results.is_none());
    let seed = model.last_seed().unwrap();
    assert!((1..1u64 << 32).contains(&seed));
}

#[tokio::test]
async fn failure_is_reported_unless_unchecked() {
    let fx = Fixture::new();
    let mut model = Model::from_code("FAIL", fx.config()).await.unwrap();

    let err = model.run(&RunOptions::default()).await.unwrap_err();
    match &err {
        WrapError::ProcessFailed { code, stderr, .. } => {
            assert_eq!(*code, Some(2));
            assert_eq!(stderr, "boom");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(fx.leftovers().is_empty());

    let opts = RunOptions {
        check: false,
        ..Default::default()
    };
    let outcome = model.run(&opts).await.unwrap();
    assert_eq!(outcome.output.code, Some(2));
}

#[tokio::test]
async fn timeout_cleans_up() {
    let fx = Fixture::new();
    let config = WrapperConfig {
        timeout: Some(Duration::from_millis(300)),
        ..fx.config()
    };
    let mut model = Model::from_code("SLEEP", config).await.unwrap();
    let err = model.run(&RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, WrapError::ProcessTimeout { .. }));
    assert!(fx.leftovers().is_empty());
}

#[tokio::test]
async fn kept_files_survive_for_debugging() {
    let fx = Fixture::new();
    let config = WrapperConfig {
        keep_temp_files: true,
        ..fx.config()
    };
    let mut model = Model::from_code("ECHO", config).await.unwrap();
    let opts = RunOptions::default().with_constants(constants());
    let outcome = model.run(&opts).await.unwrap();

    let input = outcome.input_path.expect("input kept");
    let output = outcome.output_path.expect("output kept");
    assert_eq!(fs::read_to_string(&input).unwrap(), fs::read_to_string(&output).unwrap());
    assert_eq!(fx.leftovers().len(), 2);
}

#[tokio::test]
async fn kept_files_survive_a_failed_run() {
    let fx = Fixture::new();
    let config = WrapperConfig {
        keep_temp_files: true,
        ..fx.config()
    };
    let mut model = Model::from_code("FAIL", config).await.unwrap();
    let opts = RunOptions::default().with_constants(constants());
    let err = model.run(&opts).await.unwrap_err();
    assert!(matches!(err, WrapError::ProcessFailed { .. }));

    let kept = fx.leftovers();
    assert_eq!(kept.len(), 2, "{kept:?}");
    let input = kept
        .iter()
        .find(|p| p.to_string_lossy().contains("slimwrap-params-"))
        .expect("parameter file kept");
    assert_eq!(slimwrap::codec::decode(input).unwrap(), constants());
}

#[tokio::test]
async fn extra_templates_see_the_input_path() {
    let fx = Fixture::new();
    let copy = fx.scratch.path().join("copy.txt");
    let template = Template::new(format!("SLIMWRAP_COPY='{}'; x='{{{{input}}}}'", copy.display()))
        .unwrap();
    let mut model = Model::from_code("COPY", fx.config()).await.unwrap();
    let opts = RunOptions {
        templates: vec![template],
        constants: constants(),
        ..Default::default()
    };
    model.run(&opts).await.unwrap();
    assert_eq!(slimwrap::codec::decode(&copy).unwrap(), constants());
}

#[tokio::test]
async fn replicates_use_consecutive_seeds() {
    let fx = Fixture::new();
    let mut model = Model::from_code("SEED", fx.config()).await.unwrap();
    let outcomes = sublaunch(&mut model, &RunOptions::default().with_seed(7), 3)
        .await
        .unwrap();

    let seeds: Vec<u64> = outcomes.iter().map(|o| o.seed).collect();
    assert_eq!(seeds, [7, 8, 9]);
    assert_eq!(
        gather(&outcomes, "seed"),
        [&Value::Integer(7), &Value::Integer(8), &Value::Integer(9)]
    );
    assert!(gather(&outcomes, "missing").is_empty());
}

#[tokio::test]
async fn replicates_stop_at_first_error() {
    let fx = Fixture::new();
    let mut model = Model::from_code("FAIL", fx.config()).await.unwrap();
    let err = sublaunch(&mut model, &RunOptions::default(), 5).await.unwrap_err();
    assert!(matches!(err, WrapError::ProcessFailed { .. }));
}
