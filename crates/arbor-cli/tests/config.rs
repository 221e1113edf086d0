use std::fs;

use arbor_bt::BtStatus;
use arbor_cli::{describe, load_template, run, RunnerConfig, DEFAULT_CONFIG_FILE};
use arbor_tools::tags;

const TREE: &str = r#"
name: Sentry
blackboard:
  - key: seen
    value: { int: 0 }
children:
  - type: sequence
    name: Watch
    children:
      - { type: action, name: Look, action: wait, params: { seconds: 0.3 } }
      - { type: action, name: Mark, action: set_property, params: { value: { int: 1 } }, bind: { target: seen } }
"#;

#[test]
fn missing_fields_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runner.yaml");
    fs::write(&path, "max_ticks: 7\nseed: 99\n").unwrap();

    let config = RunnerConfig::load(&path).unwrap();
    assert_eq!(config.max_ticks, 7);
    assert_eq!(config.seed, 99);
    assert_eq!(config.dt_seconds, 0.1);
    assert!(config.stop_on_completion);
    assert_eq!(config.fixed_every_ticks, 0);
}

#[test]
fn config_beside_the_tree_is_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("sentry.yaml");
    fs::write(&tree, TREE).unwrap();

    assert_eq!(
        RunnerConfig::load_for_tree(&tree, None).unwrap(),
        RunnerConfig::default()
    );

    fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "dt_seconds: 0.5\n").unwrap();
    assert_eq!(RunnerConfig::load_for_tree(&tree, None).unwrap().dt_seconds, 0.5);

    let explicit = dir.path().join("other.yaml");
    fs::write(&explicit, "max_ticks: 3\n").unwrap();
    let config = RunnerConfig::load_for_tree(&tree, Some(&explicit)).unwrap();
    assert_eq!(config.max_ticks, 3);
    assert_eq!(config.dt_seconds, 0.1);
}

#[test]
fn malformed_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "max_ticks: lots\n").unwrap();
    let err = RunnerConfig::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse config"));
}

#[test]
fn run_ticks_a_loaded_tree_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("sentry.yaml");
    fs::write(&tree, TREE).unwrap();

    let template = load_template(&tree).unwrap();
    let config = RunnerConfig {
        dt_seconds: 0.25,
        ..RunnerConfig::default()
    };
    let summary = run(&template, &config, true).unwrap();

    // Look finishes on tick 2, Mark runs on tick 3.
    assert_eq!(summary.status, BtStatus::Success);
    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.blackboard.get_by_name::<i64>("seen").unwrap(), 1);
    assert_eq!(summary.trace.with_tag(tags::TREE_RESULT).count(), 3);
}

#[test]
fn run_respects_the_tick_limit() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("sentry.json");
    fs::write(
        &tree,
        r#"{ "children": [ { "type": "action", "action": "wait", "params": { "seconds": 60.0 } } ] }"#,
    )
    .unwrap();

    let template = load_template(&tree).unwrap();
    let config = RunnerConfig {
        max_ticks: 4,
        ..RunnerConfig::default()
    };
    let summary = run(&template, &config, false).unwrap();
    assert_eq!(summary.status, BtStatus::Running);
    assert_eq!(summary.ticks, 4);
    assert!(summary.trace.events.is_empty());
}

#[test]
fn describe_lists_nodes_depth_first() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("sentry.yaml");
    fs::write(&tree, TREE).unwrap();

    let runtime = load_template(&tree).unwrap().instantiate().unwrap();
    assert_eq!(
        describe(&runtime),
        vec![
            "Sentry [Root] stack=0",
            "  Watch [Sequence] stack=0",
            "    Look [Wait] stack=0",
            "    Mark [SetProperty] stack=0",
        ]
    );
}

#[test]
fn invalid_trees_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("bad.yaml");
    fs::write(&tree, "children: [ { type: inverter } ]\n").unwrap();

    let err = load_template(&tree).unwrap_err();
    assert!(format!("{err:#}").contains("bad.yaml"));
}
