use std::path::Path;
use std::sync::Arc;

use hmc_core::errors::HmcError;
use hmc_core::{Action, Configuration, HubbardGaugeAction, Lattice, Store};
use hmc_evolve::config::RunConfig;
use hmc_evolve::{latest_checkpoint, read_trajectory, resume, run};
use tempfile::tempdir;

fn config(path: &Path, trajectories: usize) -> RunConfig {
    let yaml = format!(
        r#"
trajectories: {trajectories}
seed_policy:
  master_seed: 7
evolver:
  type: const-step-leapfrog
  step_length: 0.1
  steps: 10
checkpoint:
  interval: 4
  trajectory_interval: 2
progress_interval: 5
output:
  store_path: {}
"#,
        path.display()
    );
    RunConfig::from_yaml_str(&yaml).unwrap()
}

fn collaborators() -> (Arc<dyn Action>, Arc<Lattice>) {
    (
        Arc::new(HubbardGaugeAction::new(1.0).unwrap()),
        Arc::new(Lattice::ring(1, 4, 1.0).unwrap()),
    )
}

fn initial() -> Configuration {
    Configuration::from_real(&[0.3, -0.2, 0.5, 0.1])
}

#[test]
fn run_writes_trajectories_and_checkpoints() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.json");
    let (action, lattice) = collaborators();
    let summary = run(&config(&path, 10), &initial(), action, lattice).unwrap();
    assert_eq!(summary.trajectories, 10);

    let store = Store::load(&path).unwrap();
    for itr in [0, 2, 4, 6, 8, 9] {
        assert!(store.group_exists(&format!("configuration/{itr}")));
    }
    assert!(!store.group_exists("configuration/1"));
    for itr in [0, 4, 8, 9] {
        assert!(store.group_exists(&format!("checkpoint/{itr}")));
    }
    assert_eq!(latest_checkpoint(&store, "checkpoint"), Some(9));
    assert_eq!(read_trajectory(&store, "checkpoint/9/cfg").unwrap(), summary.record);
}

#[test]
fn run_refuses_existing_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.json");
    Store::new().save(&path).unwrap();
    let (action, lattice) = collaborators();
    let err = run(&config(&path, 4), &initial(), action, lattice).unwrap_err();
    assert!(matches!(err, HmcError::StoreCollision(_)));
}

#[test]
fn extending_a_run_matches_a_single_long_run() {
    let dir = tempdir().unwrap();
    let (action, lattice) = collaborators();

    let long_path = dir.path().join("long.json");
    let long = run(
        &config(&long_path, 16),
        &initial(),
        Arc::clone(&action),
        Arc::clone(&lattice),
    )
    .unwrap();

    let split_path = dir.path().join("split.json");
    let head = run(
        &config(&split_path, 10),
        &initial(),
        Arc::clone(&action),
        Arc::clone(&lattice),
    )
    .unwrap();
    let tail = resume(&config(&split_path, 16), action, lattice).unwrap();

    assert_eq!(tail.trajectories, 6);
    let mut points = head.traj_points.clone();
    points.extend(&tail.traj_points);
    assert_eq!(points, long.traj_points);
    assert_eq!(tail.record, long.record);
    assert_eq!(tail.final_configuration_hash, long.final_configuration_hash);
}

#[test]
fn resuming_a_complete_run_is_a_no_op() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.json");
    let (action, lattice) = collaborators();
    let done = run(
        &config(&path, 6),
        &initial(),
        Arc::clone(&action),
        Arc::clone(&lattice),
    )
    .unwrap();

    let again = resume(&config(&path, 6), action, lattice).unwrap();
    assert_eq!(again.trajectories, 0);
    assert_eq!(again.record, done.record);
}

#[test]
fn resume_without_store_fails() {
    let dir = tempdir().unwrap();
    let (action, lattice) = collaborators();
    let err = resume(&config(&dir.path().join("absent.json"), 4), action, lattice).unwrap_err();
    assert_eq!(err.info().code, "store-read");
}

#[test]
fn resume_requires_checkpoints() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.json");
    let (action, lattice) = collaborators();
    run(
        &config(&path, 6),
        &initial(),
        Arc::clone(&action),
        Arc::clone(&lattice),
    )
    .unwrap();

    let mut extend = config(&path, 12);
    extend.checkpoint.interval = 0;
    let err = resume(&extend, action, lattice).unwrap_err();
    assert!(matches!(err, HmcError::Config(_)));
    assert_eq!(err.info().context["field"], "checkpoint.interval");

    let store = Store::load(&path).unwrap();
    assert_eq!(latest_checkpoint(&store, "configuration"), Some(5));
}
