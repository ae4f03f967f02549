use std::sync::Arc;

use hmc_core::errors::HmcError;
use hmc_core::{HubbardGaugeAction, Lattice};
use hmc_evolve::config::{EvolverConfig, RunConfig, TransformConfig};
use hmc_evolve::{Direction, LoadContext, Selector};

const ALTERNATING: &str = r#"
trajectories: 40
seed_policy:
  master_seed: 99
  chain: 3
evolver:
  type: alternator
  schedule:
    - repeats: 4
      evolver:
        type: const-step-leapfrog
        step_length: 0.05
        steps: 20
        direction: backward
        transform:
          type: affine
          scale: 1.0
          shift: [0.0, 0.25]
    - evolver:
        type: uniform-jump
        n_sites: 2
        max_winding: 1
        selector: accept-all
checkpoint:
  interval: 10
  trajectory_interval: 5
output:
  store_path: out/run.json
"#;

fn context() -> LoadContext {
    LoadContext::new(
        Arc::new(HubbardGaugeAction::new(1.0).unwrap()),
        Arc::new(Lattice::ring(2, 2, 1.0).unwrap()),
    )
}

#[test]
fn parses_nested_evolvers_with_defaults() {
    let config = RunConfig::from_yaml_str(ALTERNATING).unwrap();
    assert_eq!(config.trajectories, 40);
    assert_eq!(config.checks.reality_interval, 20);
    assert_eq!(config.checks.finite_interval, 1);
    assert_eq!(config.output.trajectory_group, "configuration");
    assert_eq!(config.output.checkpoint_group, "checkpoint");

    let EvolverConfig::Alternator { schedule } = &config.evolver else {
        panic!("expected an alternator");
    };
    assert_eq!(schedule.len(), 2);
    assert_eq!(schedule[0].repeats, 4);
    assert_eq!(schedule[1].repeats, 1);
    match &schedule[0].evolver {
        EvolverConfig::ConstStepLeapfrog {
            direction,
            selector,
            transform,
            ..
        } => {
            assert_eq!(*direction, Direction::Backward);
            assert_eq!(*selector, Selector::Metropolis);
            assert!(matches!(transform, Some(TransformConfig::Affine { .. })));
        }
        other => panic!("unexpected evolver {other:?}"),
    }

    let evolver = config.evolver.build(&context()).unwrap();
    assert_eq!(evolver.type_name(), "Alternator");
}

#[test]
fn chain_seed_depends_on_chain_index() {
    let mut config = RunConfig::from_yaml_str(ALTERNATING).unwrap();
    let first = config.chain_seed();
    config.seed_policy.chain = 4;
    assert_ne!(first, config.chain_seed());
}

#[test]
fn checkpoints_must_land_on_written_trajectories() {
    let yaml = ALTERNATING.replace("interval: 10", "interval: 12");
    let err = RunConfig::from_yaml_str(&yaml).unwrap_err();
    assert!(matches!(err, HmcError::Config(_)));
    assert_eq!(err.info().context["field"], "checkpoint.interval");
}

#[test]
fn checkpoints_need_a_store() {
    let yaml = ALTERNATING.replace("  store_path: out/run.json\n", "  trajectory_group: cfg\n");
    let err = RunConfig::from_yaml_str(&yaml).unwrap_err();
    assert_eq!(err.info().context["field"], "output.store_path");
}

#[test]
fn unknown_evolver_types_fail_to_parse() {
    let yaml = "trajectories: 1\nevolver:\n  type: worm\n";
    let err = RunConfig::from_yaml_str(yaml).unwrap_err();
    assert_eq!(err.info().code, "config-parse");
}

#[test]
fn invalid_parameters_fail_at_build_time() {
    let yaml = "trajectories: 1\nevolver:\n  type: two-pi-jumps\n  n_jumps: 9\n";
    let config = RunConfig::from_yaml_str(yaml).unwrap();
    let err = config.evolver.build(&context()).unwrap_err();
    assert_eq!(err.info().code, "invalid-jump-count");
}

#[test]
fn load_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.yaml");
    std::fs::write(&path, ALTERNATING).unwrap();
    let config = RunConfig::load(&path).unwrap();
    assert_eq!(config.seed_policy.master_seed, 99);

    let err = RunConfig::load(&dir.path().join("missing.yaml")).unwrap_err();
    assert_eq!(err.info().code, "config-read");
}
