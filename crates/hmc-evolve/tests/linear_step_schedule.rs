use std::sync::Arc;

use hmc_core::{Action, Configuration, Hamiltonian, HubbardGaugeAction, RngHandle, TrajectoryRecord};
use hmc_evolve::{Evolver, LinearStepLeapfrog, Selector};

fn action() -> Arc<dyn Action> {
    Arc::new(HubbardGaugeAction::new(1.0).unwrap())
}

fn assert_params(evolver: &LinearStepLeapfrog, i: usize, step_length: f64, steps: usize) {
    let (got_length, got_steps) = evolver.parameters_at(i);
    assert!(
        (got_length - step_length).abs() < 1e-12,
        "step length at {i}: {got_length} != {step_length}"
    );
    assert_eq!(got_steps, steps, "steps at {i}");
}

#[test]
fn parameters_interpolate_linearly_then_hold() {
    let evolver = LinearStepLeapfrog::new(action(), (0.2, 0.05), (4, 20), 5).unwrap();
    assert_params(&evolver, 0, 0.2, 4);
    assert_params(&evolver, 1, 0.1625, 8);
    assert_params(&evolver, 2, 0.125, 12);
    assert_params(&evolver, 4, 0.05, 20);
    assert_params(&evolver, 10, 0.05, 20);
}

#[test]
fn steps_are_rounded_to_the_nearest_integer() {
    let evolver = LinearStepLeapfrog::new(action(), (0.1, 0.1), (1, 4), 3).unwrap();
    assert_params(&evolver, 0, 0.1, 1);
    assert_params(&evolver, 1, 0.1, 3);
    assert_params(&evolver, 2, 0.1, 4);

    let shrinking = LinearStepLeapfrog::new(action(), (0.1, 0.1), (3, 1), 5).unwrap();
    for i in 0..8 {
        assert!(shrinking.parameters_at(i).1 >= 1);
    }
    assert_params(&shrinking, 2, 0.1, 2);
}

#[test]
fn short_schedules_use_the_end_values() {
    for ninterp in [0, 1] {
        let evolver = LinearStepLeapfrog::new(action(), (0.3, 0.1), (2, 9), ninterp).unwrap();
        assert_params(&evolver, 0, 0.1, 9);
        assert_params(&evolver, 3, 0.1, 9);
    }
}

#[test]
fn evolve_follows_the_schedule_and_current_saturates() {
    let action = action();
    let mut evolver = LinearStepLeapfrog::new(Arc::clone(&action), (0.08, 0.02), (2, 10), 5)
        .unwrap()
        .with_selector(Selector::AcceptAll);
    let phi = Configuration::from_real(&[0.3, -0.2, 0.5, 0.1]);
    let value = Hamiltonian::new(action).eval_action(&phi).unwrap();
    let mut current = TrajectoryRecord::new(phi, value, 0);
    let mut rng = RngHandle::from_seed(17);

    let mut points = Vec::new();
    for _ in 0..8 {
        current = evolver.evolve(&current, &mut rng).unwrap();
        points.push(current.traj_point);
    }
    assert_eq!(points, vec![2, 4, 6, 8, 10, 10, 10, 10]);
    assert_eq!(evolver.current(), 5);
}
