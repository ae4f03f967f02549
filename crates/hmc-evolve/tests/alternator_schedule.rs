use std::sync::Arc;

use hmc_core::errors::HmcError;
use hmc_core::{
    Complex64, Configuration, Group, HubbardGaugeAction, Lattice, RngHandle, TrajectoryRecord,
};
use hmc_evolve::{Alternator, Evolver, EvolverManager, LoadContext};

/// Evolver tagging every record with a fixed label.
#[derive(Debug)]
struct Marker {
    label: i64,
}

impl Marker {
    fn boxed(label: i64) -> Box<dyn Evolver> {
        Box::new(Self { label })
    }

    fn from_store(
        group: &Group,
        _manager: &EvolverManager,
        _ctx: &LoadContext,
    ) -> Result<Box<dyn Evolver>, HmcError> {
        Ok(Self::boxed(group.read("label")?))
    }
}

impl Evolver for Marker {
    fn type_name(&self) -> &'static str {
        "Marker"
    }

    fn evolve(
        &mut self,
        current: &TrajectoryRecord,
        rng: &mut RngHandle,
    ) -> Result<TrajectoryRecord, HmcError> {
        rng.uniform();
        Ok(TrajectoryRecord::new(
            current.phi.clone(),
            current.action,
            self.label,
        ))
    }

    fn save(&self, group: &mut Group, _manager: &EvolverManager) -> Result<(), HmcError> {
        group.write("label", &self.label)
    }
}

const A: i64 = 1;
const B: i64 = 2;

fn context() -> LoadContext {
    LoadContext::new(
        Arc::new(HubbardGaugeAction::new(1.0).unwrap()),
        Arc::new(Lattice::ring(1, 4, 1.0).unwrap()),
    )
}

fn manager() -> EvolverManager {
    let mut manager = EvolverManager::with_builtin_types();
    manager.register_evolver("Marker", Marker::from_store).unwrap();
    manager
}

fn record() -> TrajectoryRecord {
    TrajectoryRecord::new(Configuration::zeros(4), Complex64::new(0.0, 0.0), 0)
}

fn labels(evolver: &mut dyn Evolver, n: usize, rng: &mut RngHandle) -> Vec<i64> {
    let mut current = record();
    (0..n)
        .map(|_| {
            current = evolver.evolve(&current, rng).unwrap();
            current.traj_point
        })
        .collect()
}

fn a2_b3() -> Alternator {
    Alternator::new()
        .with(Marker::boxed(A), 2)
        .unwrap()
        .with(Marker::boxed(B), 3)
        .unwrap()
}

#[test]
fn schedule_repeats_and_wraps() {
    let mut alternator = a2_b3();
    assert_eq!(alternator.cursor(), (0, 2));
    let mut rng = RngHandle::from_seed(1);
    assert_eq!(labels(&mut alternator, 6, &mut rng), vec![A, A, B, B, B, A]);
    assert_eq!(alternator.cursor(), (0, 1));
}

#[test]
fn mid_cycle_reload_continues_the_cycle() {
    let manager = manager();
    let mut alternator = a2_b3();
    let mut rng = RngHandle::from_seed(1);
    assert_eq!(labels(&mut alternator, 1, &mut rng), vec![A]);

    let mut group = Group::new();
    manager.save(&alternator, &mut group).unwrap();
    let mut reloaded = manager.load(&group, &context()).unwrap();

    assert_eq!(reloaded.type_name(), "Alternator");
    assert_eq!(labels(reloaded.as_mut(), 4, &mut rng), vec![A, B, B, B]);
}

#[test]
fn zero_repeats_and_empty_schedules_are_rejected() {
    let err = Alternator::new().with(Marker::boxed(A), 0).unwrap_err();
    assert!(matches!(err, HmcError::Config(_)));

    let mut empty = Alternator::new();
    assert!(empty.is_empty());
    let mut rng = RngHandle::from_seed(0);
    let err = empty.evolve(&record(), &mut rng).unwrap_err();
    assert!(matches!(err, HmcError::Config(_)));
}

#[test]
fn corrupted_cursor_is_rejected() {
    let manager = manager();
    let mut group = Group::new();
    group.write(hmc_evolve::TYPE_TAG, "Alternator").unwrap();
    group.write("repeats", &vec![2usize, 3]).unwrap();
    group.write("index", &0usize).unwrap();
    group.write("remaining", &9usize).unwrap();
    for (i, label) in [A, B].into_iter().enumerate() {
        let sub = group.create_group(&format!("evolvers/{i}")).unwrap();
        manager.save(&Marker { label }, sub).unwrap();
    }

    let err = manager.load(&group, &context()).unwrap_err();
    assert_eq!(err.info().code, "invalid-cursor");
}

#[test]
fn nested_alternators_round_trip() {
    let manager = manager();
    let inner = Alternator::new().with(Marker::boxed(B), 2).unwrap();
    let mut outer = Alternator::new()
        .with(Marker::boxed(A), 1)
        .unwrap()
        .with(Box::new(inner), 2)
        .unwrap();

    let mut group = Group::new();
    manager.save(&outer, &mut group).unwrap();
    let mut reloaded = manager.load(&group, &context()).unwrap();

    let mut rng_a = RngHandle::from_seed(2);
    let mut rng_b = RngHandle::from_seed(2);
    assert_eq!(
        labels(&mut outer, 9, &mut rng_a),
        labels(reloaded.as_mut(), 9, &mut rng_b)
    );
}
