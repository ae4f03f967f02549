//! Sequential HMC loop with scheduled checks and callbacks.

use std::fmt;

use hmc_core::errors::ErrorInfo;
use hmc_core::{Configuration, Hamiltonian, HmcError, RngHandle, Store, TrajectoryRecord};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::evolver::Evolver;
use crate::manager::EvolverManager;

/// Sanity check run on the current record; an error aborts the run.
pub type Check = fn(&TrajectoryRecord) -> Result<(), HmcError>;

/// Everything a callback may look at after a trajectory.
pub struct TrajectoryContext<'a> {
    /// Global trajectory index.
    pub itr: usize,
    /// Record produced by the trajectory.
    pub record: &'a TrajectoryRecord,
    /// Generator state after the trajectory.
    pub rng: &'a RngHandle,
    /// Evolver in its state after the trajectory.
    pub evolver: &'a dyn Evolver,
    /// Manager used to persist the evolver.
    pub manager: &'a EvolverManager,
    /// Output store, if the run writes one.
    pub store: Option<&'a mut Store>,
}

impl TrajectoryContext<'_> {
    /// Returns the output store or a [`HmcError::Config`] naming `callback`.
    pub fn require_store(&mut self, callback: &str) -> Result<&mut Store, HmcError> {
        self.store.as_deref_mut().ok_or_else(|| {
            HmcError::Config(
                ErrorInfo::new("missing-store", "callback needs an output store")
                    .with_context("callback", callback),
            )
        })
    }
}

/// Work scheduled after trajectories: writers and measurements.
pub trait Callback {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Invoked after every trajectory whose index is a multiple of the frequency.
    fn on_trajectory(&mut self, ctx: &mut TrajectoryContext<'_>) -> Result<(), HmcError>;

    /// Persists accumulated results at `path`.
    fn save(&self, _store: &mut Store, _path: &str) -> Result<(), HmcError> {
        Ok(())
    }
}

impl<T: Callback + ?Sized> Callback for &mut T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn on_trajectory(&mut self, ctx: &mut TrajectoryContext<'_>) -> Result<(), HmcError> {
        (**self).on_trajectory(ctx)
    }

    fn save(&self, store: &mut Store, path: &str) -> Result<(), HmcError> {
        (**self).save(store, path)
    }
}

/// Checks and callbacks with their frequencies, run in insertion order.
#[derive(Default)]
pub struct Schedule<'a> {
    checks: Vec<(usize, Check)>,
    callbacks: Vec<(usize, Box<dyn Callback + 'a>)>,
}

impl<'a> Schedule<'a> {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `check` after every trajectory with `itr % freq == 0`.
    pub fn check(mut self, freq: usize, check: Check) -> Result<Self, HmcError> {
        ensure_frequency("check", freq)?;
        self.checks.push((freq, check));
        Ok(self)
    }

    /// Runs `callback` after every trajectory with `itr % freq == 0`.
    pub fn callback(
        mut self,
        freq: usize,
        callback: impl Callback + 'a,
    ) -> Result<Self, HmcError> {
        ensure_frequency(callback.name(), freq)?;
        self.callbacks.push((freq, Box::new(callback)));
        Ok(self)
    }

    /// Number of scheduled checks and callbacks.
    pub fn len(&self) -> usize {
        self.checks.len() + self.callbacks.len()
    }

    /// True if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Schedule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schedule")
            .field(
                "checks",
                &self.checks.iter().map(|(freq, _)| *freq).collect::<Vec<_>>(),
            )
            .field(
                "callbacks",
                &self
                    .callbacks
                    .iter()
                    .map(|(freq, cb)| (cb.name().to_owned(), *freq))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn ensure_frequency(what: &str, freq: usize) -> Result<(), HmcError> {
    if freq == 0 {
        return Err(HmcError::Config(
            ErrorInfo::new("zero-frequency", "frequency must be at least 1").with_context("item", what),
        ));
    }
    Ok(())
}

/// Shared collaborators of a run.
#[derive(Debug)]
pub struct RunContext<'a> {
    /// Manager used by checkpoint writers.
    pub manager: &'a EvolverManager,
    /// Output store.
    pub store: Option<&'a mut Store>,
    /// Global index of the first trajectory of this call.
    pub itr_offset: usize,
}

impl<'a> RunContext<'a> {
    /// Context without a store starting at trajectory 0.
    pub fn new(manager: &'a EvolverManager) -> Self {
        Self {
            manager,
            store: None,
            itr_offset: 0,
        }
    }

    /// Attaches an output store.
    pub fn with_store(mut self, store: &'a mut Store) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the global index of the first trajectory.
    pub fn with_offset(mut self, itr_offset: usize) -> Self {
        self.itr_offset = itr_offset;
        self
    }
}

/// Outcome of a call to [`hmc`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// Last record produced.
    pub record: TrajectoryRecord,
    /// Number of trajectories evolved by this call.
    pub trajectories: usize,
    /// Number of records that moved away from their start point.
    pub accepted: usize,
    /// `accepted / trajectories`, zero for an empty run.
    pub acceptance_rate: f64,
    /// `traj_point` of every trajectory in order.
    pub traj_points: Vec<i64>,
    /// SHA-256 of the canonical JSON of the final configuration.
    pub final_configuration_hash: String,
}

/// Hex encoded SHA-256 of the canonical JSON form of `phi`.
pub fn configuration_hash(phi: &Configuration) -> Result<String, HmcError> {
    let json = serde_json::to_vec(phi)
        .map_err(|err| HmcError::Store(ErrorInfo::new("configuration-serialize", err.to_string())))?;
    Ok(hex::encode(Sha256::digest(&json)))
}

/// Evolves `ntraj` trajectories starting from `initial`.
///
/// The initial action is evaluated once through `hamiltonian`.
pub fn hmc(
    initial: &Configuration,
    hamiltonian: &Hamiltonian,
    evolver: &mut dyn Evolver,
    ntraj: usize,
    rng: &mut RngHandle,
    schedule: Schedule<'_>,
    context: RunContext<'_>,
) -> Result<RunSummary, HmcError> {
    let action = hamiltonian.eval_action(initial)?;
    let start = TrajectoryRecord::new(initial.clone(), action, 0);
    hmc_from_record(start, evolver, ntraj, rng, schedule, context)
}

/// Evolves `ntraj` trajectories starting from an existing record.
///
/// Used when resuming from a checkpoint, where the action is already known.
pub fn hmc_from_record(
    start: TrajectoryRecord,
    evolver: &mut dyn Evolver,
    ntraj: usize,
    rng: &mut RngHandle,
    mut schedule: Schedule<'_>,
    mut context: RunContext<'_>,
) -> Result<RunSummary, HmcError> {
    hmc_core::ensure_finite_action(start.action)?;
    info!(
        evolver = evolver.type_name(),
        ntraj,
        offset = context.itr_offset,
        "starting hmc run"
    );

    let mut current = start;
    let mut accepted = 0usize;
    let mut traj_points = Vec::with_capacity(ntraj);

    for itr in context.itr_offset..context.itr_offset + ntraj {
        current = evolver.evolve(&current, rng)?;
        if current.accepted() {
            accepted += 1;
        }
        traj_points.push(current.traj_point);
        debug!(
            itr,
            traj_point = current.traj_point,
            action_re = current.action.re,
            action_im = current.action.im,
            "trajectory"
        );

        for (freq, check) in &schedule.checks {
            if itr % freq == 0 {
                if let Err(err) = check(&current) {
                    warn!(itr, error = %err, "check failed");
                    return Err(err);
                }
            }
        }

        let mut ctx = TrajectoryContext {
            itr,
            record: &current,
            rng: &*rng,
            evolver: &*evolver,
            manager: context.manager,
            store: context.store.as_deref_mut(),
        };
        for (freq, callback) in schedule.callbacks.iter_mut() {
            if itr % *freq == 0 {
                callback.on_trajectory(&mut ctx)?;
            }
        }
    }

    let acceptance_rate = if ntraj == 0 {
        0.0
    } else {
        accepted as f64 / ntraj as f64
    };
    let final_configuration_hash = configuration_hash(&current.phi)?;
    info!(
        trajectories = ntraj,
        accepted,
        acceptance_rate,
        hash = %final_configuration_hash,
        "finished hmc run"
    );
    Ok(RunSummary {
        record: current,
        trajectories: ntraj,
        accepted,
        acceptance_rate,
        traj_points,
        final_configuration_hash,
    })
}
