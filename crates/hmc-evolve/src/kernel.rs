use std::sync::Arc;

use hmc_core::errors::ErrorInfo;
use hmc_core::{Action, Configuration, HmcError, Lattice, RngHandle, Store};
use tracing::info;

use crate::callbacks::{Progress, WriteCheckpoint, WriteTrajectory};
use crate::checkpoint::{self, entry_path};
use crate::checks::{finiteness_check, reality_check};
use crate::config::RunConfig;
use crate::driver::{self, RunContext, RunSummary, Schedule};
use crate::evolver::{Evolver, LoadContext};
use crate::manager::EvolverManager;

/// Runs a fresh chain from `initial` as described by `config`.
///
/// Refuses to overwrite an existing store file.
pub fn run(
    config: &RunConfig,
    initial: &Configuration,
    action: Arc<dyn Action>,
    lattice: Arc<Lattice>,
) -> Result<RunSummary, HmcError> {
    config.validate()?;
    if let Some(path) = &config.output.store_path {
        if path.exists() {
            return Err(HmcError::StoreCollision(
                ErrorInfo::new("store-exists", "output store already exists")
                    .with_context("path", path.display().to_string())
                    .with_hint("use resume to continue an existing run"),
            ));
        }
    }

    let ctx = LoadContext::new(action, lattice);
    let manager = EvolverManager::with_builtin_types();
    let mut evolver = config.evolver.build(&ctx)?;
    let mut rng = RngHandle::from_seed(config.chain_seed());
    let mut store = Store::new();
    let hamiltonian = ctx.hamiltonian();

    info!(
        trajectories = config.trajectories,
        seed = config.chain_seed(),
        "starting run"
    );
    let summary = {
        let schedule = build_schedule(config)?;
        let mut context = RunContext::new(&manager);
        if config.output.store_path.is_some() {
            context = context.with_store(&mut store);
        }
        driver::hmc(
            initial,
            &hamiltonian,
            evolver.as_mut(),
            config.trajectories,
            &mut rng,
            schedule,
            context,
        )?
    };
    if let Some(path) = &config.output.store_path {
        seal(config, &mut store, &summary, &rng, evolver.as_ref(), &manager)?;
        store.save(path)?;
    }
    Ok(summary)
}

/// Continues a chain from the latest checkpoint in the configured store.
///
/// Trajectories are evolved up to `config.trajectories` in total. A run that
/// already reached that count returns an empty summary ending at the last
/// written trajectory.
pub fn resume(
    config: &RunConfig,
    action: Arc<dyn Action>,
    lattice: Arc<Lattice>,
) -> Result<RunSummary, HmcError> {
    config.validate()?;
    let path = config.output.store_path.as_ref().ok_or_else(|| {
        HmcError::Config(
            ErrorInfo::new("missing-store", "resume needs output.store_path")
                .with_context("field", "output.store_path"),
        )
    })?;
    if config.checkpoint.interval == 0 {
        return Err(HmcError::Config(
            ErrorInfo::new("invalid-config", "resume needs checkpoints enabled")
                .with_context("field", "checkpoint.interval")
                .with_hint("set checkpoint.interval so the extended chain can be resumed again"),
        ));
    }
    let mut store = Store::load(path)?;
    let output = &config.output;

    let last_written = checkpoint::latest_checkpoint(&store, &output.trajectory_group);
    if let Some(last) = last_written.filter(|last| last + 1 >= config.trajectories) {
        info!(last, "run already complete");
        let record = checkpoint::read_trajectory(&store, &entry_path(&output.trajectory_group, last))?;
        return Ok(RunSummary {
            final_configuration_hash: driver::configuration_hash(&record.phi)?,
            record,
            trajectories: 0,
            accepted: 0,
            acceptance_rate: 0.0,
            traj_points: Vec::new(),
        });
    }

    let latest = checkpoint::latest_checkpoint(&store, &output.checkpoint_group).ok_or_else(|| {
        HmcError::Store(
            ErrorInfo::new("no-checkpoint", "store contains no checkpoint")
                .with_context("path", path.display().to_string())
                .with_context("group", output.checkpoint_group.clone()),
        )
    })?;

    let ctx = LoadContext::new(action, lattice);
    let manager = EvolverManager::with_builtin_types();
    let loaded = checkpoint::load_checkpoint(
        &store,
        &entry_path(&output.checkpoint_group, latest),
        &manager,
        &ctx,
    )?;
    let mut evolver = loaded.evolver;
    let mut rng = loaded.rng;
    let start = latest + 1;
    let remaining = config.trajectories.saturating_sub(start);

    info!(checkpoint = latest, remaining, "resuming run");
    let summary = {
        let schedule = build_schedule(config)?;
        let context = RunContext::new(&manager)
            .with_store(&mut store)
            .with_offset(start);
        driver::hmc_from_record(
            loaded.record,
            evolver.as_mut(),
            remaining,
            &mut rng,
            schedule,
            context,
        )?
    };
    seal(config, &mut store, &summary, &rng, evolver.as_ref(), &manager)?;
    store.save(path)?;
    Ok(summary)
}

/// Checkpoints the last trajectory of a run so the chain can be extended.
fn seal(
    config: &RunConfig,
    store: &mut Store,
    summary: &RunSummary,
    rng: &RngHandle,
    evolver: &dyn Evolver,
    manager: &EvolverManager,
) -> Result<(), HmcError> {
    if config.checkpoint.interval == 0 || summary.trajectories == 0 {
        return Ok(());
    }
    let last = config.trajectories - 1;
    let trajectory = entry_path(&config.output.trajectory_group, last);
    if !store.group_exists(&trajectory) {
        checkpoint::write_trajectory(store, &trajectory, &summary.record)?;
    }
    let target = entry_path(&config.output.checkpoint_group, last);
    if !store.group_exists(&target) {
        checkpoint::write_checkpoint(store, &target, rng, &trajectory, evolver, manager)?;
    }
    Ok(())
}

fn build_schedule(config: &RunConfig) -> Result<Schedule<'static>, HmcError> {
    let mut schedule = Schedule::new();
    if config.checks.finite_interval > 0 {
        schedule = schedule.check(config.checks.finite_interval, finiteness_check)?;
    }
    if config.checks.reality_interval > 0 {
        schedule = schedule.check(config.checks.reality_interval, reality_check)?;
    }

    let output = &config.output;
    if let Some(path) = &output.store_path {
        schedule = schedule.callback(
            config.checkpoint.trajectory_interval,
            WriteTrajectory::new(output.trajectory_group.clone()),
        )?;
        if config.checkpoint.interval > 0 {
            schedule = schedule.callback(
                config.checkpoint.interval,
                WriteCheckpoint::new(
                    output.trajectory_group.clone(),
                    output.checkpoint_group.clone(),
                )
                .flush_to(path.clone()),
            )?;
        }
    }
    if config.progress_interval > 0 {
        schedule = schedule.callback(
            config.progress_interval,
            Progress::new("hmc", config.trajectories),
        )?;
    }
    Ok(schedule)
}
