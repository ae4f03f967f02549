//! Trajectory and checkpoint layout inside a [`Store`].
//!
//! A trajectory group holds the datasets `phi`, `action` and `trajPoint`. A
//! checkpoint group holds
//!
//! * `rngState`: the complete generator state,
//! * `cfg`: a soft link to the trajectory group the checkpoint continues from,
//! * `proposer`: the evolver, written through the [`EvolverManager`].
//!
//! Groups are assembled off-tree and attached in one step, so a failed write
//! never leaves a half-written group behind.

use hmc_core::errors::ErrorInfo;
use hmc_core::{Group, HmcError, RngHandle, Store, TrajectoryRecord};
use tracing::info;

use crate::evolver::{Evolver, LoadContext};
use crate::manager::EvolverManager;

/// State needed to continue a chain.
#[derive(Debug)]
pub struct Checkpoint {
    /// Generator positioned right after the checkpointed trajectory.
    pub rng: RngHandle,
    /// Trajectory the chain continues from.
    pub record: TrajectoryRecord,
    /// Evolver including its live state.
    pub evolver: Box<dyn Evolver>,
}

/// Path of entry `itr` inside `group`.
pub fn entry_path(group: &str, itr: usize) -> String {
    format!("{}/{itr}", group.trim_matches('/'))
}

fn absolute(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

/// Writes `record` as a new group at `path`.
pub fn write_trajectory(
    store: &mut Store,
    path: &str,
    record: &TrajectoryRecord,
) -> Result<(), HmcError> {
    let mut group = Group::new();
    group.write("phi", &record.phi)?;
    group.write("action", &record.action)?;
    group.write("trajPoint", &record.traj_point)?;
    store.root_mut().insert_group(path, group)
}

/// Reads a trajectory group, following soft links.
pub fn read_trajectory(store: &Store, path: &str) -> Result<TrajectoryRecord, HmcError> {
    let group = store.resolve_group(path)?;
    Ok(TrajectoryRecord::new(
        group.read("phi")?,
        group.read("action")?,
        group.read("trajPoint")?,
    ))
}

/// Writes a checkpoint referring to the trajectory at `trajectory_path`.
pub fn write_checkpoint(
    store: &mut Store,
    checkpoint_path: &str,
    rng: &RngHandle,
    trajectory_path: &str,
    evolver: &dyn Evolver,
    manager: &EvolverManager,
) -> Result<(), HmcError> {
    if !store.group_exists(trajectory_path) {
        return Err(HmcError::BrokenReference(
            ErrorInfo::new("missing-trajectory", "checkpoint must refer to a written trajectory")
                .with_context("checkpoint", checkpoint_path)
                .with_context("trajectory", trajectory_path)
                .with_hint("write the trajectory before the checkpoint"),
        ));
    }

    let mut group = Group::new();
    rng.write_state(group.create_group("rngState")?)?;
    group.link("cfg", absolute(trajectory_path))?;
    manager.save(evolver, group.create_group("proposer")?)?;
    store.root_mut().insert_group(checkpoint_path, group)?;

    info!(
        checkpoint = checkpoint_path,
        trajectory = trajectory_path,
        evolver = evolver.type_name(),
        "wrote checkpoint"
    );
    Ok(())
}

/// Restores generator, trajectory and evolver from a checkpoint.
///
/// The `cfg` link is resolved here; a dangling link is a
/// [`HmcError::BrokenReference`].
pub fn load_checkpoint(
    store: &Store,
    checkpoint_path: &str,
    manager: &EvolverManager,
    ctx: &LoadContext,
) -> Result<Checkpoint, HmcError> {
    let group = store.resolve_group(checkpoint_path)?;
    let rng = RngHandle::read_state(group.group("rngState")?)?;
    if group.link_target("cfg").is_none() {
        return Err(HmcError::BrokenReference(
            ErrorInfo::new("missing-link", "checkpoint has no cfg link")
                .with_context("checkpoint", checkpoint_path),
        ));
    }
    let record = read_trajectory(store, &format!("{}/cfg", absolute(checkpoint_path)))?;
    let evolver = manager.load(group.group("proposer")?, ctx)?;

    info!(
        checkpoint = checkpoint_path,
        evolver = evolver.type_name(),
        traj_point = record.traj_point,
        "loaded checkpoint"
    );
    Ok(Checkpoint {
        rng,
        record,
        evolver,
    })
}

/// Highest numeric entry label inside `group`, if any.
pub fn latest_checkpoint(store: &Store, group: &str) -> Option<usize> {
    store
        .resolve_group(group)
        .ok()?
        .names()
        .filter_map(|name| name.parse::<usize>().ok())
        .max()
}
