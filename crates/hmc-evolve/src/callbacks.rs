//! Built-in callbacks: trajectory and checkpoint writers, progress logging
//! and a simple action measurement.

use std::path::PathBuf;

use hmc_core::{Complex64, Group, HmcError, Store};
use tracing::info;

use crate::checkpoint::{entry_path, write_checkpoint, write_trajectory};
use crate::driver::{Callback, TrajectoryContext};

/// Writes every scheduled record to `/<group>/<itr>`.
#[derive(Debug, Clone)]
pub struct WriteTrajectory {
    group: String,
}

impl WriteTrajectory {
    /// Creates the writer.
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
        }
    }
}

impl Callback for WriteTrajectory {
    fn name(&self) -> &str {
        "write-trajectory"
    }

    fn on_trajectory(&mut self, ctx: &mut TrajectoryContext<'_>) -> Result<(), HmcError> {
        let path = entry_path(&self.group, ctx.itr);
        let record = ctx.record;
        write_trajectory(ctx.require_store(self.name())?, &path, record)
    }
}

/// Writes a checkpoint labelled with the trajectory index.
///
/// The trajectory at the same index must already be written, so this callback
/// is scheduled after a [`WriteTrajectory`] with a compatible frequency.
#[derive(Debug, Clone)]
pub struct WriteCheckpoint {
    trajectory_group: String,
    checkpoint_group: String,
    flush_to: Option<PathBuf>,
}

impl WriteCheckpoint {
    /// Creates the writer.
    pub fn new(trajectory_group: impl Into<String>, checkpoint_group: impl Into<String>) -> Self {
        Self {
            trajectory_group: trajectory_group.into(),
            checkpoint_group: checkpoint_group.into(),
            flush_to: None,
        }
    }

    /// Persists the whole store to `path` after every checkpoint.
    pub fn flush_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.flush_to = Some(path.into());
        self
    }
}

impl Callback for WriteCheckpoint {
    fn name(&self) -> &str {
        "write-checkpoint"
    }

    fn on_trajectory(&mut self, ctx: &mut TrajectoryContext<'_>) -> Result<(), HmcError> {
        let checkpoint = entry_path(&self.checkpoint_group, ctx.itr);
        let trajectory = entry_path(&self.trajectory_group, ctx.itr);
        let (rng, evolver, manager) = (ctx.rng, ctx.evolver, ctx.manager);
        let store = ctx.require_store("write-checkpoint")?;
        write_checkpoint(store, &checkpoint, rng, &trajectory, evolver, manager)?;
        if let Some(path) = &self.flush_to {
            store.save(path)?;
        }
        Ok(())
    }
}

/// Logs progress as a structured event.
#[derive(Debug, Clone)]
pub struct Progress {
    label: String,
    total: usize,
}

impl Progress {
    /// `total` is the global index one past the last trajectory.
    pub fn new(label: impl Into<String>, total: usize) -> Self {
        Self {
            label: label.into(),
            total,
        }
    }
}

impl Callback for Progress {
    fn name(&self) -> &str {
        "progress"
    }

    fn on_trajectory(&mut self, ctx: &mut TrajectoryContext<'_>) -> Result<(), HmcError> {
        info!(
            label = %self.label,
            itr = ctx.itr,
            total = self.total,
            action = ctx.record.action.re,
            "progress"
        );
        Ok(())
    }
}

/// Accumulates `(itr, action)` samples.
#[derive(Debug, Clone, Default)]
pub struct ActionHistory {
    samples: Vec<(usize, Complex64)>,
}

impl ActionHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples collected so far.
    pub fn samples(&self) -> &[(usize, Complex64)] {
        &self.samples
    }
}

impl Callback for ActionHistory {
    fn name(&self) -> &str {
        "action-history"
    }

    fn on_trajectory(&mut self, ctx: &mut TrajectoryContext<'_>) -> Result<(), HmcError> {
        self.samples.push((ctx.itr, ctx.record.action));
        Ok(())
    }

    fn save(&self, store: &mut Store, path: &str) -> Result<(), HmcError> {
        let mut group = Group::new();
        let itrs: Vec<usize> = self.samples.iter().map(|(itr, _)| *itr).collect();
        let actions: Vec<Complex64> = self.samples.iter().map(|(_, action)| *action).collect();
        group.write("itr", &itrs)?;
        group.write("action", &actions)?;
        store.root_mut().insert_group(path, group)
    }
}
