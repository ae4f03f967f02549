#![deny(missing_docs)]

//! Evolution engine for lattice HMC: proposers, transforms, the evolver
//! registry, the trajectory loop and bit-exact checkpoint/restart.
//!
//! A chain is driven by [`driver::hmc`], which repeatedly asks an
//! [`Evolver`] for the next [`hmc_core::TrajectoryRecord`] and runs scheduled
//! checks and callbacks after each trajectory. Evolvers are persisted through
//! an [`EvolverManager`] so that a run can be resumed from a checkpoint and
//! continue with the identical sequence of records.

/// Sequences several evolvers in a fixed schedule.
pub mod alternator;
/// Built-in trajectory callbacks.
pub mod callbacks;
/// Trajectory and checkpoint layout in the store.
pub mod checkpoint;
/// Sanity checks run between trajectories.
pub mod checks;
/// YAML run configuration.
pub mod config;
/// Trajectory loop, schedules and run summaries.
pub mod driver;
/// The evolver trait and load-time collaborators.
pub mod evolver;
/// Discrete winding-sector proposers.
pub mod jumps;
/// `run`/`resume` entry points driven by a [`RunConfig`].
pub mod kernel;
/// Leapfrog integrator and molecular dynamics proposers.
pub mod leapfrog;
/// Type registry for saving and loading evolvers and transforms.
pub mod manager;
/// Accept/reject rules.
pub mod selector;
/// Manifold transforms.
pub mod transform;

pub use alternator::Alternator;
pub use callbacks::{ActionHistory, Progress, WriteCheckpoint, WriteTrajectory};
pub use checkpoint::{
    entry_path, latest_checkpoint, load_checkpoint, read_trajectory, write_checkpoint,
    write_trajectory, Checkpoint,
};
pub use checks::{finiteness_check, reality_check};
pub use config::{EvolverConfig, RunConfig, SeedPolicy, TransformConfig};
pub use driver::{hmc, hmc_from_record, Callback, RunContext, RunSummary, Schedule, TrajectoryContext};
pub use evolver::{Evolver, LoadContext};
pub use jumps::{TwoPiJumps, UniformJump};
pub use kernel::{resume, run};
pub use leapfrog::{leapfrog, ConstStepLeapfrog, Direction, LinearStepLeapfrog};
pub use manager::{EvolverLoader, EvolverManager, TransformLoader, TYPE_TAG};
pub use selector::Selector;
pub use transform::{AffineTransform, IdentityTransform, Transform};
