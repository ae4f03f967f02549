use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hmc_core::errors::ErrorInfo;
use hmc_core::{derive_substream_seed, Complex64, HmcError};
use serde::{Deserialize, Serialize};

use crate::alternator::Alternator;
use crate::evolver::{Evolver, LoadContext};
use crate::jumps::{TwoPiJumps, UniformJump};
use crate::leapfrog::{ConstStepLeapfrog, Direction, LinearStepLeapfrog};
use crate::selector::Selector;
use crate::transform::{AffineTransform, IdentityTransform, Transform};

/// YAML-configurable parameters of a single Markov chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Total number of trajectories, counted from trajectory 0.
    pub trajectories: usize,
    /// Master seed and chain index.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Evolver used for every trajectory.
    pub evolver: EvolverConfig,
    /// Trajectory and checkpoint writing.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Sanity check frequencies.
    #[serde(default)]
    pub checks: CheckConfig,
    /// Interval between progress log lines (0 disables them).
    #[serde(default)]
    pub progress_interval: usize,
    /// Output store layout.
    #[serde(default)]
    pub output: OutputConfig,
}

impl RunConfig {
    /// Parses a configuration from YAML.
    pub fn from_yaml_str(contents: &str) -> Result<Self, HmcError> {
        let config: RunConfig = serde_yaml::from_str(contents)
            .map_err(|err| HmcError::Config(ErrorInfo::new("config-parse", err.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, HmcError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            HmcError::Config(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&contents).map_err(|err| match err {
            HmcError::Config(info) => {
                HmcError::Config(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), HmcError> {
        let interval = self.checkpoint.interval;
        let every = self.checkpoint.trajectory_interval;
        if every == 0 {
            return Err(invalid(
                "trajectory_interval",
                "trajectory interval must be at least 1",
            ));
        }
        if interval > 0 && interval % every != 0 {
            return Err(HmcError::Config(
                ErrorInfo::new("invalid-config", "checkpoints must land on written trajectories")
                    .with_context("field", "checkpoint.interval")
                    .with_context("interval", interval.to_string())
                    .with_context("trajectory_interval", every.to_string()),
            ));
        }
        if interval > 0 && self.output.store_path.is_none() {
            return Err(invalid(
                "output.store_path",
                "checkpoints need an output store",
            ));
        }
        self.evolver.validate()
    }

    /// Seed of this chain derived from the master seed.
    pub fn chain_seed(&self) -> u64 {
        derive_substream_seed(self.seed_policy.master_seed, self.seed_policy.chain)
    }
}

fn invalid(field: &str, message: &str) -> HmcError {
    HmcError::Config(ErrorInfo::new("invalid-config", message).with_context("field", field))
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Index of the chain, used to derive an independent substream.
    #[serde(default)]
    pub chain: u64,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            chain: 0,
        }
    }
}

/// Checkpointing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Interval in trajectories between checkpoints (0 disables checkpoints).
    #[serde(default)]
    pub interval: usize,
    /// Interval in trajectories between written trajectories.
    #[serde(default = "default_trajectory_interval")]
    pub trajectory_interval: usize,
}

fn default_trajectory_interval() -> usize {
    1
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval: 0,
            trajectory_interval: default_trajectory_interval(),
        }
    }
}

/// Frequencies of the built-in sanity checks (0 disables a check).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Interval of [`crate::checks::reality_check`].
    #[serde(default = "default_reality_interval")]
    pub reality_interval: usize,
    /// Interval of [`crate::checks::finiteness_check`].
    #[serde(default = "default_finite_interval")]
    pub finite_interval: usize,
}

fn default_reality_interval() -> usize {
    20
}

fn default_finite_interval() -> usize {
    1
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            reality_interval: default_reality_interval(),
            finite_interval: default_finite_interval(),
        }
    }
}

/// Output store layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File holding the store. Nothing is written if unset.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    /// Group receiving trajectories.
    #[serde(default = "default_trajectory_group")]
    pub trajectory_group: String,
    /// Group receiving checkpoints.
    #[serde(default = "default_checkpoint_group")]
    pub checkpoint_group: String,
}

fn default_trajectory_group() -> String {
    "configuration".to_owned()
}

fn default_checkpoint_group() -> String {
    "checkpoint".to_owned()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            trajectory_group: default_trajectory_group(),
            checkpoint_group: default_checkpoint_group(),
        }
    }
}

/// Declarative description of an evolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EvolverConfig {
    /// [`ConstStepLeapfrog`].
    ConstStepLeapfrog {
        /// Step length.
        step_length: f64,
        /// MD steps per trajectory.
        steps: usize,
        /// Integration direction.
        #[serde(default)]
        direction: Direction,
        /// Accept/reject rule.
        #[serde(default)]
        selector: Selector,
        /// Optional manifold transform.
        #[serde(default)]
        transform: Option<TransformConfig>,
    },
    /// [`LinearStepLeapfrog`].
    LinearStepLeapfrog {
        /// Step length at the first and last interpolation point.
        step_length_range: (f64, f64),
        /// Step count at the first and last interpolation point.
        steps_range: (usize, usize),
        /// Number of interpolation points.
        ninterp: usize,
        /// Integration direction.
        #[serde(default)]
        direction: Direction,
        /// Accept/reject rule.
        #[serde(default)]
        selector: Selector,
        /// Optional manifold transform.
        #[serde(default)]
        transform: Option<TransformConfig>,
    },
    /// [`TwoPiJumps`].
    TwoPiJumps {
        /// Number of sites shifted per proposal.
        n_jumps: usize,
        /// Accept/reject rule.
        #[serde(default)]
        selector: Selector,
    },
    /// [`UniformJump`].
    UniformJump {
        /// Number of sites shifted per proposal.
        n_sites: usize,
        /// Largest absolute winding shift drawn (at least 1).
        max_winding: i64,
        /// Accept/reject rule.
        #[serde(default)]
        selector: Selector,
    },
    /// [`Alternator`].
    Alternator {
        /// Sub-evolvers in order.
        schedule: Vec<AlternatorEntry>,
    },
}

/// One slot of an alternator schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternatorEntry {
    /// Consecutive trajectories run by `evolver`.
    #[serde(default = "default_repeats")]
    pub repeats: usize,
    /// The sub-evolver.
    pub evolver: EvolverConfig,
}

fn default_repeats() -> usize {
    1
}

impl EvolverConfig {
    fn validate(&self) -> Result<(), HmcError> {
        match self {
            EvolverConfig::Alternator { schedule } => {
                if schedule.is_empty() {
                    return Err(invalid("evolver.schedule", "alternator schedule is empty"));
                }
                for entry in schedule {
                    if entry.repeats == 0 {
                        return Err(invalid("evolver.schedule.repeats", "repeats must be at least 1"));
                    }
                    entry.evolver.validate()?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Constructs the described evolver.
    pub fn build(&self, ctx: &LoadContext) -> Result<Box<dyn Evolver>, HmcError> {
        let action = Arc::clone(&ctx.action);
        let evolver: Box<dyn Evolver> = match self {
            EvolverConfig::ConstStepLeapfrog {
                step_length,
                steps,
                direction,
                selector,
                transform,
            } => {
                let mut evolver = ConstStepLeapfrog::new(action, *step_length, *steps)?
                    .with_direction(*direction)
                    .with_selector(*selector);
                if let Some(transform) = transform {
                    evolver = evolver.with_transform(transform.build(ctx)?);
                }
                Box::new(evolver)
            }
            EvolverConfig::LinearStepLeapfrog {
                step_length_range,
                steps_range,
                ninterp,
                direction,
                selector,
                transform,
            } => {
                let mut evolver =
                    LinearStepLeapfrog::new(action, *step_length_range, *steps_range, *ninterp)?
                        .with_direction(*direction)
                        .with_selector(*selector);
                if let Some(transform) = transform {
                    evolver = evolver.with_transform(transform.build(ctx)?);
                }
                Box::new(evolver)
            }
            EvolverConfig::TwoPiJumps { n_jumps, selector } => Box::new(
                TwoPiJumps::new(action, Arc::clone(&ctx.lattice), *n_jumps)?
                    .with_selector(*selector),
            ),
            EvolverConfig::UniformJump {
                n_sites,
                max_winding,
                selector,
            } => Box::new(
                UniformJump::new(action, Arc::clone(&ctx.lattice), *n_sites, *max_winding)?
                    .with_selector(*selector),
            ),
            EvolverConfig::Alternator { schedule } => {
                let mut alternator = Alternator::new();
                for entry in schedule {
                    alternator.add(entry.evolver.build(ctx)?, entry.repeats)?;
                }
                Box::new(alternator)
            }
        };
        Ok(evolver)
    }
}

/// Declarative description of a manifold transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransformConfig {
    /// [`IdentityTransform`].
    Identity,
    /// [`AffineTransform`].
    Affine {
        /// Scale factor.
        #[serde(default = "default_scale")]
        scale: f64,
        /// Constant shift as `[re, im]`.
        #[serde(default)]
        shift: (f64, f64),
    },
}

fn default_scale() -> f64 {
    1.0
}

impl TransformConfig {
    /// Constructs the described transform.
    pub fn build(&self, ctx: &LoadContext) -> Result<Box<dyn Transform>, HmcError> {
        let action = Arc::clone(&ctx.action);
        Ok(match self {
            TransformConfig::Identity => Box::new(IdentityTransform::new(action)),
            TransformConfig::Affine { scale, shift } => Box::new(AffineTransform::new(
                action,
                *scale,
                Complex64::new(shift.0, shift.1),
            )?),
        })
    }
}
