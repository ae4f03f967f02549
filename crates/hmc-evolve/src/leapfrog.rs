//! Molecular dynamics proposers built on the leapfrog integrator.
//!
//! Both proposers sample fresh momenta, integrate a trajectory of `steps`
//! steps of length `step_length` and hand the endpoint to their [`Selector`].
//! With a transform attached the integration happens on the proposal manifold
//! and the Jacobian of the map enters the acceptance weight.

use std::sync::Arc;

use hmc_core::errors::ErrorInfo;
use hmc_core::linalg::axpy;
use hmc_core::{
    Action, Complex64, Configuration, Group, Hamiltonian, HmcError, RngHandle, TrajectoryRecord,
};
use serde::{Deserialize, Serialize};

use crate::evolver::{Evolver, LoadContext};
use crate::manager::EvolverManager;
use crate::selector::Selector;
use crate::transform::Transform;

/// Integration direction of a leapfrog proposer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Positive step length, accepted points report `+steps`.
    #[default]
    Forward,
    /// Negative step length, accepted points report `-steps`.
    Backward,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }

    fn traj_point(self, steps: usize) -> i64 {
        let steps = steps as i64;
        match self {
            Direction::Forward => steps,
            Direction::Backward => -steps,
        }
    }
}

/// Integrates Hamilton's equations with the leapfrog scheme.
///
/// Returns the final configuration, the final momentum and the action at the
/// final configuration. `steps == 0` leaves both vectors untouched.
pub fn leapfrog(
    phi: &[Complex64],
    pi: &[Complex64],
    hamiltonian: &Hamiltonian,
    step_length: f64,
    steps: usize,
) -> Result<(Vec<Complex64>, Vec<Complex64>, Complex64), HmcError> {
    let mut phi = phi.to_vec();
    let mut pi = pi.to_vec();
    if steps == 0 {
        let action = hamiltonian.eval_action(&phi)?;
        return Ok((phi, pi, action));
    }

    let half = step_length / 2.0;
    axpy(half, &hamiltonian.force(&phi)?, &mut pi);
    for _ in 1..steps {
        axpy(step_length, &pi, &mut phi);
        axpy(step_length, &hamiltonian.force(&phi)?, &mut pi);
    }
    axpy(step_length, &pi, &mut phi);
    let (action, force) = hamiltonian.val_force(&phi)?;
    axpy(half, &force, &mut pi);
    Ok((phi, pi, action))
}

fn ensure_step(step_length: f64, steps: usize) -> Result<(), HmcError> {
    if !(step_length.is_finite() && step_length > 0.0) || steps == 0 {
        return Err(HmcError::Config(
            ErrorInfo::new("invalid-leapfrog", "leapfrog needs step_length > 0 and steps >= 1")
                .with_context("step_length", step_length.to_string())
                .with_context("steps", steps.to_string()),
        ));
    }
    Ok(())
}

/// Parameters of a single leapfrog trajectory.
struct Trajectory<'a> {
    hamiltonian: &'a Hamiltonian,
    transform: Option<&'a dyn Transform>,
    selector: Selector,
    direction: Direction,
    step_length: f64,
    steps: usize,
}

impl Trajectory<'_> {
    fn run(
        &self,
        current: &TrajectoryRecord,
        rng: &mut RngHandle,
    ) -> Result<TrajectoryRecord, HmcError> {
        let (start, ldj_start) = match self.transform {
            Some(transform) => transform.backward(&current.phi)?,
            None => (current.phi.clone(), Complex64::new(0.0, 0.0)),
        };

        let pi0 = self.hamiltonian.sample_momentum(start.len(), rng);
        let energy0 = self.hamiltonian.energy(current.action, &pi0);

        let (end, pi1, md_action) = leapfrog(
            &start,
            &pi0,
            self.hamiltonian,
            self.direction.sign() * self.step_length,
            self.steps,
        )?;

        let (phi, action, ldj_end) = match self.transform {
            Some(transform) => transform.forward(&Configuration::from_vec(end))?,
            None => (Configuration::from_vec(end), md_action, Complex64::new(0.0, 0.0)),
        };
        let energy1 = self.hamiltonian.energy(action, &pi1);

        if self
            .selector
            .select(energy0, energy1, ldj_end - ldj_start, rng)?
        {
            Ok(TrajectoryRecord::new(
                phi,
                action,
                self.direction.traj_point(self.steps),
            ))
        } else {
            Ok(current.rejected())
        }
    }
}

fn save_common(
    group: &mut Group,
    manager: &EvolverManager,
    direction: Direction,
    selector: Selector,
    transform: Option<&dyn Transform>,
) -> Result<(), HmcError> {
    group.write("direction", &direction)?;
    group.write("selector", &selector)?;
    if let Some(transform) = transform {
        let sub = group.create_group("transform")?;
        manager.save_transform(transform, sub)?;
    }
    Ok(())
}

fn load_transform(
    group: &Group,
    manager: &EvolverManager,
    ctx: &LoadContext,
) -> Result<Option<Box<dyn Transform>>, HmcError> {
    if group.contains("transform") {
        let sub = group.group("transform")?;
        Ok(Some(manager.load_transform(sub, ctx)?))
    } else {
        Ok(None)
    }
}

/// Leapfrog proposer with fixed step length and step count.
#[derive(Debug)]
pub struct ConstStepLeapfrog {
    hamiltonian: Hamiltonian,
    step_length: f64,
    steps: usize,
    direction: Direction,
    selector: Selector,
    transform: Option<Box<dyn Transform>>,
}

impl ConstStepLeapfrog {
    /// Registered type name.
    pub const TYPE_NAME: &'static str = "ConstStepLeapfrog";

    /// Creates a forward Metropolis proposer without transform.
    pub fn new(action: Arc<dyn Action>, step_length: f64, steps: usize) -> Result<Self, HmcError> {
        ensure_step(step_length, steps)?;
        Ok(Self {
            hamiltonian: Hamiltonian::new(action),
            step_length,
            steps,
            direction: Direction::Forward,
            selector: Selector::default(),
            transform: None,
        })
    }

    /// Sets the integration direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the accept/reject rule.
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    /// Attaches a manifold transform.
    pub fn with_transform(mut self, transform: Box<dyn Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Step length.
    pub fn step_length(&self) -> f64 {
        self.step_length
    }

    /// Number of MD steps per trajectory.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Loader registered with the [`EvolverManager`].
    pub fn from_store(
        group: &Group,
        manager: &EvolverManager,
        ctx: &LoadContext,
    ) -> Result<Box<dyn Evolver>, HmcError> {
        let mut evolver = Self::new(
            Arc::clone(&ctx.action),
            group.read("step_length")?,
            group.read("steps")?,
        )?
        .with_direction(group.read("direction")?)
        .with_selector(group.read("selector")?);
        evolver.transform = load_transform(group, manager, ctx)?;
        Ok(Box::new(evolver))
    }
}

impl Evolver for ConstStepLeapfrog {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn evolve(
        &mut self,
        current: &TrajectoryRecord,
        rng: &mut RngHandle,
    ) -> Result<TrajectoryRecord, HmcError> {
        Trajectory {
            hamiltonian: &self.hamiltonian,
            transform: self.transform.as_deref(),
            selector: self.selector,
            direction: self.direction,
            step_length: self.step_length,
            steps: self.steps,
        }
        .run(current, rng)
    }

    fn save(&self, group: &mut Group, manager: &EvolverManager) -> Result<(), HmcError> {
        group.write("step_length", &self.step_length)?;
        group.write("steps", &self.steps)?;
        save_common(
            group,
            manager,
            self.direction,
            self.selector,
            self.transform.as_deref(),
        )
    }
}

/// Leapfrog proposer whose step length and step count are interpolated
/// linearly over the first `ninterp` trajectories.
///
/// Useful for thermalisation: start with short, coarse trajectories and move
/// towards the production parameters.
#[derive(Debug)]
pub struct LinearStepLeapfrog {
    hamiltonian: Hamiltonian,
    step_length_range: (f64, f64),
    steps_range: (usize, usize),
    ninterp: usize,
    current: usize,
    direction: Direction,
    selector: Selector,
    transform: Option<Box<dyn Transform>>,
}

impl LinearStepLeapfrog {
    /// Registered type name.
    pub const TYPE_NAME: &'static str = "LinearStepLeapfrog";

    /// Creates the proposer starting at interpolation point 0.
    pub fn new(
        action: Arc<dyn Action>,
        step_length_range: (f64, f64),
        steps_range: (usize, usize),
        ninterp: usize,
    ) -> Result<Self, HmcError> {
        ensure_step(step_length_range.0, steps_range.0)?;
        ensure_step(step_length_range.1, steps_range.1)?;
        Ok(Self {
            hamiltonian: Hamiltonian::new(action),
            step_length_range,
            steps_range,
            ninterp,
            current: 0,
            direction: Direction::Forward,
            selector: Selector::default(),
            transform: None,
        })
    }

    /// Sets the integration direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the accept/reject rule.
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    /// Attaches a manifold transform.
    pub fn with_transform(mut self, transform: Box<dyn Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Number of trajectories evolved so far, saturating at `ninterp`.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Step length and step count used for trajectory `i`.
    pub fn parameters_at(&self, i: usize) -> (f64, usize) {
        if self.ninterp <= 1 || i + 1 >= self.ninterp {
            return (self.step_length_range.1, self.steps_range.1);
        }
        let frac = i as f64 / (self.ninterp - 1) as f64;
        let (l0, l1) = self.step_length_range;
        let (n0, n1) = (self.steps_range.0 as f64, self.steps_range.1 as f64);
        let step_length = l0 + (l1 - l0) * frac;
        let steps = (n0 + (n1 - n0) * frac).round().max(1.0) as usize;
        (step_length, steps)
    }

    /// Loader registered with the [`EvolverManager`].
    pub fn from_store(
        group: &Group,
        manager: &EvolverManager,
        ctx: &LoadContext,
    ) -> Result<Box<dyn Evolver>, HmcError> {
        let mut evolver = Self::new(
            Arc::clone(&ctx.action),
            group.read("step_length_range")?,
            group.read("steps_range")?,
            group.read("ninterp")?,
        )?
        .with_direction(group.read("direction")?)
        .with_selector(group.read("selector")?);
        evolver.current = group.read("current")?;
        evolver.transform = load_transform(group, manager, ctx)?;
        Ok(Box::new(evolver))
    }
}

impl Evolver for LinearStepLeapfrog {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn evolve(
        &mut self,
        current: &TrajectoryRecord,
        rng: &mut RngHandle,
    ) -> Result<TrajectoryRecord, HmcError> {
        let (step_length, steps) = self.parameters_at(self.current);
        let next = Trajectory {
            hamiltonian: &self.hamiltonian,
            transform: self.transform.as_deref(),
            selector: self.selector,
            direction: self.direction,
            step_length,
            steps,
        }
        .run(current, rng)?;
        if self.current < self.ninterp {
            self.current += 1;
        }
        Ok(next)
    }

    fn save(&self, group: &mut Group, manager: &EvolverManager) -> Result<(), HmcError> {
        group.write("step_length_range", &self.step_length_range)?;
        group.write("steps_range", &self.steps_range)?;
        group.write("ninterp", &self.ninterp)?;
        group.write("current", &self.current)?;
        save_common(
            group,
            manager,
            self.direction,
            self.selector,
            self.transform.as_deref(),
        )
    }
}
