//! Discrete proposers moving fields between winding sectors.

use std::f64::consts::TAU;
use std::sync::Arc;

use hmc_core::errors::ErrorInfo;
use hmc_core::{
    Action, Complex64, Configuration, Group, Hamiltonian, HmcError, Lattice, RngHandle,
    TrajectoryRecord,
};
use rand::seq::index;

use crate::evolver::{Evolver, LoadContext};
use crate::manager::EvolverManager;
use crate::selector::Selector;

fn ensure_count(kind: &str, count: usize, lattice: &Lattice) -> Result<(), HmcError> {
    if count == 0 || count > lattice.latt_size() {
        return Err(HmcError::Config(
            ErrorInfo::new("invalid-jump-count", "jump count must be in 1..=latt_size")
                .with_context("evolver", kind)
                .with_context("count", count.to_string())
                .with_context("latt_size", lattice.latt_size().to_string()),
        ));
    }
    Ok(())
}

fn ensure_length(phi: &Configuration, lattice: &Lattice) -> Result<(), HmcError> {
    if phi.len() != lattice.latt_size() {
        return Err(HmcError::Config(
            ErrorInfo::new("length-mismatch", "configuration does not match the lattice")
                .with_context("phi_len", phi.len().to_string())
                .with_context("latt_size", lattice.latt_size().to_string()),
        ));
    }
    Ok(())
}

fn decide(
    hamiltonian: &Hamiltonian,
    selector: Selector,
    current: &TrajectoryRecord,
    candidate: Vec<Complex64>,
    rng: &mut RngHandle,
) -> Result<TrajectoryRecord, HmcError> {
    let action = hamiltonian.eval_action(&candidate)?;
    if selector.select(current.action, action, Complex64::new(0.0, 0.0), rng)? {
        Ok(TrajectoryRecord::new(Configuration::from_vec(candidate), action, 1))
    } else {
        Ok(current.rejected())
    }
}

/// Shifts `n_jumps` distinct sites by `±2π`.
#[derive(Debug)]
pub struct TwoPiJumps {
    hamiltonian: Hamiltonian,
    lattice: Arc<Lattice>,
    n_jumps: usize,
    selector: Selector,
}

impl TwoPiJumps {
    /// Registered type name.
    pub const TYPE_NAME: &'static str = "TwoPiJumps";

    /// Creates the proposer.
    pub fn new(
        action: Arc<dyn Action>,
        lattice: Arc<Lattice>,
        n_jumps: usize,
    ) -> Result<Self, HmcError> {
        ensure_count(Self::TYPE_NAME, n_jumps, &lattice)?;
        Ok(Self {
            hamiltonian: Hamiltonian::new(action),
            lattice,
            n_jumps,
            selector: Selector::default(),
        })
    }

    /// Sets the accept/reject rule.
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    /// Loader registered with the [`EvolverManager`].
    pub fn from_store(
        group: &Group,
        _manager: &EvolverManager,
        ctx: &LoadContext,
    ) -> Result<Box<dyn Evolver>, HmcError> {
        let evolver = Self::new(
            Arc::clone(&ctx.action),
            Arc::clone(&ctx.lattice),
            group.read("n_jumps")?,
        )?
        .with_selector(group.read("selector")?);
        Ok(Box::new(evolver))
    }
}

impl Evolver for TwoPiJumps {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn evolve(
        &mut self,
        current: &TrajectoryRecord,
        rng: &mut RngHandle,
    ) -> Result<TrajectoryRecord, HmcError> {
        ensure_length(&current.phi, &self.lattice)?;
        let mut candidate = current.phi.to_vec();
        for site in index::sample(rng.inner_mut(), candidate.len(), self.n_jumps) {
            let shift = if rng.uniform() < 0.5 { -TAU } else { TAU };
            candidate[site] += shift;
        }
        decide(&self.hamiltonian, self.selector, current, candidate, rng)
    }

    fn save(&self, group: &mut Group, _manager: &EvolverManager) -> Result<(), HmcError> {
        group.write("n_jumps", &self.n_jumps)?;
        group.write("selector", &self.selector)
    }
}

/// Shifts the winding number `round(Re φ / 2π)` of `n_sites` distinct sites
/// by a nonzero integer drawn uniformly from `[-max_winding, max_winding]`.
///
/// Shifts `k` and `-k` are equally likely from every state and the fractional
/// part of every site is kept, so the proposal is symmetric.
#[derive(Debug)]
pub struct UniformJump {
    hamiltonian: Hamiltonian,
    lattice: Arc<Lattice>,
    n_sites: usize,
    max_winding: i64,
    selector: Selector,
}

impl UniformJump {
    /// Registered type name.
    pub const TYPE_NAME: &'static str = "UniformJump";

    /// Creates the proposer.
    pub fn new(
        action: Arc<dyn Action>,
        lattice: Arc<Lattice>,
        n_sites: usize,
        max_winding: i64,
    ) -> Result<Self, HmcError> {
        ensure_count(Self::TYPE_NAME, n_sites, &lattice)?;
        if max_winding < 1 {
            return Err(HmcError::Config(
                ErrorInfo::new("invalid-winding", "max_winding must be at least 1")
                    .with_context("max_winding", max_winding.to_string()),
            ));
        }
        Ok(Self {
            hamiltonian: Hamiltonian::new(action),
            lattice,
            n_sites,
            max_winding,
            selector: Selector::default(),
        })
    }

    /// Sets the accept/reject rule.
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    /// Winding number of a single field value, saturating for huge fields.
    pub fn winding(value: Complex64) -> i64 {
        (value.re / TAU).round() as i64
    }

    /// Draws a nonzero winding shift with one generator call.
    fn draw_shift(&self, rng: &mut RngHandle) -> i64 {
        let k = rng.uniform_int(-self.max_winding, self.max_winding - 1);
        if k >= 0 {
            k + 1
        } else {
            k
        }
    }

    /// Loader registered with the [`EvolverManager`].
    pub fn from_store(
        group: &Group,
        _manager: &EvolverManager,
        ctx: &LoadContext,
    ) -> Result<Box<dyn Evolver>, HmcError> {
        let evolver = Self::new(
            Arc::clone(&ctx.action),
            Arc::clone(&ctx.lattice),
            group.read("n_sites")?,
            group.read("max_winding")?,
        )?
        .with_selector(group.read("selector")?);
        Ok(Box::new(evolver))
    }
}

impl Evolver for UniformJump {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn evolve(
        &mut self,
        current: &TrajectoryRecord,
        rng: &mut RngHandle,
    ) -> Result<TrajectoryRecord, HmcError> {
        ensure_length(&current.phi, &self.lattice)?;
        let mut candidate = current.phi.to_vec();
        for site in index::sample(rng.inner_mut(), candidate.len(), self.n_sites) {
            let shift = self.draw_shift(rng);
            candidate[site] += TAU * shift as f64;
        }
        decide(&self.hamiltonian, self.selector, current, candidate, rng)
    }

    fn save(&self, group: &mut Group, _manager: &EvolverManager) -> Result<(), HmcError> {
        group.write("n_sites", &self.n_sites)?;
        group.write("max_winding", &self.max_winding)?;
        group.write("selector", &self.selector)
    }
}
