//! Action and Hamiltonian collaborators.

use std::fmt;
use std::sync::Arc;

use num_complex::Complex64;

use crate::errors::{ErrorInfo, HmcError};
use crate::linalg;
use crate::rng::RngHandle;

/// Action functional evaluated on a field configuration.
///
/// `force` returns `-∂S/∂φ`. Implementations may report
/// [`HmcError::NumericalInstability`] themselves; [`Hamiltonian`] additionally
/// validates every value it hands out.
pub trait Action: fmt::Debug + Send + Sync {
    /// Evaluates the action.
    fn eval(&self, phi: &[Complex64]) -> Result<Complex64, HmcError>;

    /// Computes the force `-∂S/∂φ`.
    fn force(&self, phi: &[Complex64]) -> Result<Vec<Complex64>, HmcError>;

    /// Evaluates the action and the force in one pass.
    fn val_force(&self, phi: &[Complex64]) -> Result<(Complex64, Vec<Complex64>), HmcError> {
        Ok((self.eval(phi)?, self.force(phi)?))
    }
}

/// Pure gauge action of the Hubbard model, `S = Σ φ² / (2Ũ)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HubbardGaugeAction {
    utilde: f64,
}

impl HubbardGaugeAction {
    /// Creates the action for the coupling `Ũ > 0`.
    pub fn new(utilde: f64) -> Result<Self, HmcError> {
        if !(utilde.is_finite() && utilde > 0.0) {
            return Err(HmcError::Config(
                ErrorInfo::new("invalid-utilde", "Ũ must be positive and finite")
                    .with_context("utilde", utilde.to_string()),
            ));
        }
        Ok(Self { utilde })
    }

    /// Returns `Ũ`.
    pub fn utilde(&self) -> f64 {
        self.utilde
    }
}

impl Action for HubbardGaugeAction {
    fn eval(&self, phi: &[Complex64]) -> Result<Complex64, HmcError> {
        let sum: Complex64 = phi.iter().map(|value| *value * *value).sum();
        Ok(sum / (2.0 * self.utilde))
    }

    fn force(&self, phi: &[Complex64]) -> Result<Vec<Complex64>, HmcError> {
        Ok(phi.iter().map(|value| -*value / self.utilde).collect())
    }
}

/// Sum of several actions.
#[derive(Debug, Clone, Default)]
pub struct SumAction {
    terms: Vec<Arc<dyn Action>>,
}

impl SumAction {
    /// Creates an empty sum (which evaluates to zero).
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a term.
    pub fn with_term(mut self, term: Arc<dyn Action>) -> Self {
        self.terms.push(term);
        self
    }
}

impl Action for SumAction {
    fn eval(&self, phi: &[Complex64]) -> Result<Complex64, HmcError> {
        let mut total = Complex64::new(0.0, 0.0);
        for term in &self.terms {
            total += term.eval(phi)?;
        }
        Ok(total)
    }

    fn force(&self, phi: &[Complex64]) -> Result<Vec<Complex64>, HmcError> {
        let mut total = vec![Complex64::new(0.0, 0.0); phi.len()];
        for term in &self.terms {
            let force = term.force(phi)?;
            for (acc, value) in total.iter_mut().zip(force) {
                *acc += value;
            }
        }
        Ok(total)
    }
}

/// Hamiltonian `H = S(φ) + Σ |π|² / 2` of the molecular dynamics.
#[derive(Debug, Clone)]
pub struct Hamiltonian {
    action: Arc<dyn Action>,
}

impl Hamiltonian {
    /// Wraps an action with the standard Gaussian kinetic term.
    pub fn new(action: Arc<dyn Action>) -> Self {
        Self { action }
    }

    /// Returns the potential term.
    pub fn action(&self) -> &Arc<dyn Action> {
        &self.action
    }

    /// Evaluates the action and rejects non-finite values.
    pub fn eval_action(&self, phi: &[Complex64]) -> Result<Complex64, HmcError> {
        let value = self.action.eval(phi)?;
        ensure_finite_action(value)?;
        Ok(value)
    }

    /// Computes the force and rejects non-finite components.
    pub fn force(&self, phi: &[Complex64]) -> Result<Vec<Complex64>, HmcError> {
        let force = self.action.force(phi)?;
        ensure_finite_force(&force)?;
        Ok(force)
    }

    /// Evaluates action and force together, rejecting non-finite results.
    pub fn val_force(&self, phi: &[Complex64]) -> Result<(Complex64, Vec<Complex64>), HmcError> {
        let (value, force) = self.action.val_force(phi)?;
        ensure_finite_action(value)?;
        ensure_finite_force(&force)?;
        Ok((value, force))
    }

    /// Kinetic energy `Σ |π|² / 2`.
    pub fn kinetic(&self, pi: &[Complex64]) -> f64 {
        linalg::norm_sq(pi) / 2.0
    }

    /// Total energy given the action value at the current configuration.
    pub fn energy(&self, action: Complex64, pi: &[Complex64]) -> Complex64 {
        action + self.kinetic(pi)
    }

    /// Samples conjugate momenta from the kinetic term (real standard normal).
    pub fn sample_momentum(&self, len: usize, rng: &mut RngHandle) -> Vec<Complex64> {
        rng.normal_vec(len)
            .into_iter()
            .map(|re| Complex64::new(re, 0.0))
            .collect()
    }
}

/// Fails with [`HmcError::NumericalInstability`] if `value` is not finite.
pub fn ensure_finite_action(value: Complex64) -> Result<(), HmcError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(HmcError::NumericalInstability(
            ErrorInfo::new("non-finite-action", "action evaluated to a non-finite value")
                .with_context("action", value.to_string()),
        ))
    }
}

fn ensure_finite_force(force: &[Complex64]) -> Result<(), HmcError> {
    match force.iter().position(|value| !value.is_finite()) {
        Some(site) => Err(HmcError::NumericalInstability(
            ErrorInfo::new("non-finite-force", "force has a non-finite component")
                .with_context("site", site.to_string()),
        )),
        None => Ok(()),
    }
}
