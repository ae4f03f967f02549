use hmc_core::errors::ErrorInfo;
use hmc_core::{Complex64, HmcError, RngHandle};
use serde::{Deserialize, Serialize};

/// Accept/reject rule applied at the end of every proposal.
///
/// Every variant consumes exactly one uniform draw per call so the RNG stream
/// stays aligned when selectors are swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Selector {
    /// Metropolis criterion `u < min(1, exp(-Δ))`.
    #[default]
    Metropolis,
    /// Accepts every proposal (debugging only, breaks detailed balance).
    AcceptAll,
}

impl Selector {
    /// Probability of accepting `proposed` over `start`.
    ///
    /// `Δ = Re(proposed - start) - Re(log_det_j)` where `log_det_j` is the
    /// Jacobian correction of the proposal.
    pub fn acceptance_probability(
        &self,
        start: Complex64,
        proposed: Complex64,
        log_det_j: Complex64,
    ) -> Result<f64, HmcError> {
        if !(start.is_finite() && proposed.is_finite() && log_det_j.is_finite()) {
            return Err(HmcError::NumericalInstability(
                ErrorInfo::new("non-finite-weight", "cannot select with non-finite weights")
                    .with_context("start", start.to_string())
                    .with_context("proposed", proposed.to_string())
                    .with_context("log_det_j", log_det_j.to_string()),
            ));
        }
        match self {
            Selector::Metropolis => {
                let delta = (proposed - start).re - log_det_j.re;
                Ok((-delta).exp().min(1.0))
            }
            Selector::AcceptAll => Ok(1.0),
        }
    }

    /// Draws one uniform number and decides acceptance.
    pub fn select(
        &self,
        start: Complex64,
        proposed: Complex64,
        log_det_j: Complex64,
        rng: &mut RngHandle,
    ) -> Result<bool, HmcError> {
        let acceptance = self.acceptance_probability(start, proposed, log_det_j)?;
        let draw = rng.uniform();
        Ok(draw < acceptance)
    }
}
