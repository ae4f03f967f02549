use hmc_core::errors::ErrorInfo;
use hmc_core::{HmcError, TrajectoryRecord};

/// Largest imaginary part of the action tolerated by [`reality_check`].
pub const REALITY_TOLERANCE: f64 = 1e-10;

/// Fails with [`HmcError::SanityCheck`] if the action has picked up an
/// imaginary part.
pub fn reality_check(record: &TrajectoryRecord) -> Result<(), HmcError> {
    if record.action.im.abs() > REALITY_TOLERANCE {
        return Err(HmcError::SanityCheck(
            ErrorInfo::new("complex-action", "action has a non-negligible imaginary part")
                .with_context("action", record.action.to_string())
                .with_context("tolerance", REALITY_TOLERANCE.to_string()),
        ));
    }
    Ok(())
}

/// Fails with [`HmcError::NumericalInstability`] if the field or the action is
/// not finite.
pub fn finiteness_check(record: &TrajectoryRecord) -> Result<(), HmcError> {
    if !record.action.is_finite() || !record.phi.is_finite() {
        return Err(HmcError::NumericalInstability(
            ErrorInfo::new("non-finite-record", "trajectory record is not finite")
                .with_context("action", record.action.to_string())
                .with_context("traj_point", record.traj_point.to_string()),
        ));
    }
    Ok(())
}
