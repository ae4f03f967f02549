use std::fmt;
use std::sync::Arc;

use hmc_core::errors::ErrorInfo;
use hmc_core::{ensure_finite_action, Action, Complex64, Configuration, Group, HmcError};

use crate::evolver::LoadContext;
use crate::manager::EvolverManager;

/// Change of variables between the proposal manifold and the Monte-Carlo manifold.
pub trait Transform: fmt::Debug + Send {
    /// Stable name under which the type is registered with an [`EvolverManager`].
    fn type_name(&self) -> &'static str;

    /// Maps a configuration from the proposal manifold to the MC manifold.
    ///
    /// Returns the new configuration, the action evaluated there and
    /// `log det J` of this map.
    fn forward(
        &self,
        phi: &Configuration,
    ) -> Result<(Configuration, Complex64, Complex64), HmcError>;

    /// Maps a configuration from the MC manifold back to the proposal manifold.
    ///
    /// The returned log-determinant is that of the *forward* map evaluated at
    /// the returned proposal point, so both legs of a round trip report the
    /// same quantity.
    fn backward(&self, phi: &Configuration) -> Result<(Configuration, Complex64), HmcError>;

    /// Whether `backward ∘ forward` is the identity up to rounding.
    fn exact_inverse(&self) -> bool;

    /// Writes the parameters of the transform into `group`.
    fn save(&self, group: &mut Group, manager: &EvolverManager) -> Result<(), HmcError>;
}

/// Leaves configurations untouched.
#[derive(Debug, Clone)]
pub struct IdentityTransform {
    action: Arc<dyn Action>,
}

impl IdentityTransform {
    /// Registered type name.
    pub const TYPE_NAME: &'static str = "IdentityTransform";

    /// Creates the transform.
    pub fn new(action: Arc<dyn Action>) -> Self {
        Self { action }
    }

    /// Loader registered with the [`EvolverManager`].
    pub fn from_store(
        _group: &Group,
        _manager: &EvolverManager,
        ctx: &LoadContext,
    ) -> Result<Box<dyn Transform>, HmcError> {
        Ok(Box::new(Self::new(Arc::clone(&ctx.action))))
    }
}

impl Transform for IdentityTransform {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn forward(
        &self,
        phi: &Configuration,
    ) -> Result<(Configuration, Complex64, Complex64), HmcError> {
        let action = self.action.eval(phi)?;
        ensure_finite_action(action)?;
        Ok((phi.clone(), action, Complex64::new(0.0, 0.0)))
    }

    fn backward(&self, phi: &Configuration) -> Result<(Configuration, Complex64), HmcError> {
        Ok((phi.clone(), Complex64::new(0.0, 0.0)))
    }

    fn exact_inverse(&self) -> bool {
        true
    }

    fn save(&self, _group: &mut Group, _manager: &EvolverManager) -> Result<(), HmcError> {
        Ok(())
    }
}

/// Affine map `φ_mc = scale · φ_p + shift`.
///
/// An imaginary `shift` moves the integration contour into the complex plane,
/// `scale` rescales the proposal variables. The inverse is exact up to
/// rounding and `log det J = N ln(scale)` is independent of the configuration.
#[derive(Debug, Clone)]
pub struct AffineTransform {
    action: Arc<dyn Action>,
    scale: f64,
    shift: Complex64,
}

impl AffineTransform {
    /// Registered type name.
    pub const TYPE_NAME: &'static str = "AffineTransform";

    /// Creates the transform; `scale` must be positive and finite.
    pub fn new(action: Arc<dyn Action>, scale: f64, shift: Complex64) -> Result<Self, HmcError> {
        if !(scale.is_finite() && scale > 0.0) || !shift.is_finite() {
            return Err(HmcError::Config(
                ErrorInfo::new("invalid-affine", "affine transform needs finite scale > 0 and finite shift")
                    .with_context("scale", scale.to_string())
                    .with_context("shift", shift.to_string()),
            ));
        }
        Ok(Self {
            action,
            scale,
            shift,
        })
    }

    /// Scale factor.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Constant shift.
    pub fn shift(&self) -> Complex64 {
        self.shift
    }

    fn log_det_j(&self, len: usize) -> Complex64 {
        Complex64::new(len as f64 * self.scale.ln(), 0.0)
    }

    /// Loader registered with the [`EvolverManager`].
    pub fn from_store(
        group: &Group,
        _manager: &EvolverManager,
        ctx: &LoadContext,
    ) -> Result<Box<dyn Transform>, HmcError> {
        let scale: f64 = group.read("scale")?;
        let shift: Complex64 = group.read("shift")?;
        Ok(Box::new(Self::new(Arc::clone(&ctx.action), scale, shift)?))
    }
}

impl Transform for AffineTransform {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn forward(
        &self,
        phi: &Configuration,
    ) -> Result<(Configuration, Complex64, Complex64), HmcError> {
        let mapped: Configuration = phi
            .iter()
            .map(|value| *value * self.scale + self.shift)
            .collect::<Vec<_>>()
            .into();
        let action = self.action.eval(&mapped)?;
        ensure_finite_action(action)?;
        Ok((mapped, action, self.log_det_j(phi.len())))
    }

    fn backward(&self, phi: &Configuration) -> Result<(Configuration, Complex64), HmcError> {
        let mapped: Configuration = phi
            .iter()
            .map(|value| (*value - self.shift) / self.scale)
            .collect::<Vec<_>>()
            .into();
        Ok((mapped, self.log_det_j(phi.len())))
    }

    fn exact_inverse(&self) -> bool {
        true
    }

    fn save(&self, group: &mut Group, _manager: &EvolverManager) -> Result<(), HmcError> {
        group.write("scale", &self.scale)?;
        group.write("shift", &self.shift)
    }
}
