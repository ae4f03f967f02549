use std::sync::Arc;

use hmc_core::linalg::max_abs_diff;
use hmc_core::{Action, Complex64, Configuration, HubbardGaugeAction};
use hmc_evolve::{AffineTransform, IdentityTransform, Transform};
use proptest::prelude::*;

fn action() -> Arc<dyn Action> {
    Arc::new(HubbardGaugeAction::new(1.3).unwrap())
}

#[test]
fn identity_is_trivial() {
    let transform = IdentityTransform::new(action());
    let phi = Configuration::from_real(&[0.5, -0.25, 1.0]);
    let (mapped, value, log_det) = transform.forward(&phi).unwrap();
    assert_eq!(mapped, phi);
    assert_eq!(log_det, Complex64::new(0.0, 0.0));
    assert_eq!(value, action().eval(&phi).unwrap());
    assert!(transform.exact_inverse());
}

#[test]
fn affine_log_det_is_constant() {
    let transform = AffineTransform::new(action(), 2.0, Complex64::new(0.0, 0.5)).unwrap();
    let phi = Configuration::from_real(&[0.1, 0.2, 0.3, 0.4]);
    let (_, _, log_det) = transform.forward(&phi).unwrap();
    assert!((log_det.re - 4.0 * 2.0_f64.ln()).abs() < 1e-12);
    assert_eq!(log_det.im, 0.0);
}

#[test]
fn affine_rejects_invalid_scale() {
    assert!(AffineTransform::new(action(), 0.0, Complex64::new(0.0, 0.0)).is_err());
    assert!(AffineTransform::new(action(), -1.0, Complex64::new(0.0, 0.0)).is_err());
}

proptest! {
    #[test]
    fn backward_inverts_forward(
        scale in 0.1f64..10.0,
        shift_re in -5.0f64..5.0,
        shift_im in -5.0f64..5.0,
        values in prop::collection::vec(-10.0f64..10.0, 1..12),
    ) {
        let transform = AffineTransform::new(action(), scale, Complex64::new(shift_re, shift_im)).unwrap();
        let phi = Configuration::from_real(&values);

        let (mapped, value, forward_log_det) = transform.forward(&phi).unwrap();
        let (back, backward_log_det) = transform.backward(&mapped).unwrap();

        prop_assert!(max_abs_diff(&back, &phi) < 1e-9);
        prop_assert!((forward_log_det - backward_log_det).norm() < 1e-9);
        prop_assert!((value - action().eval(&mapped).unwrap()).norm() < 1e-9);
    }
}
