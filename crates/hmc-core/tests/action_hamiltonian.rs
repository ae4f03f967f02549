use std::sync::Arc;

use hmc_core::errors::HmcError;
use hmc_core::{
    Action, Complex64, Hamiltonian, HubbardGaugeAction, Lattice, RngHandle, SumAction,
};

#[test]
fn gauge_action_matches_closed_form() {
    let action = HubbardGaugeAction::new(2.0).unwrap();
    let phi = vec![Complex64::new(1.0, 0.0), Complex64::new(-3.0, 0.0)];
    let value = action.eval(&phi).unwrap();
    assert!((value.re - 10.0 / 4.0).abs() < 1e-12);
    assert_eq!(value.im, 0.0);

    let force = action.force(&phi).unwrap();
    assert!((force[0].re + 0.5).abs() < 1e-12);
    assert!((force[1].re - 1.5).abs() < 1e-12);
}

#[test]
fn force_is_negative_gradient() {
    let action = HubbardGaugeAction::new(0.7).unwrap();
    let phi = vec![
        Complex64::new(0.3, 0.0),
        Complex64::new(-1.1, 0.0),
        Complex64::new(2.4, 0.0),
    ];
    let force = action.force(&phi).unwrap();
    let h = 1e-6;
    for site in 0..phi.len() {
        let mut up = phi.clone();
        let mut down = phi.clone();
        up[site] += h;
        down[site] -= h;
        let grad = (action.eval(&up).unwrap() - action.eval(&down).unwrap()).re / (2.0 * h);
        assert!((force[site].re + grad).abs() < 1e-6);
    }
}

#[test]
fn invalid_coupling_is_rejected() {
    assert!(matches!(
        HubbardGaugeAction::new(0.0),
        Err(HmcError::Config(_))
    ));
    assert!(matches!(
        HubbardGaugeAction::new(f64::NAN),
        Err(HmcError::Config(_))
    ));
}

#[test]
fn sum_action_adds_terms() {
    let term: Arc<dyn Action> = Arc::new(HubbardGaugeAction::new(1.0).unwrap());
    let sum = SumAction::new()
        .with_term(Arc::clone(&term))
        .with_term(term);
    let phi = vec![Complex64::new(2.0, 0.0)];
    assert!((sum.eval(&phi).unwrap().re - 4.0).abs() < 1e-12);
    assert!((sum.force(&phi).unwrap()[0].re + 4.0).abs() < 1e-12);
    assert_eq!(SumAction::new().eval(&phi).unwrap(), Complex64::new(0.0, 0.0));
}

#[test]
fn hamiltonian_rejects_non_finite_values() {
    let hamiltonian = Hamiltonian::new(Arc::new(HubbardGaugeAction::new(1.0).unwrap()));
    let phi = vec![Complex64::new(f64::INFINITY, 0.0)];
    assert!(matches!(
        hamiltonian.eval_action(&phi),
        Err(HmcError::NumericalInstability(_))
    ));
    assert!(matches!(
        hamiltonian.force(&phi),
        Err(HmcError::NumericalInstability(_))
    ));
}

#[test]
fn momentum_is_real_and_reproducible() {
    let hamiltonian = Hamiltonian::new(Arc::new(HubbardGaugeAction::new(1.0).unwrap()));
    let mut a = RngHandle::from_seed(11);
    let mut b = RngHandle::from_seed(11);
    let pi = hamiltonian.sample_momentum(6, &mut a);
    assert_eq!(pi, hamiltonian.sample_momentum(6, &mut b));
    assert!(pi.iter().all(|value| value.im == 0.0));

    let kinetic: f64 = pi.iter().map(|value| value.re * value.re).sum::<f64>() / 2.0;
    assert!((hamiltonian.kinetic(&pi) - kinetic).abs() < 1e-12);
    let energy = hamiltonian.energy(Complex64::new(1.0, 0.0), &pi);
    assert!((energy.re - 1.0 - kinetic).abs() < 1e-12);
}

#[test]
fn lattice_geometry() {
    let lattice = Lattice::ring(4, 3, 1.0).unwrap();
    assert_eq!(lattice.latt_size(), 12);
    assert_eq!(lattice.index(2, 1), 7);
    assert!(lattice.are_neighbors(0, 2));
    assert!(lattice.are_neighbors(2, 0));
    assert_eq!(lattice.hopping(0, 1), 1.0);

    let mut lattice = lattice;
    lattice.set_neighbor(0, 1, 0.0).unwrap();
    assert!(!lattice.are_neighbors(1, 0));
    assert!(lattice.set_neighbor(0, 3, 1.0).is_err());
    assert!(Lattice::new(0, 2).is_err());
}
