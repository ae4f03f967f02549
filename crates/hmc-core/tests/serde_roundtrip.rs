use hmc_core::{Complex64, Configuration, TrajectoryRecord};
use proptest::prelude::*;

#[test]
fn trajectory_record_uses_traj_point_key() {
    let record = TrajectoryRecord::new(
        Configuration::from_real(&[0.25, -1.5]),
        Complex64::new(2.0, 0.0),
        -10,
    );
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["trajPoint"], -10);
    assert_eq!(json["phi"][1][0], -1.5);

    let decoded: TrajectoryRecord = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, record);
    assert!(decoded.accepted());
    assert!(!decoded.rejected().accepted());
}

#[test]
fn configuration_clones_share_storage() {
    let phi = Configuration::from_real(&[1.0, 2.0, 3.0]);
    let copy = phi.clone();
    assert_eq!(phi.as_slice().as_ptr(), copy.as_slice().as_ptr());
    assert_eq!(Configuration::zeros(3).len(), 3);
}

proptest! {
    #[test]
    fn configuration_json_is_bit_exact(values in prop::collection::vec((-1e6f64..1e6, -1e6f64..1e6), 1..16)) {
        let phi = Configuration::from_vec(
            values.iter().map(|&(re, im)| Complex64::new(re, im)).collect(),
        );
        let json = serde_json::to_string(&phi).unwrap();
        let decoded: Configuration = serde_json::from_str(&json).unwrap();
        for (a, b) in phi.iter().zip(decoded.iter()) {
            prop_assert_eq!(a.re.to_bits(), b.re.to_bits());
            prop_assert_eq!(a.im.to_bits(), b.im.to_bits());
        }
    }
}
