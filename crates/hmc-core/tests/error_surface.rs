use hmc_core::errors::{ErrorInfo, HmcError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("itr", "7")
        .with_context("reason", "example")
}

#[test]
fn numerical_error_surface() {
    let err = HmcError::NumericalInstability(sample_info("N001", "action is NaN"));
    assert_eq!(err.info().code, "N001");
    assert!(err.info().context.contains_key("itr"));
    assert!(err.to_string().starts_with("numerical instability"));
}

#[test]
fn unknown_evolver_surface() {
    let err = HmcError::UnknownEvolverType(sample_info("E001", "not registered"));
    assert_eq!(err.info().code, "E001");
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn broken_reference_surface() {
    let err = HmcError::BrokenReference(sample_info("L001", "dangling link"));
    assert_eq!(err.info().code, "L001");
}

#[test]
fn sanity_check_surface() {
    let err = HmcError::SanityCheck(sample_info("S001", "complex action"));
    assert_eq!(err.info().code, "S001");
}

#[test]
fn store_collision_surface() {
    let err = HmcError::StoreCollision(sample_info("C001", "exists"));
    assert_eq!(err.info().code, "C001");
}

#[test]
fn hint_is_rendered() {
    let err = HmcError::Config(
        ErrorInfo::new("X001", "bad frequency").with_hint("use a frequency of at least 1"),
    );
    let rendered = err.to_string();
    assert!(rendered.contains("bad frequency"));
    assert!(rendered.contains("at least 1"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = HmcError::UnknownTransformType(sample_info("T001", "missing"));
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["family"], "UnknownTransformType");
    assert_eq!(json["detail"]["code"], "T001");
    let decoded: HmcError = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, err);
}
