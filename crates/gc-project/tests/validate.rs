use gc_project::*;
use std::path::Path;

fn shipped() -> Scenario {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios/two_points.yaml");
    load_yaml(&path).unwrap()
}

#[test]
fn coupling_point_must_name_a_network_node() {
    let mut s = shipped();
    s.coupling.points[0].gas_node = "N99".to_string();
    assert!(matches!(
        validate_scenario(&s),
        Err(ValidationError::MissingReference { .. })
    ));
}

#[test]
fn duplicate_peer_node_rejected() {
    let mut s = shipped();
    s.coupling.points[1].peer_node = 6;
    assert!(matches!(
        validate_scenario(&s),
        Err(ValidationError::DuplicateId { .. })
    ));
}

#[test]
fn demand_for_uncoupled_bus_rejected() {
    let mut s = shipped();
    s.peer.demands[0].node = 42;
    assert!(matches!(
        validate_scenario(&s),
        Err(ValidationError::MissingReference { .. })
    ));
}

#[test]
fn inverted_flow_limits_rejected() {
    let mut s = shipped();
    s.flow_limits = Some(FlowLimitsDef {
        min_m3_s: 10.0,
        max_m3_s: 5.0,
    });
    assert!(matches!(
        validate_scenario(&s),
        Err(ValidationError::InvalidValue { .. })
    ));
}

#[test]
fn zero_window_and_horizon_rejected() {
    let mut s = shipped();
    s.coupling.history_window = 0;
    assert!(validate_scenario(&s).is_err());

    let mut s = shipped();
    s.coupling.horizon = 0;
    assert!(validate_scenario(&s).is_err());
}

#[test]
fn future_version_rejected() {
    let mut s = shipped();
    s.version = LATEST_VERSION + 1;
    assert!(matches!(
        validate_scenario(&s),
        Err(ValidationError::UnsupportedVersion { .. })
    ));
}

#[test]
fn non_finite_heat_rate_rejected() {
    let mut s = shipped();
    s.heat_rate.hr1 = f64::NAN;
    assert!(validate_scenario(&s).is_err());
}

#[test]
fn repeat_budget_must_cover_iteration_limit() {
    let mut s = shipped();
    s.federate.max_iterations = 20;
    s.network.max_repeats_per_step = 19;
    assert!(matches!(
        validate_scenario(&s),
        Err(ValidationError::InvalidValue { field, .. }) if field == "network.max_repeats_per_step"
    ));

    s.network.max_repeats_per_step = 20;
    assert!(validate_scenario(&s).is_ok());
}
