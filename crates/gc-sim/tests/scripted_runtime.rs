//! Step-level checks against a scripted runtime.

use std::collections::VecDeque;

use chrono::NaiveDate;

use gc_coupling::{AllowEntry, CouplingRegistry, RegistryConfig};
use gc_network::{SolverEvent, SolverState, SurrogateConfig, SurrogateNetwork, SurrogateNode};
use gc_runtime::{
    CosimRuntime, Grant, IterationRequest, IterationResult, PublicationHandle, RuntimeResult,
    SubscriptionHandle, ValueType,
};
use gc_network::{ControlKind, NetworkAccess};
use gc_sim::{CoordinatorConfig, Phase, SimError, TimeStepCoordinator};
use gc_solver::{FlowLimits, InverterConfig};

/// Grants an iteration whenever one is forced; reads a fixed value.
#[derive(Default)]
struct ScriptedRuntime {
    required: f64,
    /// Answers every time request with `NextStep`, forced or not.
    never_iterate: bool,
    /// How many handshake attempts report `Iterating` before `NextStep`.
    handshake_iterating: u32,
    handshake_calls: u32,
    entered_plain_executing: bool,
    grant_times: VecDeque<f64>,
    requests: Vec<(f64, IterationRequest)>,
    published: Vec<f64>,
    publications: usize,
    subscriptions: usize,
    finalized: bool,
}

impl CosimRuntime for ScriptedRuntime {
    fn set_time_period(&mut self, _period: f64) -> RuntimeResult<()> {
        Ok(())
    }
    fn time_period(&self) -> RuntimeResult<f64> {
        Ok(1.0)
    }
    fn set_max_iterations(&mut self, _max_iterations: u32) -> RuntimeResult<()> {
        Ok(())
    }
    fn max_iterations(&self) -> RuntimeResult<u32> {
        Ok(20)
    }
    fn enter_initializing_mode(&mut self) -> RuntimeResult<()> {
        Ok(())
    }
    fn enter_executing_mode(&mut self) -> RuntimeResult<()> {
        self.entered_plain_executing = true;
        Ok(())
    }
    fn enter_executing_mode_iterative(
        &mut self,
        _request: IterationRequest,
    ) -> RuntimeResult<IterationResult> {
        self.handshake_calls += 1;
        if self.handshake_calls <= self.handshake_iterating {
            Ok(IterationResult::Iterating)
        } else {
            Ok(IterationResult::NextStep)
        }
    }
    fn request_time(&mut self, time: f64) -> RuntimeResult<f64> {
        Ok(self
            .request_time_iterative(time, IterationRequest::NoIteration)?
            .time)
    }
    fn request_time_iterative(
        &mut self,
        time: f64,
        request: IterationRequest,
    ) -> RuntimeResult<Grant> {
        self.requests.push((time, request));
        let status = match request {
            IterationRequest::ForceIteration if !self.never_iterate => IterationResult::Iterating,
            _ => IterationResult::NextStep,
        };
        Ok(Grant {
            time: self.grant_times.pop_front().unwrap_or(time),
            status,
        })
    }
    fn register_publication(
        &mut self,
        _name: &str,
        _value_type: ValueType,
        _unit: &str,
    ) -> RuntimeResult<PublicationHandle> {
        self.publications += 1;
        Ok(PublicationHandle(self.publications - 1))
    }
    fn register_subscription(
        &mut self,
        _name: &str,
        _unit: &str,
    ) -> RuntimeResult<SubscriptionHandle> {
        self.subscriptions += 1;
        Ok(SubscriptionHandle(self.subscriptions - 1))
    }
    fn publish_double(&mut self, _handle: PublicationHandle, value: f64) -> RuntimeResult<()> {
        self.published.push(value);
        Ok(())
    }
    fn read_double(&mut self, _handle: SubscriptionHandle) -> RuntimeResult<f64> {
        Ok(self.required)
    }
    fn finalize(&mut self) -> RuntimeResult<()> {
        self.finalized = true;
        Ok(())
    }
}

fn network() -> SurrogateNetwork {
    SurrogateNetwork::new(SurrogateConfig {
        start_time: NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        time_step_s: 3600.0,
        steps: 2,
        nodes: vec![SurrogateNode {
            name: "N15".to_string(),
            supply_pressure_bar: 70.0,
            min_pressure_bar: 0.0,
            gcv_mj_per_m3: 40.0,
            base_flow_m3_s: 1.0,
            resistance: 0.01,
        }],
        max_repeats_per_step: 50,
    })
    .unwrap()
}

fn coordinator(
    net: &mut SurrogateNetwork,
    mut rt: ScriptedRuntime,
    config: CoordinatorConfig,
) -> TimeStepCoordinator<ScriptedRuntime> {
    let allow = vec![AllowEntry {
        gas_node: "N15".to_string(),
        peer_node: 6,
    }];
    let registry = CouplingRegistry::build(&RegistryConfig::default(), &allow, &mut rt, net).unwrap();
    let mut coord = TimeStepCoordinator::new(config, rt, registry).unwrap();
    coord.initialize(net).unwrap();
    coord
}

/// Fire one `AfterStep`; returns the repeat flag.
fn after(
    coord: &mut TimeStepCoordinator<ScriptedRuntime>,
    net: &mut SurrogateNetwork,
    step: usize,
) -> Result<bool, SimError> {
    let mut ev = SolverEvent::new(SolverState::AfterStep, step);
    coord.after_step(&mut ev, net)?;
    Ok(ev.repeat())
}

fn before(coord: &mut TimeStepCoordinator<ScriptedRuntime>, net: &mut SurrogateNetwork, step: usize) {
    let mut ev = SolverEvent::new(SolverState::BeforeStep, step);
    coord.before_step(&mut ev, net).unwrap();
}

#[test]
fn forced_violation_records_one_divergence_at_max() {
    let mut net = network();
    let rt = ScriptedRuntime {
        required: 100.0,
        ..ScriptedRuntime::default()
    };
    let config = CoordinatorConfig {
        max_iterations: 20,
        flow_limits: Some(FlowLimits::new(0.0, 2.0).unwrap()),
        ..CoordinatorConfig::default()
    };
    let mut coord = coordinator(&mut net, rt, config);

    before(&mut coord, &mut net, 0);
    assert!(!after(&mut coord, &mut net, 0).unwrap());
    assert!(coord.runtime().requests.is_empty());

    before(&mut coord, &mut net, 1);
    let mut repeats = 0;
    while after(&mut coord, &mut net, 1).unwrap() {
        repeats += 1;
        assert!(repeats <= 20);
    }
    assert_eq!(repeats, 20);
    assert_eq!(coord.iteration(), 20);

    let divergences = coord.log().divergences();
    assert_eq!(divergences.len(), 1);
    assert_eq!(divergences[0].step, 1);
    assert_eq!(divergences[0].iterations_at_abort, 20);

    let requests = &coord.runtime().requests;
    assert_eq!(requests.len(), 21);
    assert!(requests[..20]
        .iter()
        .all(|r| *r == (1.0, IterationRequest::ForceIteration)));
    assert_eq!(requests[20], (1.0, IterationRequest::NoIteration));

    // The next step starts clean.
    before(&mut coord, &mut net, 2);
    assert_eq!(coord.iteration(), 0);
    assert!(coord.violation());
    assert!(coord.registry().point(0).unwrap().history(0).unwrap().is_empty());
}

#[test]
fn placeholder_required_values_let_the_step_advance() {
    let mut net = network();
    let rt = ScriptedRuntime {
        required: -1.0,
        ..ScriptedRuntime::default()
    };
    let mut coord = coordinator(&mut net, rt, CoordinatorConfig::default());

    before(&mut coord, &mut net, 1);
    assert!(after(&mut coord, &mut net, 1).unwrap());
    assert!(!coord.violation());
    assert!(!after(&mut coord, &mut net, 1).unwrap());
    assert_eq!(
        coord.runtime().requests,
        vec![
            (1.0, IterationRequest::ForceIteration),
            (1.0, IterationRequest::NoIteration)
        ]
    );
    assert!(coord.log().divergences().is_empty());
    assert_eq!(coord.log().record(1).unwrap().iterations, 1);
}

#[test]
fn required_value_becomes_flow_setpoint() {
    let mut net = network();
    let rt = ScriptedRuntime {
        required: 100.0,
        ..ScriptedRuntime::default()
    };
    let mut coord = coordinator(&mut net, rt, CoordinatorConfig::default());

    before(&mut coord, &mut net, 1);
    after(&mut coord, &mut net, 1).unwrap();

    let ts = net.clock().timestamp(1).unwrap();
    let ev = net.events().find("N15", ControlKind::Qset, ts).unwrap();
    // HR(100) = 22.5 MJ/kWh, so 625 MW thermal over 40 MJ/m³.
    assert!((ev.value - 15.625).abs() < 1e-9);
    assert!(ev.active);
    assert_eq!(ev.info, "cosim");
    assert_eq!(ev.unit, "sm3/s");
}

#[test]
fn decreasing_grant_is_an_invariant_error() {
    let mut net = network();
    let rt = ScriptedRuntime {
        required: 100.0,
        grant_times: VecDeque::from([5.0, 1.0]),
        ..ScriptedRuntime::default()
    };
    let mut coord = coordinator(&mut net, rt, CoordinatorConfig::default());

    before(&mut coord, &mut net, 1);
    after(&mut coord, &mut net, 1).unwrap();
    assert!(matches!(
        after(&mut coord, &mut net, 1),
        Err(SimError::Invariant { .. })
    ));
}

#[test]
fn finalize_requests_past_the_last_step() {
    let mut net = network();
    let rt = ScriptedRuntime {
        required: -1.0,
        ..ScriptedRuntime::default()
    };
    let mut coord = coordinator(&mut net, rt, CoordinatorConfig::default());
    let summary = coord.finalize(&net).unwrap();
    assert_eq!(summary.total, 0);
    assert!(coord.runtime().finalized);
    assert_eq!(
        coord.runtime().requests.last(),
        Some(&(3.0, IterationRequest::NoIteration))
    );
}

#[test]
fn steps_before_initialize_are_rejected() {
    let mut net = network();
    let mut rt = ScriptedRuntime::default();
    let registry =
        CouplingRegistry::build(&RegistryConfig::default(), &[], &mut rt, &mut net).unwrap();
    let mut coord = TimeStepCoordinator::new(CoordinatorConfig::default(), rt, registry).unwrap();
    let mut ev = SolverEvent::new(SolverState::BeforeStep, 0);
    assert!(matches!(
        coord.before_step(&mut ev, &mut net),
        Err(SimError::InvalidPhase { .. })
    ));
}

#[test]
fn advancing_grant_refreshes_the_violation_flag() {
    let mut net = network();
    let rt = ScriptedRuntime {
        required: -1.0,
        never_iterate: true,
        ..ScriptedRuntime::default()
    };
    let mut coord = coordinator(&mut net, rt, CoordinatorConfig::default());

    before(&mut coord, &mut net, 1);
    assert!(coord.violation());
    assert!(!after(&mut coord, &mut net, 1).unwrap());
    assert_eq!(
        coord.runtime().requests,
        vec![(1.0, IterationRequest::ForceIteration)]
    );
    assert!(!coord.violation());
    assert_eq!(coord.log().record(1).unwrap().iterations, 0);
}

#[test]
fn handshake_retries_while_the_runtime_iterates() {
    let mut net = network();
    let rt = ScriptedRuntime {
        required: 100.0,
        handshake_iterating: 3,
        ..ScriptedRuntime::default()
    };
    let coord = coordinator(&mut net, rt, CoordinatorConfig::default());

    let rt = coord.runtime();
    assert_eq!(rt.handshake_calls, 4);
    assert!(!rt.entered_plain_executing);
    // Initial publish plus one per retry.
    assert_eq!(rt.published.len(), 4);
    assert_eq!(coord.iteration(), 0);
    assert_eq!(coord.phase(), Phase::Stepping);

    let ts = net.clock().timestamp(0).unwrap();
    let ev = net.events().find("N15", ControlKind::Qset, ts).unwrap();
    assert!(ev.active);
    assert!((ev.value - 15.625).abs() < 1e-9);
}

#[test]
fn handshake_ignores_placeholder_values() {
    let mut net = network();
    let rt = ScriptedRuntime {
        required: -1.0,
        handshake_iterating: 2,
        ..ScriptedRuntime::default()
    };
    let coord = coordinator(&mut net, rt, CoordinatorConfig::default());

    assert_eq!(coord.runtime().handshake_calls, 3);
    assert_eq!(coord.runtime().published.len(), 3);
    let ts = net.clock().timestamp(0).unwrap();
    let ev = net.events().find("N15", ControlKind::Qset, ts).unwrap();
    assert!(!ev.active);
    assert_eq!(ev.value, 0.0);
}

#[test]
fn unsettled_handshake_falls_back_to_plain_executing_mode() {
    let mut net = network();
    let rt = ScriptedRuntime {
        required: -1.0,
        handshake_iterating: u32::MAX,
        ..ScriptedRuntime::default()
    };
    let config = CoordinatorConfig {
        max_iterations: 5,
        ..CoordinatorConfig::default()
    };
    let coord = coordinator(&mut net, rt, config);

    let rt = coord.runtime();
    assert_eq!(rt.handshake_calls, 5);
    assert!(rt.entered_plain_executing);
    assert_eq!(rt.published.len(), 6);
    assert_eq!(coord.iteration(), 0);
    assert_eq!(coord.phase(), Phase::Stepping);
}

#[test]
fn unconverged_inversion_still_publishes_last_iterate() {
    let mut net = network();
    let rt = ScriptedRuntime {
        required: -1.0,
        ..ScriptedRuntime::default()
    };
    let config = CoordinatorConfig {
        inverter: InverterConfig {
            max_iterations: 1,
            ..InverterConfig::default()
        },
        ..CoordinatorConfig::default()
    };
    let mut coord = coordinator(&mut net, rt, config);

    before(&mut coord, &mut net, 1);
    after(&mut coord, &mut net, 1).unwrap();
    let published = &coord.runtime().published;
    assert_eq!(published.len(), 2);
    assert!(published.iter().all(|v| v.is_finite() && *v > 0.0));
}
