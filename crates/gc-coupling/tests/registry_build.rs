use chrono::NaiveDate;

use gc_coupling::{AllowEntry, CouplingRegistry, RegistryConfig, SampleLine};
use gc_network::{
    ControlKind, NetworkAccess, SurrogateConfig, SurrogateNetwork, SurrogateNode,
};
use gc_runtime::{CosimRuntime, LoopbackConfig, LoopbackRuntime, NodeDemand, TransmissionPeer};

fn node(name: &str) -> SurrogateNode {
    SurrogateNode {
        name: name.to_string(),
        supply_pressure_bar: 60.0,
        min_pressure_bar: 40.0,
        gcv_mj_per_m3: 40.0,
        base_flow_m3_s: 1.0,
        resistance: 0.2,
    }
}

fn network() -> SurrogateNetwork {
    SurrogateNetwork::new(SurrogateConfig {
        start_time: NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        time_step_s: 900.0,
        steps: 4,
        nodes: vec![node("N15"), node("N21"), node("N30")],
        max_repeats_per_step: 50,
    })
    .unwrap()
}

fn runtime() -> LoopbackRuntime {
    let peer = TransmissionPeer::new(
        "transmission",
        "ng1",
        1.0,
        vec![NodeDemand {
            node: 6,
            schedule_mw: vec![100.0],
        }],
    )
    .with_horizon(2);
    LoopbackRuntime::new(LoopbackConfig::default(), Box::new(peer)).unwrap()
}

fn allow() -> Vec<AllowEntry> {
    vec![
        AllowEntry {
            gas_node: "N15".to_string(),
            peer_node: 6,
        },
        AllowEntry {
            gas_node: "N21".to_string(),
            peer_node: 8,
        },
    ]
}

#[test]
fn only_allow_listed_nodes_are_bound() {
    let mut net = network();
    let mut rt = runtime();
    let cfg = RegistryConfig {
        horizon: 2,
        ..RegistryConfig::default()
    };
    let reg = CouplingRegistry::build(&cfg, &allow(), &mut rt, &mut net).unwrap();

    let nodes: Vec<&str> = reg.points().iter().map(|p| p.gas_node()).collect();
    assert_eq!(nodes, vec!["N15", "N21"]);
    assert_eq!(reg.point(1).unwrap().peer_node(), 8);

    rt.enter_initializing_mode().unwrap();
    let p = reg.point(0).unwrap();
    rt.publish_double(p.publication(1).unwrap(), 42.0).unwrap();
    assert_eq!(rt.published_value("ng1/node.6.avail.1"), Some(42.0));
    let subs: Vec<&str> = rt.subscription_names().collect();
    assert!(subs.contains(&"transmission/node.8.requested"));
    assert!(subs.contains(&"transmission/node.8.requested.1"));
}

#[test]
fn placeholders_cover_every_timestamp() {
    let mut net = network();
    let mut rt = runtime();
    CouplingRegistry::build(&RegistryConfig::default(), &allow(), &mut rt, &mut net).unwrap();

    for (_, ts) in net.clock().timestamps() {
        let e = net.events().find("N15", ControlKind::Qset, ts).unwrap();
        assert!(!e.active);
        assert_eq!(e.value, 0.0);
        assert!(net.events().find("N30", ControlKind::Qset, ts).is_none());
    }
    assert_eq!(net.events().len(), 2 * 5);
}

#[test]
fn existing_directive_is_kept() {
    let mut net = network();
    let ts = net.clock().timestamp(2).unwrap();
    let mut e = gc_network::ScenarioEvent::placeholder("N15", ControlKind::Qset, ts, "sm3/s");
    e.value = 3.5;
    e.active = true;
    net.events_mut().insert(e);

    let mut rt = runtime();
    CouplingRegistry::build(&RegistryConfig::default(), &allow(), &mut rt, &mut net).unwrap();
    assert_eq!(
        net.events().active_value("N15", ControlKind::Qset, ts),
        Some(3.5)
    );
}

#[test]
fn record_sample_logs_and_extends_history() {
    let dir = std::env::temp_dir().join("gc_coupling_registry_logs");
    let mut net = network();
    let mut rt = runtime();
    let cfg = RegistryConfig {
        log_dir: Some(dir.clone()),
        ..RegistryConfig::default()
    };
    let mut reg = CouplingRegistry::build(&cfg, &allow(), &mut rt, &mut net).unwrap();

    let line = SampleLine {
        timestamp: net.clock().timestamp(1).unwrap(),
        step: 1,
        iteration: 0,
        pressure_bar: 59.8,
        flow_m3_s: 1.0,
        thermal_power_mw: 40.0,
    };
    reg.record_sample(0, 0, &line, 100.0).unwrap();
    reg.record_sample(0, 0, &line, 101.0).unwrap();
    assert_eq!(reg.point(0).unwrap().history(0).unwrap(), &[100.0, 101.0]);
    assert!(reg.record_sample(0, 1, &line, 1.0).is_err());

    reg.flush_all().unwrap();
    let text = std::fs::read_to_string(dir.join("point_N15.tsv")).unwrap();
    assert_eq!(text.lines().count(), 3);

    reg.clear_histories();
    assert!(reg.point(0).unwrap().history(0).unwrap().is_empty());
}
