//! Scenario definitions -> runnable federation parts.

use std::path::PathBuf;

use gc_coupling::{AllowEntry, ConvergencePolicy, RegistryConfig};
use gc_network::{SurrogateConfig, SurrogateNetwork, SurrogateNode};
use gc_project::Scenario;
use gc_runtime::{LoopbackConfig, LoopbackRuntime, NodeDemand, TransmissionPeer};
use gc_sim::CoordinatorConfig;
use gc_solver::{FlowLimits, HeatRateCurve, InverterConfig};

use crate::error::{AppError, AppResult};

pub fn build_network(scenario: &Scenario) -> AppResult<SurrogateNetwork> {
    let def = &scenario.network;
    let nodes = def
        .nodes
        .iter()
        .map(|n| SurrogateNode {
            name: n.name.clone(),
            supply_pressure_bar: n.supply_pressure_bar,
            min_pressure_bar: n.min_pressure_bar,
            gcv_mj_per_m3: n.gcv_mj_per_m3,
            base_flow_m3_s: n.base_flow_m3_s,
            resistance: n.resistance,
        })
        .collect();
    let network = SurrogateNetwork::new(SurrogateConfig {
        start_time: def.start_time,
        time_step_s: def.time_step_s,
        steps: def.steps,
        nodes,
        max_repeats_per_step: def.max_repeats_per_step,
    })
    .map_err(|e| AppError::Compile(e.to_string()))?;
    Ok(network)
}

/// Loopback federation whose peer requests the scenario's demand schedules.
pub fn build_runtime(scenario: &Scenario) -> AppResult<LoopbackRuntime> {
    let fed = &scenario.federate;
    let demands = scenario
        .peer
        .demands
        .iter()
        .map(|d| NodeDemand {
            node: d.node,
            schedule_mw: d.schedule_mw.clone(),
        })
        .collect();
    let mut peer = TransmissionPeer::new(&fed.peer, &fed.name, fed.time_period, demands)
        .with_horizon(scenario.coupling.horizon);
    if scenario.peer.curtail_on_saturation {
        peer = peer.with_curtailment(scenario.peer.curtail_tolerance);
    }

    let config = LoopbackConfig {
        name: fed.name.clone(),
        time_period: fed.time_period,
        max_iterations: fed.max_iterations,
        ..LoopbackConfig::default()
    };
    LoopbackRuntime::new(config, Box::new(peer)).map_err(|e| AppError::Compile(e.to_string()))
}

pub fn allow_list(scenario: &Scenario) -> Vec<AllowEntry> {
    scenario
        .coupling
        .points
        .iter()
        .map(|p| AllowEntry {
            gas_node: p.gas_node.clone(),
            peer_node: p.peer_node,
        })
        .collect()
}

pub fn registry_config(scenario: &Scenario, log_dir: Option<PathBuf>) -> RegistryConfig {
    let fed = &scenario.federate;
    RegistryConfig {
        domain: fed.name.clone(),
        peer_domain: fed.peer.clone(),
        horizon: scenario.coupling.horizon,
        history_capacity: scenario.coupling.history_window,
        publication_unit: fed.publication_unit.clone(),
        subscription_unit: fed.subscription_unit.clone(),
        setpoint_unit: fed.setpoint_unit.clone(),
        log_dir,
    }
}

pub fn heat_rate_curve(scenario: &Scenario) -> AppResult<HeatRateCurve> {
    let hr = scenario.heat_rate;
    Ok(HeatRateCurve::new(hr.hr0, hr.hr1, hr.hr2)?)
}

pub fn inverter_config(scenario: &Scenario) -> InverterConfig {
    let inv = scenario.inverter;
    InverterConfig {
        max_iterations: inv.max_iterations,
        tolerance: inv.tolerance,
        zero_derivative_step: inv.zero_derivative_step,
    }
}

pub fn coordinator_config(scenario: &Scenario) -> AppResult<CoordinatorConfig> {
    let policy = ConvergencePolicy::new(scenario.coupling.epsilon, scenario.coupling.history_window)?;
    let flow_limits = scenario
        .flow_limits
        .map(|l| FlowLimits::new(l.min_m3_s, l.max_m3_s))
        .transpose()?;
    Ok(CoordinatorConfig {
        max_iterations: scenario.federate.max_iterations,
        time_period: scenario.federate.time_period,
        policy,
        curve: heat_rate_curve(scenario)?,
        inverter: inverter_config(scenario),
        flow_limits,
        initial_efficiency: scenario.initial_efficiency,
        ..CoordinatorConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn scenario() -> Scenario {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios/capped_offtake.yaml");
        gc_project::load_yaml(&path).unwrap()
    }

    #[test]
    fn coordinator_config_carries_scenario_values() {
        let cfg = coordinator_config(&scenario()).unwrap();
        assert_eq!(cfg.max_iterations, 20);
        assert_eq!(cfg.policy.window, 3);
        assert_eq!(cfg.flow_limits.unwrap().max, 12.0);
        assert_eq!(cfg.directive_info, "cosim");
    }

    #[test]
    fn registry_config_uses_federate_names() {
        let cfg = registry_config(&scenario(), None);
        assert_eq!(cfg.domain, "ng1");
        assert_eq!(cfg.peer_domain, "transmission");
        assert_eq!(cfg.setpoint_unit, "sm3/s");
    }
}
