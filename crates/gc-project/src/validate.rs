//! Scenario validation logic.

use crate::schema::{CouplingDef, NetworkDef, PeerDef, Scenario};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn finite(field: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, v, "must be finite"))
    }
}

fn positive(field: &str, v: f64) -> Result<(), ValidationError> {
    finite(field, v)?;
    if v > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be positive"))
    }
}

fn non_negative(field: &str, v: f64) -> Result<(), ValidationError> {
    finite(field, v)?;
    if v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be non-negative"))
    }
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }
    if scenario.name.trim().is_empty() {
        return Err(invalid("name", "", "must not be empty"));
    }

    let fed = &scenario.federate;
    if fed.name.is_empty() || fed.peer.is_empty() {
        return Err(invalid("federate.name/peer", "", "must not be empty"));
    }
    if fed.name == fed.peer {
        return Err(invalid("federate.peer", &fed.peer, "must differ from federate.name"));
    }
    positive("federate.time_period", fed.time_period)?;
    if fed.max_iterations == 0 {
        return Err(invalid("federate.max_iterations", 0, "must be at least 1"));
    }

    for (field, v) in [
        ("heat_rate.hr0", scenario.heat_rate.hr0),
        ("heat_rate.hr1", scenario.heat_rate.hr1),
        ("heat_rate.hr2", scenario.heat_rate.hr2),
    ] {
        finite(field, v)?;
    }

    let inv = &scenario.inverter;
    if inv.max_iterations == 0 {
        return Err(invalid("inverter.max_iterations", 0, "must be at least 1"));
    }
    positive("inverter.tolerance", inv.tolerance)?;
    finite("inverter.zero_derivative_step", inv.zero_derivative_step)?;

    if let Some(limits) = &scenario.flow_limits {
        non_negative("flow_limits.min_m3_s", limits.min_m3_s)?;
        finite("flow_limits.max_m3_s", limits.max_m3_s)?;
        if limits.min_m3_s > limits.max_m3_s {
            return Err(invalid(
                "flow_limits.max_m3_s",
                limits.max_m3_s,
                "must not be below min_m3_s",
            ));
        }
    }
    positive("initial_efficiency", scenario.initial_efficiency)?;

    let node_names = validate_network(&scenario.network)?;
    // A divergent step repeats max_iterations times before it is force-advanced.
    if scenario.network.max_repeats_per_step < fed.max_iterations as usize {
        return Err(invalid(
            "network.max_repeats_per_step",
            scenario.network.max_repeats_per_step,
            "must be at least federate.max_iterations",
        ));
    }
    let peer_nodes = validate_coupling(&scenario.coupling, &node_names)?;
    validate_peer(&scenario.peer, &peer_nodes)?;

    if scenario.output.directory.trim().is_empty() {
        return Err(invalid("output.directory", "", "must not be empty"));
    }
    Ok(())
}

fn validate_network(network: &NetworkDef) -> Result<HashSet<&str>, ValidationError> {
    positive("network.time_step_s", network.time_step_s)?;
    if network.max_repeats_per_step == 0 {
        return Err(invalid("network.max_repeats_per_step", 0, "must be at least 1"));
    }
    let mut names = HashSet::new();
    for node in &network.nodes {
        if !names.insert(node.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: node.name.clone(),
                context: "network nodes".to_string(),
            });
        }
        finite("supply_pressure_bar", node.supply_pressure_bar)?;
        finite("min_pressure_bar", node.min_pressure_bar)?;
        positive("gcv_mj_per_m3", node.gcv_mj_per_m3)?;
        non_negative("base_flow_m3_s", node.base_flow_m3_s)?;
        non_negative("resistance", node.resistance)?;
    }
    Ok(names)
}

fn validate_coupling(
    coupling: &CouplingDef,
    node_names: &HashSet<&str>,
) -> Result<HashSet<u32>, ValidationError> {
    if coupling.horizon == 0 {
        return Err(invalid("coupling.horizon", 0, "must be at least 1"));
    }
    if coupling.history_window == 0 {
        return Err(invalid("coupling.history_window", 0, "must be at least 1"));
    }
    non_negative("coupling.epsilon", coupling.epsilon)?;

    let mut gas_nodes = HashSet::new();
    let mut peer_nodes = HashSet::new();
    for point in &coupling.points {
        if !gas_nodes.insert(point.gas_node.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: point.gas_node.clone(),
                context: "coupling points gas_node".to_string(),
            });
        }
        if !peer_nodes.insert(point.peer_node) {
            return Err(ValidationError::DuplicateId {
                id: point.peer_node.to_string(),
                context: "coupling points peer_node".to_string(),
            });
        }
        if !node_names.contains(point.gas_node.as_str()) {
            return Err(ValidationError::MissingReference {
                id: point.gas_node.clone(),
                context: "coupling point gas_node".to_string(),
            });
        }
    }
    Ok(peer_nodes)
}

fn validate_peer(peer: &PeerDef, peer_nodes: &HashSet<u32>) -> Result<(), ValidationError> {
    non_negative("peer.curtail_tolerance", peer.curtail_tolerance)?;
    let mut seen = HashSet::new();
    for demand in &peer.demands {
        if !seen.insert(demand.node) {
            return Err(ValidationError::DuplicateId {
                id: demand.node.to_string(),
                context: "peer demands".to_string(),
            });
        }
        if !peer_nodes.contains(&demand.node) {
            return Err(ValidationError::MissingReference {
                id: demand.node.to_string(),
                context: "peer demand node".to_string(),
            });
        }
        if demand.schedule_mw.is_empty() {
            return Err(invalid(
                "peer.demands.schedule_mw",
                demand.node,
                "must hold at least one value",
            ));
        }
        for v in &demand.schedule_mw {
            non_negative("peer.demands.schedule_mw", *v)?;
        }
    }
    Ok(())
}
