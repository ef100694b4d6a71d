//! Scenario loading, saving, validation, and introspection.

use std::path::Path;

use gc_project::Scenario;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct ScenarioSummary {
    pub name: String,
    pub federate: String,
    pub peer: String,
    pub steps: usize,
    pub horizon: usize,
    pub coupled_nodes: Vec<String>,
    pub network_nodes: usize,
    pub flow_limited: bool,
}

/// Load, migrate and validate a scenario (`.json` or YAML).
pub fn load_scenario(path: &Path) -> AppResult<Scenario> {
    if !path.exists() {
        return Err(AppError::ScenarioFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    Ok(gc_project::load(path)?)
}

pub fn save_scenario(path: &Path, scenario: &Scenario) -> AppResult<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => gc_project::save_json(path, scenario)?,
        _ => gc_project::save_yaml(path, scenario)?,
    }
    Ok(())
}

pub fn validate_scenario(scenario: &Scenario) -> AppResult<()> {
    gc_project::validate_scenario(scenario)?;
    if scenario.coupling.points.is_empty() {
        return Err(AppError::Validation(
            "Scenario must couple at least one node".to_string(),
        ));
    }
    Ok(())
}

pub fn summarize(scenario: &Scenario) -> ScenarioSummary {
    ScenarioSummary {
        name: scenario.name.clone(),
        federate: scenario.federate.name.clone(),
        peer: scenario.federate.peer.clone(),
        steps: scenario.network.steps + 1,
        horizon: scenario.coupling.horizon,
        coupled_nodes: scenario
            .coupling
            .points
            .iter()
            .map(|p| p.gas_node.clone())
            .collect(),
        network_nodes: scenario.network.nodes.len(),
        flow_limited: scenario.flow_limits.is_some(),
    }
}
