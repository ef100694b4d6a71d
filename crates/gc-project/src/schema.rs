//! Scenario schema definitions.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub version: u32,
    pub name: String,
    pub federate: FederateDef,
    pub coupling: CouplingDef,
    #[serde(default)]
    pub heat_rate: HeatRateDef,
    #[serde(default)]
    pub inverter: InverterDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_limits: Option<FlowLimitsDef>,
    #[serde(default = "default_initial_efficiency")]
    pub initial_efficiency: f64,
    pub network: NetworkDef,
    pub peer: PeerDef,
    #[serde(default)]
    pub output: OutputDef,
}

fn default_initial_efficiency() -> f64 {
    0.3
}

fn default_time_period() -> f64 {
    1.0
}

fn default_max_iterations() -> u32 {
    20
}

fn default_power_unit() -> String {
    "MW".to_string()
}

fn default_setpoint_unit() -> String {
    "sm3/s".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FederateDef {
    pub name: String,
    pub peer: String,
    #[serde(default = "default_time_period")]
    pub time_period: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_power_unit")]
    pub publication_unit: String,
    #[serde(default = "default_power_unit")]
    pub subscription_unit: String,
    #[serde(default = "default_setpoint_unit")]
    pub setpoint_unit: String,
}

fn default_horizon() -> usize {
    1
}

fn default_history_window() -> usize {
    3
}

fn default_epsilon() -> f64 {
    0.001
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CouplingDef {
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    /// Samples, current one included, that must agree before a point converges.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default)]
    pub points: Vec<CouplingPointDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CouplingPointDef {
    pub gas_node: String,
    pub peer_node: u32,
}

/// `HR(P) = hr0 + hr1 P + hr2 P²` in MJ/kWh with P in MW.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HeatRateDef {
    pub hr0: f64,
    pub hr1: f64,
    pub hr2: f64,
}

impl Default for HeatRateDef {
    fn default() -> Self {
        Self {
            hr0: 20.0,
            hr1: -0.075,
            hr2: 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct InverterDef {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub zero_derivative_step: f64,
}

impl Default for InverterDef {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            tolerance: 1e-6,
            zero_derivative_step: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FlowLimitsDef {
    pub min_m3_s: f64,
    pub max_m3_s: f64,
}

fn default_max_repeats() -> usize {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkDef {
    pub start_time: NaiveDateTime,
    pub time_step_s: f64,
    pub steps: usize,
    #[serde(default)]
    pub nodes: Vec<NetworkNodeDef>,
    #[serde(default = "default_max_repeats")]
    pub max_repeats_per_step: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkNodeDef {
    pub name: String,
    pub supply_pressure_bar: f64,
    pub min_pressure_bar: f64,
    pub gcv_mj_per_m3: f64,
    pub base_flow_m3_s: f64,
    pub resistance: f64,
}

fn default_curtail_tolerance() -> f64 {
    1e-3
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerDef {
    #[serde(default)]
    pub demands: Vec<PeerDemandDef>,
    #[serde(default)]
    pub curtail_on_saturation: bool,
    #[serde(default = "default_curtail_tolerance")]
    pub curtail_tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerDemandDef {
    pub node: u32,
    pub schedule_mw: Vec<f64>,
}

fn default_output_dir() -> String {
    "runs".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputDef {
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Write one log per coupling point.
    #[serde(default = "default_true")]
    pub point_logs: bool,
}

impl Default for OutputDef {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            point_logs: true,
        }
    }
}
