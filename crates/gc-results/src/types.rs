//! Result data types.

use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub scenario_name: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub tool_version: String,
    pub steps: usize,
    pub coupling_points: Vec<String>,
    pub divergent_steps: usize,
}

/// Iterations spent on one step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationRow {
    pub date: String,
    pub step: usize,
    pub iterations: u32,
}

/// A step abandoned at the iteration limit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DivergenceRow {
    pub date: String,
    pub step: usize,
    pub iterations_at_abort: u32,
}
