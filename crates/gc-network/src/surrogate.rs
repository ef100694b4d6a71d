//! Stand-in gas network with a quadratic pressure-drop law.
//!
//! Each demand node is fed from a fixed supply pressure; the off-take flow
//! follows the active flow-setpoint directive for the step (base flow
//! otherwise) and the node pressure is `p_supply - resistance * q²`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use gc_core::{CalorificValue, Pressure, ScenarioClock, VolumeRate, bar, ensure_positive, m3ps};

use crate::access::{GasNetwork, NetworkAccess, SolverEvent, SolverState, StepObserver};
use crate::error::{NetworkError, NetworkResult};
use crate::event::{ControlKind, ScenarioEventList};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurrogateNode {
    pub name: String,
    pub supply_pressure_bar: f64,
    pub min_pressure_bar: f64,
    pub gcv_mj_per_m3: f64,
    pub base_flow_m3_s: f64,
    /// Pressure drop coefficient in bar / (m³/s)².
    pub resistance: f64,
}

fn default_max_repeats() -> usize {
    1000
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurrogateConfig {
    pub start_time: NaiveDateTime,
    pub time_step_s: f64,
    /// Index of the last step; steps `0..=steps` are solved.
    pub steps: usize,
    pub nodes: Vec<SurrogateNode>,
    #[serde(default = "default_max_repeats")]
    pub max_repeats_per_step: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Solved {
    pressure_bar: f64,
    flow_m3_s: f64,
}

#[derive(Serialize)]
struct ResultRow<'a> {
    step: usize,
    timestamp: String,
    node: &'a str,
    pressure_bar: f64,
    flow_m3_s: f64,
    thermal_power_mw: f64,
}

pub struct SurrogateNetwork {
    nodes: Vec<SurrogateNode>,
    clock: ScenarioClock,
    events: ScenarioEventList,
    max_repeats: usize,
    /// `solved[node][step]`
    solved: Vec<Vec<Option<Solved>>>,
}

impl SurrogateNetwork {
    pub fn new(config: SurrogateConfig) -> NetworkResult<Self> {
        let clock = ScenarioClock::new(config.start_time, config.time_step_s, config.steps)?;
        for (i, node) in config.nodes.iter().enumerate() {
            if config.nodes[..i].iter().any(|n| n.name == node.name) {
                return Err(NetworkError::InvalidArg {
                    what: "duplicate node name",
                });
            }
            let values = [
                node.supply_pressure_bar,
                node.min_pressure_bar,
                node.gcv_mj_per_m3,
                node.base_flow_m3_s,
                node.resistance,
            ];
            if values.iter().any(|v| !v.is_finite()) {
                return Err(NetworkError::InvalidArg {
                    what: "node parameters must be finite",
                });
            }
            ensure_positive(node.gcv_mj_per_m3, "calorific value")?;
            if node.resistance < 0.0 || node.base_flow_m3_s < 0.0 {
                return Err(NetworkError::InvalidArg {
                    what: "resistance and base flow must be non-negative",
                });
            }
        }
        if config.max_repeats_per_step == 0 {
            return Err(NetworkError::InvalidArg {
                what: "max_repeats_per_step must be positive",
            });
        }

        let solved = vec![vec![None; config.steps + 1]; config.nodes.len()];
        Ok(Self {
            nodes: config.nodes,
            clock,
            events: ScenarioEventList::new(),
            max_repeats: config.max_repeats_per_step,
            solved,
        })
    }

    fn index(&self, name: &str) -> NetworkResult<usize> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .ok_or_else(|| NetworkError::UnknownNode {
                name: name.to_string(),
            })
    }

    fn predicted_flow(&self, idx: usize, step: usize) -> NetworkResult<f64> {
        let node = &self.nodes[idx];
        let ts = self.clock.timestamp(step)?;
        Ok(self
            .events
            .active_value(&node.name, ControlKind::Qset, ts)
            .unwrap_or(node.base_flow_m3_s))
    }

    fn pressure_at_flow(node: &SurrogateNode, flow: f64) -> f64 {
        node.supply_pressure_bar - node.resistance * flow * flow
    }

    fn state(&self, idx: usize, step: usize) -> NetworkResult<Solved> {
        if let Some(s) = self.solved[idx].get(step).copied().flatten() {
            return Ok(s);
        }
        let flow = self.predicted_flow(idx, step)?;
        Ok(Solved {
            pressure_bar: Self::pressure_at_flow(&self.nodes[idx], flow),
            flow_m3_s: flow,
        })
    }

    fn solve_step(&mut self, step: usize) -> NetworkResult<()> {
        let ts = self.clock.timestamp(step)?;
        for idx in 0..self.nodes.len() {
            let flow = self.predicted_flow(idx, step)?;
            let node = &self.nodes[idx];
            let pressure = Self::pressure_at_flow(node, flow);
            if pressure < node.min_pressure_bar {
                warn!(
                    node = %node.name,
                    step,
                    pressure_bar = pressure,
                    min_bar = node.min_pressure_bar,
                    "node pressure below minimum"
                );
            }
            self.solved[idx][step] = Some(Solved {
                pressure_bar: pressure,
                flow_m3_s: flow,
            });
        }
        self.events.mark_processed(ts);
        Ok(())
    }

    /// Whether `step` has been solved at least once.
    pub fn is_solved(&self, step: usize) -> bool {
        self.solved
            .iter()
            .all(|row| row.get(step).is_some_and(|s| s.is_some()))
    }
}

impl NetworkAccess for SurrogateNetwork {
    fn demand_nodes(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.name.clone()).collect()
    }

    fn clock(&self) -> &ScenarioClock {
        &self.clock
    }

    fn pressure(&self, node: &str, step: usize) -> NetworkResult<Pressure> {
        let idx = self.index(node)?;
        Ok(bar(self.state(idx, step)?.pressure_bar))
    }

    fn min_pressure(&self, node: &str, _step: usize) -> NetworkResult<Pressure> {
        let idx = self.index(node)?;
        Ok(bar(self.nodes[idx].min_pressure_bar))
    }

    fn flow(&self, node: &str, step: usize) -> NetworkResult<VolumeRate> {
        let idx = self.index(node)?;
        Ok(m3ps(self.state(idx, step)?.flow_m3_s))
    }

    fn flow_setpoint(&self, node: &str, step: usize) -> NetworkResult<VolumeRate> {
        let idx = self.index(node)?;
        Ok(m3ps(self.predicted_flow(idx, step)?))
    }

    fn calorific_value(&self, node: &str, step: usize) -> NetworkResult<CalorificValue> {
        let idx = self.index(node)?;
        self.clock.timestamp(step)?;
        Ok(self.nodes[idx].gcv_mj_per_m3 * 1e6)
    }

    fn events(&self) -> &ScenarioEventList {
        &self.events
    }

    fn events_mut(&mut self) -> &mut ScenarioEventList {
        &mut self.events
    }
}

impl GasNetwork for SurrogateNetwork {
    fn run(&mut self, observer: &mut dyn StepObserver) -> NetworkResult<()> {
        info!(
            nodes = self.nodes.len(),
            steps = self.clock.last_step() + 1,
            "surrogate network run started"
        );
        for step in 0..=self.clock.last_step() {
            let mut before = SolverEvent::new(SolverState::BeforeStep, step);
            observer.on_before_step(&mut before, self)?;

            let mut solves = 0;
            loop {
                self.solve_step(step)?;
                solves += 1;
                let mut after = SolverEvent::new(SolverState::AfterStep, step);
                observer.on_after_step(&mut after, self)?;
                if !after.repeat() {
                    break;
                }
                if solves > self.max_repeats {
                    return Err(NetworkError::RepeatLimit {
                        step,
                        limit: self.max_repeats,
                    });
                }
            }
            debug!(step, solves, "step solved");
        }
        info!("surrogate network run finished");
        Ok(())
    }

    fn export_results(&self, dir: &Path) -> NetworkResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join("network.jsonl");
        let mut out = BufWriter::new(File::create(&path)?);
        for (step, ts) in self.clock.timestamps() {
            for (idx, node) in self.nodes.iter().enumerate() {
                let Some(s) = self.solved[idx][step] else {
                    continue;
                };
                let row = ResultRow {
                    step,
                    timestamp: ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                    node: &node.name,
                    pressure_bar: s.pressure_bar,
                    flow_m3_s: s.flow_m3_s,
                    thermal_power_mw: s.flow_m3_s * node.gcv_mj_per_m3,
                };
                serde_json::to_writer(&mut out, &row)?;
                writeln!(out)?;
            }
        }
        out.flush()?;
        Ok(path)
    }
}
