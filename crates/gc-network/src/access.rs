//! Traits a gas network exposes to the coordinator.

use std::path::{Path, PathBuf};

use gc_core::{CalorificValue, Pressure, ScenarioClock, VolumeRate};

use crate::error::NetworkResult;
use crate::event::ScenarioEventList;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverState {
    BeforeStep,
    AfterStep,
}

/// One state-change notification. The observer may ask for the step to be
/// solved again by setting the repeat flag on an `AfterStep` event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolverEvent {
    state: SolverState,
    step: usize,
    repeat: bool,
}

impl SolverEvent {
    pub fn new(state: SolverState, step: usize) -> Self {
        Self {
            state,
            step,
            repeat: false,
        }
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: bool) {
        self.repeat = repeat;
    }
}

/// Read access to solved (or predicted) node quantities plus the
/// directive list the coordinator writes flow setpoints into.
pub trait NetworkAccess {
    /// Nodes eligible for coupling, in network order.
    fn demand_nodes(&self) -> Vec<String>;
    fn clock(&self) -> &ScenarioClock;

    fn pressure(&self, node: &str, step: usize) -> NetworkResult<Pressure>;
    fn min_pressure(&self, node: &str, step: usize) -> NetworkResult<Pressure>;
    fn flow(&self, node: &str, step: usize) -> NetworkResult<VolumeRate>;
    fn flow_setpoint(&self, node: &str, step: usize) -> NetworkResult<VolumeRate>;
    /// Gross calorific value in J/m³.
    fn calorific_value(&self, node: &str, step: usize) -> NetworkResult<CalorificValue>;

    fn events(&self) -> &ScenarioEventList;
    fn events_mut(&mut self) -> &mut ScenarioEventList;
}

/// Callbacks fired by [`GasNetwork::run`]. `on_before_step` fires once per
/// step; `on_after_step` fires after every solve of that step.
pub trait StepObserver {
    fn on_before_step(
        &mut self,
        event: &mut SolverEvent,
        network: &mut dyn NetworkAccess,
    ) -> NetworkResult<()>;

    fn on_after_step(
        &mut self,
        event: &mut SolverEvent,
        network: &mut dyn NetworkAccess,
    ) -> NetworkResult<()>;
}

pub trait GasNetwork: NetworkAccess {
    /// Solve every step of the clock, notifying `observer` around each.
    fn run(&mut self, observer: &mut dyn StepObserver) -> NetworkResult<()>;

    /// Write solved results under `dir`; returns the written file.
    fn export_results(&self, dir: &Path) -> NetworkResult<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_starts_cleared() {
        let mut ev = SolverEvent::new(SolverState::AfterStep, 4);
        assert!(!ev.repeat());
        ev.set_repeat(true);
        assert!(ev.repeat());
        assert_eq!(ev.step(), 4);
        assert_eq!(ev.state(), SolverState::AfterStep);
    }
}
