//! Per-step iteration records and the divergence log.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Iteration bookkeeping for one step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeStepRecord {
    pub step: usize,
    pub timestamp: NaiveDateTime,
    pub iterations: u32,
    pub diverged: bool,
    /// Set once the step advanced.
    pub closed: bool,
}

/// A step abandoned at the iteration limit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DivergenceRecord {
    pub step: usize,
    pub timestamp: NaiveDateTime,
    pub iterations_at_abort: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DivergenceSummary {
    pub total: usize,
    pub steps: Vec<DivergenceRecord>,
}

#[derive(Clone, Debug, Default)]
pub struct DivergenceLog {
    records: Vec<TimeStepRecord>,
    divergences: Vec<DivergenceRecord>,
}

impl DivergenceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the record for `step`. Restarting the current step resets it.
    pub fn begin_step(&mut self, step: usize, timestamp: NaiveDateTime) {
        let fresh = TimeStepRecord {
            step,
            timestamp,
            iterations: 0,
            diverged: false,
            closed: false,
        };
        match self.records.iter_mut().find(|r| r.step == step) {
            Some(existing) => *existing = fresh,
            None => self.records.push(fresh),
        }
    }

    pub fn record(&self, step: usize) -> Option<&TimeStepRecord> {
        self.records.iter().find(|r| r.step == step)
    }

    fn record_mut(&mut self, step: usize) -> Option<&mut TimeStepRecord> {
        self.records.iter_mut().find(|r| r.step == step)
    }

    pub fn increment(&mut self, step: usize) {
        if let Some(r) = self.record_mut(step) {
            r.iterations += 1;
        }
    }

    pub fn close_step(&mut self, step: usize) {
        if let Some(r) = self.record_mut(step) {
            r.closed = true;
        }
    }

    /// Append a divergence for `step`; returns false if one already exists.
    pub fn record_divergence(&mut self, step: usize, iterations: u32) -> bool {
        if self.divergences.iter().any(|d| d.step == step) {
            return false;
        }
        let Some(r) = self.record_mut(step) else {
            return false;
        };
        r.diverged = true;
        let record = DivergenceRecord {
            step,
            timestamp: r.timestamp,
            iterations_at_abort: iterations,
        };
        self.divergences.push(record);
        true
    }

    pub fn records(&self) -> &[TimeStepRecord] {
        &self.records
    }

    pub fn divergences(&self) -> &[DivergenceRecord] {
        &self.divergences
    }

    pub fn summary(&self) -> DivergenceSummary {
        DivergenceSummary {
            total: self.divergences.len(),
            steps: self.divergences.clone(),
        }
    }
}
