//! Scenario clock: maps step indices onto wall-calendar timestamps.

use chrono::{Duration, NaiveDateTime};

use crate::error::{GcError, GcResult};

/// Uniform scenario time axis `start + k * dt` for `k in 0..=steps`.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioClock {
    start: NaiveDateTime,
    step_s: f64,
    steps: usize,
}

impl ScenarioClock {
    pub fn new(start: NaiveDateTime, step_s: f64, steps: usize) -> GcResult<Self> {
        if !step_s.is_finite() || step_s <= 0.0 {
            return Err(GcError::InvalidArg {
                what: "scenario time step must be positive",
            });
        }
        Ok(Self {
            start,
            step_s,
            steps,
        })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn step_seconds(&self) -> f64 {
        self.step_s
    }

    /// Index of the last step (the horizon holds `last_step() + 1` timestamps).
    pub fn last_step(&self) -> usize {
        self.steps
    }

    pub fn timestamp(&self, step: usize) -> GcResult<NaiveDateTime> {
        if step > self.steps {
            return Err(GcError::IndexOob {
                what: "scenario step",
                index: step,
                len: self.steps + 1,
            });
        }
        let millis = (self.step_s * 1000.0 * step as f64).round() as i64;
        Ok(self.start + Duration::milliseconds(millis))
    }

    /// Every timestamp on the horizon, step 0 included.
    pub fn timestamps(&self) -> impl Iterator<Item = (usize, NaiveDateTime)> + '_ {
        (0..=self.steps).filter_map(|k| self.timestamp(k).ok().map(|t| (k, t)))
    }
}
