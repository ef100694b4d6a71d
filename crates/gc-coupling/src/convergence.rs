//! Convergence test for one coupling sample.

use gc_core::within;
use serde::{Deserialize, Serialize};

use crate::error::{CouplingError, CouplingResult};

/// Violation test over (available, required, recent history).
///
/// A sample violates when `|available - required| > epsilon`. A sample that
/// passes still counts as a violation until the history holds `window`
/// samples whose last `window - 1` consecutive differences are all within
/// `epsilon`. The history passed in must already contain the current sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvergencePolicy {
    pub epsilon: f64,
    pub window: usize,
}

impl Default for ConvergencePolicy {
    fn default() -> Self {
        Self {
            epsilon: 0.001,
            window: 3,
        }
    }
}

impl ConvergencePolicy {
    pub fn new(epsilon: f64, window: usize) -> CouplingResult<Self> {
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(CouplingError::InvalidArg {
                what: "epsilon must be finite and non-negative",
            });
        }
        if window == 0 {
            return Err(CouplingError::InvalidArg {
                what: "history window must be at least 1",
            });
        }
        Ok(Self { epsilon, window })
    }

    /// Negative required values stand for "nothing published yet".
    pub fn is_placeholder(required: f64) -> bool {
        required < 0.0
    }

    pub fn is_violation(&self, available: f64, required: f64, history: &[f64]) -> bool {
        if Self::is_placeholder(required) {
            return false;
        }
        if !within(available, required, self.epsilon) {
            return true;
        }
        if history.len() < self.window {
            return true;
        }
        let tail = &history[history.len() - self.window..];
        !tail
            .windows(2)
            .all(|pair| within(pair[1], pair[0], self.epsilon))
    }
}
