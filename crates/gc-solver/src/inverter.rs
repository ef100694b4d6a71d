//! Thermal power -> active power inversion (PowerFuelInverter).

use gc_core::ensure_finite;
use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};
use crate::heat_rate::HeatRateCurve;
use crate::newton::{NewtonConfig, NewtonOutcome, newton_scalar};

/// Iteration settings for the inversion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InverterConfig {
    pub max_iterations: usize,
    /// Bound on |3.6*Pth - P*HR(P)|
    pub tolerance: f64,
    /// Decrement used instead of a division by a zero slope
    pub zero_derivative_step: f64,
}

impl Default for InverterConfig {
    fn default() -> Self {
        let n = NewtonConfig::default();
        Self {
            max_iterations: n.max_iterations,
            tolerance: n.abs_tol,
            zero_derivative_step: n.zero_derivative_step,
        }
    }
}

impl InverterConfig {
    fn newton(&self) -> NewtonConfig {
        NewtonConfig {
            max_iterations: self.max_iterations,
            abs_tol: self.tolerance,
            zero_derivative_step: self.zero_derivative_step,
        }
    }
}

/// Outcome of one inversion.
pub type Inversion = NewtonOutcome;

impl NewtonOutcome {
    /// Active power in MW.
    pub fn active_power(&self) -> f64 {
        self.x
    }
}

/// Admissible off-take flow band in m³/s.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowLimits {
    pub min: f64,
    pub max: f64,
}

impl FlowLimits {
    pub fn new(min: f64, max: f64) -> SolverResult<Self> {
        ensure_finite(min, "minimum flow")?;
        ensure_finite(max, "maximum flow")?;
        if min > max {
            return Err(SolverError::InvalidArg {
                what: "minimum flow exceeds maximum flow",
            });
        }
        Ok(Self { min, max })
    }

    pub fn clamp(&self, flow: f64) -> f64 {
        if flow > self.max {
            self.max
        } else if flow < self.min {
            self.min
        } else {
            flow
        }
    }
}

/// Result of the flow-clamped inversion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClampedInversion {
    pub requested_flow: f64,
    pub flow: f64,
    /// `calorific_value * flow` in MW
    pub thermal_power: f64,
    pub inversion: Inversion,
}

impl ClampedInversion {
    pub fn was_clamped(&self) -> bool {
        self.flow != self.requested_flow
    }
}

/// Translates thermal fuel power into electrical active power.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerFuelInverter {
    curve: HeatRateCurve,
    config: InverterConfig,
}

impl PowerFuelInverter {
    pub fn new(curve: HeatRateCurve, config: InverterConfig) -> SolverResult<Self> {
        if config.max_iterations == 0 {
            return Err(SolverError::InvalidArg {
                what: "inverter needs at least one iteration",
            });
        }
        if !(config.tolerance > 0.0) {
            return Err(SolverError::InvalidArg {
                what: "inverter tolerance must be positive",
            });
        }
        ensure_finite(config.zero_derivative_step, "zero derivative step")?;
        Ok(Self { curve, config })
    }

    pub fn curve(&self) -> &HeatRateCurve {
        &self.curve
    }

    pub fn config(&self) -> &InverterConfig {
        &self.config
    }

    /// Active power whose fuel demand equals `thermal_mw`.
    ///
    /// Running out of iterations is not an error: the last iterate comes back
    /// with `converged == false`. Callers own the warning since they know which
    /// node and step the inversion was for; this only logs at debug level.
    pub fn invert(&self, thermal_mw: f64, initial_guess_mw: f64) -> Inversion {
        let curve = self.curve;
        let out = newton_scalar(
            initial_guess_mw,
            |p| curve.residual(thermal_mw, p),
            |p| curve.residual_slope(p),
            &self.config.newton(),
        );
        if !out.converged {
            tracing::debug!(
                thermal_mw,
                initial_guess_mw,
                active_mw = out.x,
                residual = out.residual,
                "heat-rate inversion hit its iteration limit"
            );
        }
        out
    }

    /// Clamp `requested_flow` to `limits`, then invert `calorific_value * flow`.
    ///
    /// `calorific_value` is in MJ/m³ so the product is MW thermal.
    pub fn invert_clamped(
        &self,
        requested_flow: f64,
        calorific_value: f64,
        limits: &FlowLimits,
        initial_guess_mw: f64,
    ) -> ClampedInversion {
        let flow = limits.clamp(requested_flow);
        let thermal_power = calorific_value * flow;
        ClampedInversion {
            requested_flow,
            flow,
            thermal_power,
            inversion: self.invert(thermal_power, initial_guess_mw),
        }
    }
}
