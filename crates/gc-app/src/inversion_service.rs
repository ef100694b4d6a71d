//! One-off heat-rate inversion.

use gc_project::{HeatRateDef, InverterDef};
use gc_solver::{HeatRateCurve, InverterConfig, PowerFuelInverter};

use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq)]
pub struct InversionReport {
    pub thermal_mw: f64,
    pub initial_guess_mw: f64,
    pub active_mw: f64,
    pub residual: f64,
    pub iterations: usize,
    pub converged: bool,
    /// Heat rate at the solution, MJ/kWh.
    pub heat_rate: f64,
}

/// Active power for `thermal_mw`; the guess defaults to `0.3 * thermal_mw`.
pub fn invert_thermal_power(
    heat_rate: HeatRateDef,
    inverter: InverterDef,
    thermal_mw: f64,
    initial_guess_mw: Option<f64>,
) -> AppResult<InversionReport> {
    let curve = HeatRateCurve::new(heat_rate.hr0, heat_rate.hr1, heat_rate.hr2)?;
    let config = InverterConfig {
        max_iterations: inverter.max_iterations,
        tolerance: inverter.tolerance,
        zero_derivative_step: inverter.zero_derivative_step,
    };
    let solver = PowerFuelInverter::new(curve, config)?;
    let guess = initial_guess_mw.unwrap_or(thermal_mw * 0.3);
    let out = solver.invert(thermal_mw, guess);
    Ok(InversionReport {
        thermal_mw,
        initial_guess_mw: guess,
        active_mw: out.active_power(),
        residual: out.residual,
        iterations: out.iterations,
        converged: out.converged,
        heat_rate: curve.heat_rate(out.active_power()),
    })
}
