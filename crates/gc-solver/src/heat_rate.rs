//! Quadratic heat-rate curve.

use gc_core::constants::MJ_PER_KWH;
use gc_core::ensure_finite;
use serde::{Deserialize, Serialize};

use crate::error::SolverResult;

/// `HR(P) = hr0 + hr1*P + hr2*P^2` in MJ/kWh, with P the active power in MW.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatRateCurve {
    /// MJ/kWh
    pub hr0: f64,
    /// (MJ/kWh)/MW
    pub hr1: f64,
    /// (MJ/kWh)/MW²
    pub hr2: f64,
}

impl HeatRateCurve {
    pub fn new(hr0: f64, hr1: f64, hr2: f64) -> SolverResult<Self> {
        ensure_finite(hr0, "hr0")?;
        ensure_finite(hr1, "hr1")?;
        ensure_finite(hr2, "hr2")?;
        Ok(Self { hr0, hr1, hr2 })
    }

    pub fn heat_rate(&self, p_mw: f64) -> f64 {
        self.hr0 + self.hr1 * p_mw + self.hr2 * p_mw * p_mw
    }

    /// Thermal fuel power (MW) needed to produce `p_mw` of active power.
    pub fn thermal_power(&self, p_mw: f64) -> f64 {
        self.heat_rate(p_mw) * p_mw / MJ_PER_KWH
    }

    /// `3.6*Pth - P*HR(P)`; zero where `p_mw` is the output for `thermal_mw`.
    pub fn residual(&self, thermal_mw: f64, p_mw: f64) -> f64 {
        MJ_PER_KWH * thermal_mw - p_mw * self.heat_rate(p_mw)
    }

    /// d(residual)/dP.
    pub fn residual_slope(&self, p_mw: f64) -> f64 {
        -(self.hr0 + 2.0 * self.hr1 * p_mw + 3.0 * self.hr2 * p_mw * p_mw)
    }
}

impl Default for HeatRateCurve {
    fn default() -> Self {
        Self {
            hr0: 20.0,
            hr1: -0.075,
            hr2: 0.001,
        }
    }
}
