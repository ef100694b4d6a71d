// gc-core/src/units.rs

use uom::si::f64::{Pressure as UomPressure, VolumeRate as UomVolumeRate};

// Canonical unit types for the gas side (SI, f64)
pub type Pressure = UomPressure;
pub type VolumeRate = UomVolumeRate;

/// Gross calorific value in J/m³ (energy per standard volume).
pub type CalorificValue = f64;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn bar(v: f64) -> Pressure {
    use uom::si::pressure::bar;
    Pressure::new::<bar>(v)
}

#[inline]
pub fn m3ps(v: f64) -> VolumeRate {
    use uom::si::volume_rate::cubic_meter_per_second;
    VolumeRate::new::<cubic_meter_per_second>(v)
}

#[inline]
pub fn in_bar(p: Pressure) -> f64 {
    p.get::<uom::si::pressure::bar>()
}

#[inline]
pub fn in_m3ps(q: VolumeRate) -> f64 {
    q.get::<uom::si::volume_rate::cubic_meter_per_second>()
}

/// J/m³ -> MJ/m³, the unit heat-rate curves are calibrated in.
#[inline]
pub fn mj_per_m3(gcv: CalorificValue) -> f64 {
    gcv / 1e6
}

pub mod constants {
    /// MJ per kWh; converts a heat rate in MJ/kWh times MW into MW thermal.
    pub const MJ_PER_KWH: f64 = 3.6;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _p = pa(101_325.0);
        let _q = m3ps(12.0);
        assert!((in_m3ps(m3ps(12.0)) - 12.0).abs() < 1e-12);
    }

    #[test]
    fn bar_and_pascal_agree() {
        assert!((in_bar(pa(5.0e5)) - 5.0).abs() < 1e-12);
        assert!((bar(2.0).value - 2.0e5).abs() < 1e-9);
    }

    #[test]
    fn calorific_value_scaling() {
        assert!((mj_per_m3(39.0e6) - 39.0).abs() < 1e-12);
    }
}
