//! Heat-rate inversion for gas-fired generation.
//!
//! A generator burning gas converts thermal fuel power into electrical active
//! power along a quadratic heat-rate curve. Going from active power to fuel is
//! a closed-form evaluation; going back requires a root-finder. This crate
//! provides the scalar Newton iteration and the inverter built on it,
//! including the flow-clamped variant used when the gas off-take is bounded.

pub mod error;
pub mod heat_rate;
pub mod inverter;
pub mod newton;

pub use error::{SolverError, SolverResult};
pub use heat_rate::HeatRateCurve;
pub use inverter::{ClampedInversion, FlowLimits, Inversion, InverterConfig, PowerFuelInverter};
pub use newton::{NewtonConfig, NewtonOutcome, newton_scalar};
