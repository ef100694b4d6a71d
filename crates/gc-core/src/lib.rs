//! gc-core: stable foundation for gascouple.
//!
//! Contains:
//! - units (uom SI types + constructors for the exchanged quantities)
//! - numeric (Real + tolerances + float helpers)
//! - ids (compact IDs for coupling points)
//! - clock (scenario timestamps per step)
//! - error (shared error types)

pub mod clock;
pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use clock::ScenarioClock;
pub use error::{GcError, GcResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
