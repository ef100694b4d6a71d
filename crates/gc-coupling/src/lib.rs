//! gc-coupling: coupling points between the gas network and the peer.
//!
//! - [`convergence`]: per-sample violation test with a damping window
//! - [`registry`]: builds and owns the coupling points
//! - [`channel`]: channel name templates
//! - [`history`]: bounded per-offset sample history
//! - [`sink`]: per-point append-only log

pub mod channel;
pub mod convergence;
pub mod error;
pub mod history;
pub mod registry;
pub mod sink;

pub use convergence::ConvergencePolicy;
pub use error::{CouplingError, CouplingResult};
pub use history::SampleHistory;
pub use registry::{AllowEntry, CouplingPoint, CouplingRegistry, RegistryConfig};
pub use sink::{PointSink, SampleLine};
