//! gc-sim: time-step coordination between the gas network and its peer.
//!
//! [`TimeStepCoordinator`] is a [`gc_network::StepObserver`]: the network
//! calls it before and after every step, and it decides whether the step is
//! repeated, what gets published, and when to block on the runtime.

pub mod coordinator;
pub mod divergence;
pub mod error;

pub use coordinator::{CoordinatorConfig, Phase, TimeStepCoordinator};
pub use divergence::{DivergenceLog, DivergenceRecord, DivergenceSummary, TimeStepRecord};
pub use error::{SimError, SimResult};
