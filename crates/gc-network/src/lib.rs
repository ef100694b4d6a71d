//! gc-network: the gas-network solver seam.
//!
//! The coordinator sees a gas network only through [`NetworkAccess`]
//! (per-node, per-step accessors plus the scenario-event list) and
//! [`StepObserver`] (the two callbacks the solver fires around every step).
//! [`surrogate`] provides a small stand-in network that drives the observer
//! loop the way a real transient solver would.

pub mod access;
pub mod error;
pub mod event;
pub mod surrogate;

pub use access::{GasNetwork, NetworkAccess, SolverEvent, SolverState, StepObserver};
pub use error::{NetworkError, NetworkResult};
pub use event::{ControlKind, ScenarioEvent, ScenarioEventList};
pub use surrogate::{SurrogateConfig, SurrogateNetwork, SurrogateNode};
