//! The runtime trait consumed by the coordinator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RuntimeResult;

/// Handle to an outgoing channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicationHandle(pub usize);

/// Handle to an incoming channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(pub usize);

/// Payload type declared when registering a publication.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    #[default]
    Double,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Double => write!(f, "double"),
        }
    }
}

/// What the caller asks of an iterative request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterationRequest {
    /// Advance; do not iterate.
    NoIteration,
    /// Iterate at the current time regardless of value changes.
    ForceIteration,
    /// Iterate only if some exchanged value changed.
    IterateIfNeeded,
}

/// Status returned by an iterative request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterationResult {
    /// Time advanced; move on.
    NextStep,
    /// Time held; repeat the current step.
    Iterating,
    /// The federation stopped.
    Halted,
}

/// Granted time plus iteration status.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grant {
    pub time: f64,
    pub status: IterationResult,
}

/// Operations a federate needs from the co-simulation runtime.
///
/// Creating the federate from configuration is the implementor's
/// constructor; freeing it is `Drop`. Every method blocks until the runtime
/// answers; `request_time*` calls are the federation-wide barrier.
pub trait CosimRuntime {
    fn set_time_period(&mut self, period: f64) -> RuntimeResult<()>;
    fn time_period(&self) -> RuntimeResult<f64>;

    fn set_max_iterations(&mut self, max_iterations: u32) -> RuntimeResult<()>;
    fn max_iterations(&self) -> RuntimeResult<u32>;

    fn enter_initializing_mode(&mut self) -> RuntimeResult<()>;
    fn enter_executing_mode(&mut self) -> RuntimeResult<()>;
    fn enter_executing_mode_iterative(
        &mut self,
        request: IterationRequest,
    ) -> RuntimeResult<IterationResult>;

    /// Plain request; returns the granted time.
    fn request_time(&mut self, time: f64) -> RuntimeResult<f64>;
    fn request_time_iterative(
        &mut self,
        time: f64,
        request: IterationRequest,
    ) -> RuntimeResult<Grant>;

    fn register_publication(
        &mut self,
        name: &str,
        value_type: ValueType,
        unit: &str,
    ) -> RuntimeResult<PublicationHandle>;
    fn register_subscription(&mut self, name: &str, unit: &str)
    -> RuntimeResult<SubscriptionHandle>;

    fn publish_double(&mut self, handle: PublicationHandle, value: f64) -> RuntimeResult<()>;
    fn read_double(&mut self, handle: SubscriptionHandle) -> RuntimeResult<f64>;

    fn finalize(&mut self) -> RuntimeResult<()>;
}
