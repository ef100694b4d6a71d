//! Error types for coordination.

use gc_network::NetworkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Not allowed in phase {phase}: {what}")]
    InvalidPhase { phase: &'static str, what: &'static str },

    #[error("Invariant violated: {what}")]
    Invariant { what: &'static str },

    #[error("Federation halted at step {step}")]
    Halted { step: usize },

    #[error("Runtime error: {0}")]
    Runtime(#[from] gc_runtime::RuntimeError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Coupling error: {0}")]
    Coupling(#[from] gc_coupling::CouplingError),

    #[error("Solver error: {0}")]
    Solver(#[from] gc_solver::SolverError),

    #[error("Core error: {0}")]
    Core(#[from] gc_core::GcError),
}

pub type SimResult<T> = Result<T, SimError>;

/// Observer failures travel back through the network's run loop.
impl From<SimError> for NetworkError {
    fn from(e: SimError) -> Self {
        match e {
            SimError::Network(inner) => inner,
            other => NetworkError::Observer {
                message: other.to_string(),
            },
        }
    }
}
