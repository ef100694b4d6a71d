//! Error types for inverter setup.

use gc_core::GcError;
use thiserror::Error;

/// Errors raised while configuring the inverter. Solving itself never fails.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Core error: {0}")]
    Core(#[from] GcError),
}

pub type SolverResult<T> = Result<T, SolverError>;
