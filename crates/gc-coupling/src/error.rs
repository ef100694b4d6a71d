//! Error types for coupling operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CouplingError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Horizon offset {offset} out of range (horizon={horizon})")]
    Offset { offset: usize, horizon: usize },

    #[error("Unknown coupling point: {index}")]
    UnknownPoint { index: usize },

    #[error("Runtime error: {0}")]
    Runtime(#[from] gc_runtime::RuntimeError),

    #[error("Network error: {0}")]
    Network(#[from] gc_network::NetworkError),

    #[error("Core error: {0}")]
    Core(#[from] gc_core::GcError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CouplingResult<T> = Result<T, CouplingError>;
