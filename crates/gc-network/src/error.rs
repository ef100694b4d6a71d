//! Error types for network operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Unknown node: {name}")]
    UnknownNode { name: String },

    #[error("Step {step} repeated more than {limit} times")]
    RepeatLimit { step: usize, limit: usize },

    /// A step observer failed; the run stops.
    #[error("Observer failed: {message}")]
    Observer { message: String },

    #[error("Core error: {0}")]
    Core(#[from] gc_core::GcError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
