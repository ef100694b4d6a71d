//! Error types for runtime operations.

use thiserror::Error;

/// Failures surfaced by a co-simulation runtime. All of them are fatal to a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Operation not allowed in mode {mode}: {what}")]
    InvalidMode { mode: &'static str, what: &'static str },

    #[error("Unknown channel handle: {index}")]
    UnknownHandle { index: usize },

    #[error("Duplicate channel name: {name}")]
    DuplicateChannel { name: String },

    #[error("Transport failure: {message}")]
    Transport { message: String },
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
