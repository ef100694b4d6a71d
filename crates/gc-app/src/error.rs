//! Error types for the gc-app service layer.

use std::path::PathBuf;

/// Application error wrapping the backend crates' errors as strings.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Scenario error: {0}")]
    Project(String),

    #[error("Failed to read scenario file: {path}")]
    ScenarioFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Scenario validation failed: {0}")]
    Validation(String),

    #[error("Scenario compilation failed: {0}")]
    Compile(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Coupling error: {0}")]
    Coupling(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<gc_project::ProjectError> for AppError {
    fn from(err: gc_project::ProjectError) -> Self {
        match err {
            gc_project::ProjectError::Validation(v) => AppError::Validation(v.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<gc_project::ValidationError> for AppError {
    fn from(err: gc_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<gc_solver::SolverError> for AppError {
    fn from(err: gc_solver::SolverError) -> Self {
        AppError::Solver(err.to_string())
    }
}

impl From<gc_runtime::RuntimeError> for AppError {
    fn from(err: gc_runtime::RuntimeError) -> Self {
        AppError::Runtime(err.to_string())
    }
}

impl From<gc_network::NetworkError> for AppError {
    fn from(err: gc_network::NetworkError) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<gc_coupling::CouplingError> for AppError {
    fn from(err: gc_coupling::CouplingError) -> Self {
        AppError::Coupling(err.to_string())
    }
}

impl From<gc_sim::SimError> for AppError {
    fn from(err: gc_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<gc_results::ResultsError> for AppError {
    fn from(err: gc_results::ResultsError) -> Self {
        match err {
            gc_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Results(err.to_string())
    }
}
