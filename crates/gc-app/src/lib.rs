//! Shared application service layer for gascouple.
//!
//! Loading scenarios, compiling them into a runnable federation, executing
//! runs with progress events and reading stored results all live here so
//! the CLI stays a thin shell.

pub mod error;
pub mod inversion_service;
pub mod progress;
pub mod project_service;
pub mod run_service;
pub mod scenario_compile;

pub use error::{AppError, AppResult};
pub use inversion_service::{InversionReport, invert_thermal_power};
pub use progress::{RunProgressEvent, RunStage};
pub use project_service::{ScenarioSummary, load_scenario, save_scenario, summarize, validate_scenario};
pub use run_service::{
    RunOptions, RunRequest, RunResponse, RunTimingSummary, ensure_run, ensure_run_with_progress,
    list_runs, load_run,
};
