//! Run execution and caching service.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use gc_coupling::CouplingRegistry;
use gc_network::{GasNetwork, NetworkAccess};
use gc_project::Scenario;
use gc_results::{DivergenceRow, IterationRow, RunManifest, RunStore, compute_run_id};
use gc_sim::{DivergenceLog, TimeStepCoordinator};
use tracing::info;

use crate::error::AppResult;
use crate::progress::{RunProgressEvent, RunStage};
use crate::{project_service, scenario_compile};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    pub tool_version: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

pub struct RunRequest<'a> {
    pub scenario_path: &'a Path,
    /// Overrides the scenario's output directory.
    pub output_dir: Option<&'a Path>,
    pub options: RunOptions,
}

#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub build_time_s: f64,
    pub init_time_s: f64,
    pub step_time_s: f64,
    pub finalize_time_s: f64,
    pub save_time_s: f64,
    pub load_cache_time_s: f64,
    pub total_time_s: f64,
    pub total_iterations: u64,
}

#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub manifest: RunManifest,
    pub iterations: Vec<IterationRow>,
    pub divergences: Vec<DivergenceRow>,
    pub loaded_from_cache: bool,
    pub timing: RunTimingSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            message,
        ));
    }
}

/// Resolve where runs for `scenario` are stored.
pub fn output_root(scenario_path: &Path, scenario: &Scenario, output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let configured = Path::new(&scenario.output.directory);
            if configured.is_absolute() {
                configured.to_path_buf()
            } else {
                scenario_path
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(configured)
            }
        }
    }
}

pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();

    emit_progress(&mut progress_cb, RunStage::LoadingScenario, started, None);
    let scenario = project_service::load_scenario(request.scenario_path)?;
    project_service::validate_scenario(&scenario)?;

    let store = RunStore::new(output_root(
        request.scenario_path,
        &scenario,
        request.output_dir,
    ))?;
    let run_id = compute_run_id(&scenario, &request.options.tool_version);

    emit_progress(&mut progress_cb, RunStage::CheckingCache, started, None);
    if request.options.use_cache && store.has_run(&run_id) {
        emit_progress(
            &mut progress_cb,
            RunStage::LoadingCachedResult,
            started,
            Some(run_id.clone()),
        );
        let load_started = Instant::now();
        let manifest = store.load_manifest(&run_id)?;
        let iterations = store.load_iterations(&run_id)?;
        let divergences = store.load_divergences(&run_id)?;
        timing.load_cache_time_s = load_started.elapsed().as_secs_f64();
        timing.total_iterations = iterations.iter().map(|r| u64::from(r.iterations)).sum();
        timing.total_time_s = started.elapsed().as_secs_f64();
        emit_progress(&mut progress_cb, RunStage::Completed, started, None);
        return Ok(RunResponse {
            run_dir: store.run_dir(&run_id),
            run_id,
            manifest,
            iterations,
            divergences,
            loaded_from_cache: true,
            timing,
        });
    }

    let run_dir = store.run_dir(&run_id);
    fs::create_dir_all(&run_dir)?;

    emit_progress(&mut progress_cb, RunStage::BuildingFederation, started, None);
    let phase = Instant::now();
    let mut network = scenario_compile::build_network(&scenario)?;
    let mut runtime = scenario_compile::build_runtime(&scenario)?;
    let log_dir = scenario.output.point_logs.then(|| run_dir.join("points"));
    let registry = CouplingRegistry::build(
        &scenario_compile::registry_config(&scenario, log_dir),
        &scenario_compile::allow_list(&scenario),
        &mut runtime,
        &mut network,
    )?;
    let coupled: Vec<String> = registry
        .points()
        .iter()
        .map(|p| p.gas_node().to_string())
        .collect();
    let mut coordinator = TimeStepCoordinator::new(
        scenario_compile::coordinator_config(&scenario)?,
        runtime,
        registry,
    )?;
    timing.build_time_s = phase.elapsed().as_secs_f64();

    emit_progress(&mut progress_cb, RunStage::Initializing, started, None);
    let phase = Instant::now();
    coordinator.initialize(&mut network)?;
    timing.init_time_s = phase.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::Stepping,
        started,
        Some(format!("{} steps", network.clock().last_step() + 1)),
    );
    let phase = Instant::now();
    network.run(&mut coordinator)?;
    timing.step_time_s = phase.elapsed().as_secs_f64();

    emit_progress(&mut progress_cb, RunStage::Finalizing, started, None);
    let phase = Instant::now();
    let summary = coordinator.finalize(&network)?;
    timing.finalize_time_s = phase.elapsed().as_secs_f64();

    emit_progress(&mut progress_cb, RunStage::SavingResults, started, None);
    let phase = Instant::now();
    let (_runtime, _registry, log) = coordinator.into_parts();
    let (iterations, divergences) = report_rows(&log);
    timing.total_iterations = iterations.iter().map(|r| u64::from(r.iterations)).sum();

    network.export_results(&run_dir)?;
    export_events(&network, &run_dir.join("events.jsonl"))?;

    let manifest = RunManifest {
        run_id: run_id.clone(),
        scenario_name: scenario.name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        tool_version: request.options.tool_version.clone(),
        steps: network.clock().last_step() + 1,
        coupling_points: coupled,
        divergent_steps: summary.total,
    };
    store.save_run(&manifest, &iterations, &divergences)?;
    timing.save_time_s = phase.elapsed().as_secs_f64();
    timing.total_time_s = started.elapsed().as_secs_f64();

    info!(
        run_id = %run_id,
        divergent_steps = summary.total,
        total_iterations = timing.total_iterations,
        "run stored"
    );
    emit_progress(&mut progress_cb, RunStage::Completed, started, None);

    Ok(RunResponse {
        run_id,
        run_dir,
        manifest,
        iterations,
        divergences,
        loaded_from_cache: false,
        timing,
    })
}

fn report_rows(log: &DivergenceLog) -> (Vec<IterationRow>, Vec<DivergenceRow>) {
    let iterations = log
        .records()
        .iter()
        .map(|r| IterationRow {
            date: r.timestamp.format(DATE_FORMAT).to_string(),
            step: r.step,
            iterations: r.iterations,
        })
        .collect();
    let divergences = log
        .divergences()
        .iter()
        .map(|d| DivergenceRow {
            date: d.timestamp.format(DATE_FORMAT).to_string(),
            step: d.step,
            iterations_at_abort: d.iterations_at_abort,
        })
        .collect();
    (iterations, divergences)
}

/// Final state of every scenario directive, one JSON object per line.
fn export_events(network: &dyn NetworkAccess, path: &Path) -> AppResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for event in network.events().iter() {
        serde_json::to_writer(&mut out, event)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

pub fn list_runs(scenario_path: &Path, output_dir: Option<&Path>) -> AppResult<Vec<RunManifest>> {
    let scenario = project_service::load_scenario(scenario_path)?;
    let store = RunStore::new(output_root(scenario_path, &scenario, output_dir))?;
    Ok(store.list_runs(&scenario.name)?)
}

pub fn load_run(
    scenario_path: &Path,
    output_dir: Option<&Path>,
    run_id: &str,
) -> AppResult<(RunManifest, Vec<IterationRow>, Vec<DivergenceRow>)> {
    let scenario = project_service::load_scenario(scenario_path)?;
    let store = RunStore::new(output_root(scenario_path, &scenario, output_dir))?;
    Ok((
        store.load_manifest(run_id)?,
        store.load_iterations(run_id)?,
        store.load_divergences(run_id)?,
    ))
}
