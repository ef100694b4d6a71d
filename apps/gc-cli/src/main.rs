use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use gc_app::{
    AppResult, RunOptions, RunProgressEvent, RunRequest, RunTimingSummary, invert_thermal_power,
    project_service, run_service,
};
use gc_project::{HeatRateDef, InverterDef};

#[derive(Parser)]
#[command(name = "gascouple")]
#[command(about = "Gas network / power grid co-simulation coordinator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file and print its coupling summary
    Validate {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
    },
    /// Run the co-simulation for a scenario
    Run {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Directory for stored runs (defaults to the scenario's output directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// List stored runs for a scenario
    Runs {
        scenario_path: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show iteration counts and divergent steps of a stored run
    ShowRun {
        scenario_path: PathBuf,
        run_id: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Invert a thermal power into the active power that produces it
    Invert {
        /// Thermal power in MW
        #[arg(long)]
        thermal: f64,
        /// Initial active power guess in MW
        #[arg(long)]
        guess: Option<f64>,
        /// Take heat-rate coefficients from this scenario instead of the defaults
        #[arg(long)]
        scenario: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Run {
            scenario_path,
            output,
            no_cache,
        } => cmd_run(&scenario_path, output.as_deref(), !no_cache),
        Commands::Runs {
            scenario_path,
            output,
        } => cmd_runs(&scenario_path, output.as_deref()),
        Commands::ShowRun {
            scenario_path,
            run_id,
            output,
        } => cmd_show_run(&scenario_path, &run_id, output.as_deref()),
        Commands::Invert {
            thermal,
            guess,
            scenario,
        } => cmd_invert(thermal, guess, scenario.as_deref()),
    }
}

fn cmd_validate(scenario_path: &Path) -> AppResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let scenario = project_service::load_scenario(scenario_path)?;
    project_service::validate_scenario(&scenario)?;
    let summary = project_service::summarize(&scenario);
    println!("✓ Scenario is valid");
    println!("  Name: {}", summary.name);
    println!("  Federate: {} <-> {}", summary.federate, summary.peer);
    println!("  Steps: {}", summary.steps);
    println!("  Horizon: {}", summary.horizon);
    println!(
        "  Coupled nodes: {} of {}",
        summary.coupled_nodes.join(", "),
        summary.network_nodes
    );
    if summary.flow_limited {
        println!("  Flow limits: on");
    }
    Ok(())
}

fn cmd_run(scenario_path: &Path, output: Option<&Path>, use_cache: bool) -> AppResult<()> {
    println!("Running co-simulation: {}", scenario_path.display());

    let request = RunRequest {
        scenario_path,
        output_dir: output,
        options: RunOptions {
            use_cache,
            ..RunOptions::default()
        },
    };

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let response = run_service::ensure_run_with_progress(
        &request,
        Some(&mut |event| {
            let emit_now =
                last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Co-simulation completed: {}", response.run_id);
    }
    println!("  Output: {}", response.run_dir.display());
    println!("  Steps: {}", response.manifest.steps);
    println!("  Divergent steps: {}", response.manifest.divergent_steps);
    for row in &response.divergences {
        println!(
            "    step {} ({}) aborted after {} iterations",
            row.step, row.date, row.iterations_at_abort
        );
    }
    print_timing_summary(&response.timing);
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} {}  elapsed={:.2}s",
        spinner[spin_idx],
        event.stage.label(),
        event.elapsed_wall_s
    );
    if let Some(message) = &event.message {
        line.push_str(&format!("  {}", message));
    }
    print!("{}", line);
    let _ = io::stdout().flush();
}

fn print_timing_summary(timing: &RunTimingSummary) {
    println!("\nTiming summary:");
    if timing.load_cache_time_s > 0.0 {
        println!("  Cache load: {:.3}s", timing.load_cache_time_s);
    } else {
        println!("  Build:    {:.3}s", timing.build_time_s);
        println!("  Init:     {:.3}s", timing.init_time_s);
        println!("  Stepping: {:.3}s", timing.step_time_s);
        println!("  Finalize: {:.3}s", timing.finalize_time_s);
        println!("  Save:     {:.3}s", timing.save_time_s);
    }
    println!("  Total:    {:.3}s", timing.total_time_s);
    println!("  Iterations: {}", timing.total_iterations);
}

fn cmd_runs(scenario_path: &Path, output: Option<&Path>) -> AppResult<()> {
    let runs = run_service::list_runs(scenario_path, output)?;
    if runs.is_empty() {
        println!("No stored runs for scenario: {}", scenario_path.display());
    } else {
        println!("Stored runs:");
        for manifest in runs {
            println!(
                "  {} ({}, {} divergent)",
                manifest.run_id, manifest.timestamp, manifest.divergent_steps
            );
        }
    }
    Ok(())
}

fn cmd_show_run(scenario_path: &Path, run_id: &str, output: Option<&Path>) -> AppResult<()> {
    println!("Loading run: {}", run_id);
    let (manifest, iterations, divergences) = run_service::load_run(scenario_path, output, run_id)?;

    println!("\nRun Summary:");
    println!("  Scenario: {}", manifest.scenario_name);
    println!("  Created: {}", manifest.timestamp);
    println!("  Coupling points: {}", manifest.coupling_points.join(", "));
    println!("\nIterations:");
    for row in &iterations {
        println!("  {}  step {:>4}  {:>3}", row.date, row.step, row.iterations);
    }
    println!("\nDivergent steps: {}", divergences.len());
    for row in &divergences {
        println!("  {}  step {:>4}  {:>3}", row.date, row.step, row.iterations_at_abort);
    }
    Ok(())
}

fn cmd_invert(thermal: f64, guess: Option<f64>, scenario: Option<&Path>) -> AppResult<()> {
    let (heat_rate, inverter) = match scenario {
        Some(path) => {
            let scenario = project_service::load_scenario(path)?;
            (scenario.heat_rate, scenario.inverter)
        }
        None => (HeatRateDef::default(), InverterDef::default()),
    };

    let report = invert_thermal_power(heat_rate, inverter, thermal, guess)?;
    println!("Thermal power: {:.4} MW", report.thermal_mw);
    println!("Initial guess: {:.4} MW", report.initial_guess_mw);
    println!("Active power:  {:.4} MW", report.active_mw);
    println!("Heat rate:     {:.4} MJ/kWh", report.heat_rate);
    println!(
        "Newton: {} iterations, residual {:.3e}{}",
        report.iterations,
        report.residual,
        if report.converged { "" } else { " (not converged)" }
    );
    Ok(())
}
