//! Run storage API.

use crate::report::{parse_divergences, parse_iterations, render_divergences, render_iterations};
use crate::types::{DivergenceRow, IterationRow, RunManifest};
use crate::{ResultsError, ResultsResult};
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const ITERATIONS_FILE: &str = "iterations.txt";
pub const DIVERGENCES_FILE: &str = "divergences.txt";

#[derive(Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Directory holding everything a run writes, point logs included.
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join(MANIFEST_FILE).exists()
    }

    pub fn save_run(
        &self,
        manifest: &RunManifest,
        iterations: &[IterationRow],
        divergences: &[DivergenceRow],
    ) -> ResultsResult<PathBuf> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(run_dir.join(MANIFEST_FILE), manifest_json)?;
        fs::write(run_dir.join(ITERATIONS_FILE), render_iterations(iterations))?;
        fs::write(run_dir.join(DIVERGENCES_FILE), render_divergences(divergences))?;

        Ok(run_dir)
    }

    fn read(&self, run_id: &str, file: &str) -> ResultsResult<String> {
        let path = self.run_dir(run_id).join(file);
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        Ok(fs::read_to_string(path)?)
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let content = self.read(run_id, MANIFEST_FILE)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_iterations(&self, run_id: &str) -> ResultsResult<Vec<IterationRow>> {
        parse_iterations(&self.read(run_id, ITERATIONS_FILE)?)
    }

    pub fn load_divergences(&self, run_id: &str) -> ResultsResult<Vec<DivergenceRow>> {
        parse_divergences(&self.read(run_id, DIVERGENCES_FILE)?)
    }

    pub fn list_runs(&self, scenario_name: &str) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id)
                    && manifest.scenario_name == scenario_name
                {
                    runs.push(manifest);
                }
            }
        }

        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}
