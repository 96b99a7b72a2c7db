use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::orchestrator::RunSummary;
use capx_core::CellState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellRunRecord {
    pub cell: String,
    pub status: String,
    pub failure: Option<String>,
    pub objective: Option<f64>,
    pub solve_time_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub scenario_id: String,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub solver: String,
    pub modules: Vec<String>,
    pub succeeded: usize,
    pub failed: usize,
    pub validation_findings: usize,
    pub cells: Vec<CellRunRecord>,
}

impl RunManifest {
    pub fn from_summary(
        summary: &RunSummary,
        run_id: impl Into<String>,
        solver: &str,
        started_at: DateTime<Utc>,
    ) -> Self {
        let cells = summary
            .records
            .iter()
            .map(|record| {
                let failure = match &record.state {
                    CellState::Failed(reason) => Some(reason.to_string()),
                    _ => None,
                };
                CellRunRecord {
                    cell: record.id.to_string(),
                    status: record.state.label().to_string(),
                    failure,
                    objective: record.objective,
                    solve_time_ms: record.solve_time_ms,
                }
            })
            .collect();
        Self {
            scenario_id: summary.scenario_id.clone(),
            run_id: run_id.into(),
            started_at,
            finished_at: Utc::now(),
            solver: solver.to_string(),
            modules: summary.modules.clone(),
            succeeded: summary.succeeded(),
            failed: summary.failed(),
            validation_findings: summary.validation.count(),
            cells,
        }
    }
}

pub fn write_run_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(manifest).context("serializing run manifest to JSON")?;
    fs::write(path, json)
        .with_context(|| format!("writing run manifest '{}'", path.display()))?;
    Ok(())
}

pub fn load_run_manifest(path: &Path) -> Result<RunManifest> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening run manifest '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing run manifest '{}'", path.display()))
}
