//! Persists a finished run into the results store and replays module
//! import hooks against the committed tables.

use crate::orchestrator::RunSummary;
use anyhow::{Context, Result};
use capx_io::{ImportManifest, ResultsStore, TabularSource};
use capx_modules::PipelineComposer;
use tracing::info;

/// Stages every aggregated frame plus the validation log, then commits the
/// swap. On success the scenario directory holds the complete new results
/// and the previous results are gone.
pub fn import_results(store: &ResultsStore, summary: &RunSummary) -> Result<ImportManifest> {
    let mut staged = store
        .begin(&summary.scenario_id)
        .with_context(|| format!("starting import for scenario '{}'", summary.scenario_id))?;
    for frame in summary.frames.values() {
        staged
            .write_frame(frame)
            .with_context(|| format!("staging frame '{}'", frame.name()))?;
    }
    staged
        .write_validation_log(summary.validation.findings())
        .context("staging validation log")?;
    let manifest = staged.commit().context("committing results import")?;
    info!(
        scenario = %manifest.scenario_id,
        run = %manifest.run_id,
        tables = manifest.tables.len(),
        "results committed"
    );
    Ok(manifest)
}

/// Runs each module's import hook over the committed scenario directory.
pub fn verify_import(
    store: &ResultsStore,
    composer: &PipelineComposer,
    summary: &RunSummary,
) -> Result<()> {
    let scenario_dir = store.root().join(&summary.scenario_id);
    let committed = TabularSource::csv(scenario_dir);
    composer
        .import(&summary.modules, &committed, &summary.scenario_id)
        .with_context(|| format!("verifying import for scenario '{}'", summary.scenario_id))?;
    Ok(())
}
