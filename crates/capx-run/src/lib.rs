//! Run orchestration: executes a scenario's cell DAG, aggregates results,
//! imports them into the results store, and renders the run report.

pub mod importer;
pub mod inputs;
pub mod links;
pub mod manifest;
pub mod orchestrator;
pub mod report;

pub use importer::{import_results, verify_import};
pub use inputs::{DirectoryInputs, InputProvider, SharedInputs};
pub use links::LinkStore;
pub use manifest::{load_run_manifest, write_run_manifest, CellRunRecord, RunManifest};
pub use orchestrator::{CellRecord, RunConfig, RunSummary, SolveOrchestrator};
pub use report::render_report;
