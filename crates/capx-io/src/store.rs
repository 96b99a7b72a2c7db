//! Persistent results store with stage-then-swap imports.
//!
//! Result tables are written into a run-scoped staging directory first and
//! atomically renamed into the scenario's permanent directory on commit, so
//! a partially completed import can be retried without duplicate rows.
//!
//! Staging directories are keyed by `(scenario_id, run_id)` where the run id
//! is a fresh UUID per invocation, so concurrent runs of *different*
//! scenarios never contend. Concurrent runs of the *same* scenario are
//! rejected via a scenario-scoped lock file.
//!
//! Layout:
//!
//! ```text
//! store_root/
//!   .locks/<scenario_id>.lock            # held while an import is staged
//!   .staging/<scenario_id>-<run_id>/     # in-flight tables
//!   <scenario_id>/
//!     <table>.csv                        # committed result tables
//!     validation_log.csv
//!     import_manifest.json
//! ```

use anyhow::Context;
use capx_core::{CapxError, CapxResult, ResultFrame, ValidationFinding};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Scenario-scoped results store rooted at a directory.
pub struct ResultsStore {
    root: PathBuf,
}

/// Metadata written alongside a committed import.
#[derive(Debug, Serialize, Deserialize)]
pub struct ImportManifest {
    pub scenario_id: String,
    pub run_id: String,
    pub committed_at: DateTime<Utc>,
    pub tables: Vec<String>,
}

impl ResultsStore {
    pub fn open(root: impl Into<PathBuf>) -> CapxResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Begin a staged import for one scenario, taking the scenario lock.
    pub fn begin(&self, scenario_id: &str) -> CapxResult<StagedImport> {
        let run_id = Uuid::new_v4();
        let locks_dir = self.root.join(".locks");
        fs::create_dir_all(&locks_dir)?;
        let lock_path = locks_dir.join(format!("{scenario_id}.lock"));
        match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(CapxError::ScenarioLocked {
                    scenario_id: scenario_id.to_string(),
                })
            }
            Err(err) => return Err(err.into()),
        }
        let staging_dir = self
            .root
            .join(".staging")
            .join(format!("{scenario_id}-{run_id}"));
        fs::create_dir_all(&staging_dir)?;
        Ok(StagedImport {
            store_root: self.root.clone(),
            scenario_id: scenario_id.to_string(),
            run_id,
            staging_dir,
            lock_path,
            tables: Vec::new(),
            committed: false,
        })
    }

    /// Read back a committed table (header row plus data rows).
    pub fn read_table(
        &self,
        scenario_id: &str,
        table: &str,
    ) -> CapxResult<(Vec<String>, Vec<Vec<String>>)> {
        let path = self.root.join(scenario_id).join(format!("{table}.csv"));
        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| CapxError::Other(format!("opening '{}': {e}", path.display())))?;
        let header = reader
            .headers()
            .map_err(|e| CapxError::Other(format!("reading '{table}' header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| CapxError::Other(format!("reading '{table}': {e}")))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok((header, rows))
    }

    pub fn manifest(&self, scenario_id: &str) -> CapxResult<ImportManifest> {
        let path = self.root.join(scenario_id).join("import_manifest.json");
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text)
            .map_err(|e| CapxError::Other(format!("parsing '{}': {e}", path.display())))
    }
}

/// An in-flight import: tables accumulate in staging until [`commit`].
///
/// Dropping without committing releases the lock and discards the staging
/// directory, leaving previously committed tables untouched.
///
/// [`commit`]: StagedImport::commit
#[derive(Debug)]
pub struct StagedImport {
    store_root: PathBuf,
    scenario_id: String,
    run_id: Uuid,
    staging_dir: PathBuf,
    lock_path: PathBuf,
    tables: Vec<String>,
    committed: bool,
}

impl StagedImport {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Stage one merged result frame as a CSV table.
    pub fn write_frame(&mut self, frame: &ResultFrame) -> CapxResult<()> {
        let (header, rows) = frame.to_rows();
        self.write_table(frame.name(), &header, &rows)
    }

    /// Stage the scenario validation log.
    pub fn write_validation_log(&mut self, findings: &[ValidationFinding]) -> CapxResult<()> {
        let header: Vec<String> = ["module", "table", "severity", "message"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows: Vec<Vec<String>> = findings
            .iter()
            .map(|f| {
                vec![
                    f.module.clone(),
                    f.table.clone(),
                    f.severity.as_str().to_string(),
                    f.message.clone(),
                ]
            })
            .collect();
        self.write_table("validation_log", &header, &rows)
    }

    fn write_table(&mut self, name: &str, header: &[String], rows: &[Vec<String>]) -> CapxResult<()> {
        let path = self.staging_dir.join(format!("{name}.csv"));
        let mut writer = csv::Writer::from_path(&path)
            .map_err(|e| CapxError::Other(format!("creating '{}': {e}", path.display())))?;
        writer
            .write_record(header)
            .map_err(|e| CapxError::Other(format!("writing '{name}' header: {e}")))?;
        for row in rows {
            writer
                .write_record(row)
                .map_err(|e| CapxError::Other(format!("writing '{name}': {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| CapxError::Other(format!("flushing '{name}': {e}")))?;
        if !self.tables.contains(&name.to_string()) {
            self.tables.push(name.to_string());
        }
        Ok(())
    }

    /// Swap staged tables into the permanent scenario directory.
    pub fn commit(mut self) -> CapxResult<ImportManifest> {
        let scenario_dir = self.store_root.join(&self.scenario_id);
        fs::create_dir_all(&scenario_dir)?;
        for table in &self.tables {
            let file = format!("{table}.csv");
            fs::rename(self.staging_dir.join(&file), scenario_dir.join(&file))
                .with_context(|| format!("swapping staged table '{table}' into place"))
                .map_err(CapxError::from)?;
        }
        let manifest = ImportManifest {
            scenario_id: self.scenario_id.clone(),
            run_id: self.run_id.to_string(),
            committed_at: Utc::now(),
            tables: self.tables.clone(),
        };
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| CapxError::Other(format!("serializing import manifest: {e}")))?;
        fs::write(scenario_dir.join("import_manifest.json"), json)?;
        self.committed = true;
        self.cleanup();
        Ok(manifest)
    }

    fn cleanup(&self) {
        let _ = fs::remove_dir_all(&self.staging_dir);
        let _ = fs::remove_file(&self.lock_path);
    }
}

impl Drop for StagedImport {
    fn drop(&mut self) {
        if !self.committed {
            self.cleanup();
        }
    }
}
