//! Input data sources consumed by formulation modules.
//!
//! The core only needs two capabilities from a scenario's input data: a
//! column projection over named tables and, for database-backed sources, a
//! parameterized query. Exact file and table layout belongs to the data
//! layer, not to the modules.

use capx_core::{CapxError, CapxResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Read capability handed to module callbacks for one cell.
pub trait CellIo: Send + Sync {
    /// Whether the named table exists in this source.
    fn has_table(&self, table: &str) -> bool;

    /// Project the named columns of a table, in the requested order.
    fn read_columns(&self, table: &str, columns: &[&str]) -> CapxResult<Vec<Vec<String>>>;

    /// Run a parameterized query. File-backed sources do not support this.
    fn query(&self, sql: &str, params: &[&str]) -> CapxResult<Vec<Vec<String>>> {
        let _ = (sql, params);
        Err(CapxError::Other(
            "this input source does not support parameterized queries".into(),
        ))
    }
}

/// Delimited files under a directory, one table per `<name>.<ext>` file
/// with a header row. Scenario inputs use tab-delimited `.tab` files; the
/// results store uses comma-delimited `.csv` files.
pub struct TabularSource {
    root: PathBuf,
    extension: &'static str,
    delimiter: u8,
}

impl TabularSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: "tab",
            delimiter: b'\t',
        }
    }

    /// Reads committed `.csv` tables, e.g. a scenario directory inside the
    /// results store.
    pub fn csv(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: "csv",
            delimiter: b',',
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.{}", self.extension))
    }
}

impl CellIo for TabularSource {
    fn has_table(&self, table: &str) -> bool {
        self.table_path(table).is_file()
    }

    fn read_columns(&self, table: &str, columns: &[&str]) -> CapxResult<Vec<Vec<String>>> {
        let path = self.table_path(table);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&path)
            .map_err(|e| {
                CapxError::Other(format!("opening table '{}': {e}", path.display()))
            })?;
        let headers = reader
            .headers()
            .map_err(|e| CapxError::Other(format!("reading header of '{table}': {e}")))?
            .clone();
        let positions = column_positions(table, &headers, columns)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| CapxError::Other(format!("reading table '{table}': {e}")))?;
            rows.push(
                positions
                    .iter()
                    .map(|&i| record.get(i).unwrap_or_default().to_string())
                    .collect(),
            );
        }
        Ok(rows)
    }
}

fn column_positions(
    table: &str,
    headers: &csv::StringRecord,
    columns: &[&str],
) -> CapxResult<Vec<usize>> {
    columns
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h == *column)
                .ok_or_else(|| {
                    CapxError::Other(format!("table '{table}' has no column '{column}'"))
                })
        })
        .collect()
}

/// In-memory source for unit tests and programmatic scenario construction.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: BTreeMap<String, MemoryTable>,
}

#[derive(Debug, Clone)]
struct MemoryTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table<S: Into<String>>(
        mut self,
        name: &str,
        headers: &[&str],
        rows: Vec<Vec<S>>,
    ) -> Self {
        self.tables.insert(
            name.to_string(),
            MemoryTable {
                headers: headers.iter().map(|h| h.to_string()).collect(),
                rows: rows
                    .into_iter()
                    .map(|row| row.into_iter().map(Into::into).collect())
                    .collect(),
            },
        );
        self
    }
}

impl CellIo for MemorySource {
    fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    fn read_columns(&self, table: &str, columns: &[&str]) -> CapxResult<Vec<Vec<String>>> {
        let entry = self
            .tables
            .get(table)
            .ok_or_else(|| CapxError::Other(format!("no table '{table}' in memory source")))?;
        let positions: Vec<usize> = columns
            .iter()
            .map(|column| {
                entry
                    .headers
                    .iter()
                    .position(|h| h == column)
                    .ok_or_else(|| {
                        CapxError::Other(format!("table '{table}' has no column '{column}'"))
                    })
            })
            .collect::<CapxResult<_>>()?;
        Ok(entry
            .rows
            .iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect())
    }
}
