//! Result frames: tabular accumulators for per-cell solve outputs.

use crate::cell::CellId;
use crate::error::{CapxError, CapxResult};
use crate::model::IndexKey;
use std::collections::BTreeMap;

/// An accumulator keyed by a declared set of index columns, with value
/// columns contributed by different modules.
///
/// All contributors to the same frame must agree on the index-column set,
/// and no two modules may own the same value column; both violations are
/// typed errors rather than silent overwrites.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultFrame {
    name: String,
    index_columns: Vec<String>,
    value_columns: Vec<String>,
    /// Owning module per value column, for conflict reporting.
    column_owners: BTreeMap<String, String>,
    rows: BTreeMap<IndexKey, BTreeMap<String, f64>>,
}

impl ResultFrame {
    pub fn new(name: impl Into<String>, index_columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            index_columns: index_columns.iter().map(|c| c.to_string()).collect(),
            value_columns: Vec::new(),
            column_owners: BTreeMap::new(),
            rows: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_columns(&self) -> &[String] {
        &self.index_columns
    }

    pub fn value_columns(&self) -> &[String] {
        &self.value_columns
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Declare a value column owned by `module`.
    pub fn add_column(&mut self, module: &str, column: &str) -> CapxResult<()> {
        if let Some(owner) = self.column_owners.get(column) {
            if owner != module {
                return Err(CapxError::ResultColumnConflict {
                    frame: self.name.clone(),
                    column: column.to_string(),
                    first: owner.clone(),
                    second: module.to_string(),
                });
            }
            return Ok(());
        }
        self.column_owners
            .insert(column.to_string(), module.to_string());
        self.value_columns.push(column.to_string());
        Ok(())
    }

    /// Write one value; the column must have been declared first.
    pub fn set(&mut self, key: IndexKey, column: &str, value: f64) -> CapxResult<()> {
        if key.len() != self.index_columns.len() {
            return Err(CapxError::FrameIndexMismatch {
                frame: self.name.clone(),
                expected: self.index_columns.clone(),
                found: key.clone(),
            });
        }
        if !self.column_owners.contains_key(column) {
            return Err(CapxError::Other(format!(
                "column '{column}' was not declared on frame '{}'",
                self.name
            )));
        }
        self.rows.entry(key).or_default().insert(column.to_string(), value);
        Ok(())
    }

    /// Merge another contribution to the same frame.
    ///
    /// Index columns must match exactly; value columns are unioned, with a
    /// collision between two different owning modules rejected.
    pub fn merge(&mut self, other: ResultFrame) -> CapxResult<()> {
        if other.index_columns != self.index_columns {
            return Err(CapxError::FrameIndexMismatch {
                frame: self.name.clone(),
                expected: self.index_columns.clone(),
                found: other.index_columns,
            });
        }
        for (column, owner) in &other.column_owners {
            self.add_column(owner, column)?;
        }
        for (key, values) in other.rows {
            self.rows.entry(key).or_default().extend(values);
        }
        Ok(())
    }

    /// Re-key the frame with the cell coordinates prepended to the index, so
    /// frames from different cells never collide when merged.
    pub fn scoped_to_cell(self, cell: CellId) -> ResultFrame {
        let mut index_columns = vec![
            "subproblem_id".to_string(),
            "stage_id".to_string(),
            "weather_iteration".to_string(),
            "hydro_iteration".to_string(),
            "availability_iteration".to_string(),
        ];
        index_columns.extend(self.index_columns.iter().cloned());
        let prefix = vec![
            cell.subproblem.to_string(),
            cell.stage.to_string(),
            cell.weather_iteration.to_string(),
            cell.hydro_iteration.to_string(),
            cell.availability_iteration.to_string(),
        ];
        let mut scoped = ResultFrame {
            name: self.name,
            index_columns,
            value_columns: self.value_columns,
            column_owners: self.column_owners,
            rows: BTreeMap::new(),
        };
        for (key, values) in self.rows {
            let mut scoped_key = prefix.clone();
            scoped_key.extend(key);
            scoped.rows.insert(scoped_key, values);
        }
        scoped
    }

    /// Render as header row plus data rows for persistence.
    pub fn to_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let mut header = self.index_columns.clone();
        header.extend(self.value_columns.iter().cloned());
        let mut rows = Vec::with_capacity(self.rows.len());
        for (key, values) in &self.rows {
            let mut row = key.clone();
            for column in &self.value_columns {
                row.push(
                    values
                        .get(column)
                        .map(|v| format!("{v}"))
                        .unwrap_or_default(),
                );
            }
            rows.push(row);
        }
        (header, rows)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&IndexKey, &BTreeMap<String, f64>)> {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch_frame() -> ResultFrame {
        let mut frame = ResultFrame::new("project_dispatch", &["project", "timepoint"]);
        frame.add_column("gen_simple", "power_mw").unwrap();
        frame
            .set(vec!["plant_a".into(), "t1".into()], "power_mw", 42.0)
            .unwrap();
        frame
    }

    #[test]
    fn column_conflict_between_modules_is_rejected() {
        let mut frame = dispatch_frame();
        let err = frame.add_column("gen_var", "power_mw").unwrap_err();
        assert!(matches!(err, CapxError::ResultColumnConflict { .. }));
        // Re-declaring from the same module is a no-op.
        frame.add_column("gen_simple", "power_mw").unwrap();
        assert_eq!(frame.value_columns(), ["power_mw".to_string()]);
    }

    #[test]
    fn merge_requires_matching_index_columns() {
        let mut frame = dispatch_frame();
        let other = ResultFrame::new("project_dispatch", &["project"]);
        let err = frame.merge(other).unwrap_err();
        assert!(matches!(err, CapxError::FrameIndexMismatch { .. }));
    }

    #[test]
    fn merge_unions_value_columns() {
        let mut frame = dispatch_frame();
        let mut other = ResultFrame::new("project_dispatch", &["project", "timepoint"]);
        other.add_column("reserves", "reg_up_mw").unwrap();
        other
            .set(vec!["plant_a".into(), "t1".into()], "reg_up_mw", 5.0)
            .unwrap();
        frame.merge(other).unwrap();

        let (header, rows) = frame.to_rows();
        assert_eq!(header, ["project", "timepoint", "power_mw", "reg_up_mw"]);
        assert_eq!(rows, vec![vec!["plant_a", "t1", "42", "5"]]);
    }

    #[test]
    fn cell_scoping_prepends_coordinates() {
        let frame = dispatch_frame();
        let scoped = frame.scoped_to_cell(CellId::new(3, 2).with_iterations(1, 0, 0));
        let (header, rows) = scoped.to_rows();
        assert_eq!(header[0], "subproblem_id");
        assert_eq!(header[5], "project");
        assert_eq!(rows[0][..5], ["3", "2", "1", "0", "0"].map(String::from));
    }
}
