//! Maps each cell to the input source it builds from.

use capx_core::{CapxResult, CellId};
use capx_io::{CellIo, MemorySource, TabularSource};
use std::path::PathBuf;

pub trait InputProvider: Send + Sync {
    fn source(&self, cell: &CellId) -> CapxResult<Box<dyn CellIo>>;

    /// Stable identity of the source a cell reads from. Cells returning the
    /// same key share input data, so a data check against one of them covers
    /// all of them.
    fn source_key(&self, cell: &CellId) -> String {
        cell.to_string()
    }
}

/// Directory-per-cell layout: `<root>/<subproblem>/<stage>/` when present,
/// falling back to `<root>/<subproblem>/` and then the root itself, so a
/// single-subproblem scenario keeps its tables flat.
#[derive(Debug, Clone)]
pub struct DirectoryInputs {
    root: PathBuf,
}

impl DirectoryInputs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, cell: &CellId) -> PathBuf {
        let staged = self
            .root
            .join(cell.subproblem.to_string())
            .join(cell.stage.to_string());
        if staged.is_dir() {
            return staged;
        }
        let subproblem = self.root.join(cell.subproblem.to_string());
        if subproblem.is_dir() {
            return subproblem;
        }
        self.root.clone()
    }
}

impl InputProvider for DirectoryInputs {
    fn source(&self, cell: &CellId) -> CapxResult<Box<dyn CellIo>> {
        Ok(Box::new(TabularSource::new(self.resolve(cell))))
    }

    fn source_key(&self, cell: &CellId) -> String {
        self.resolve(cell).display().to_string()
    }
}

/// Every cell reads the same in-memory tables. For tests.
#[derive(Debug, Clone, Default)]
pub struct SharedInputs {
    source: MemorySource,
}

impl SharedInputs {
    pub fn new(source: MemorySource) -> Self {
        Self { source }
    }
}

impl InputProvider for SharedInputs {
    fn source(&self, _cell: &CellId) -> CapxResult<Box<dyn CellIo>> {
        Ok(Box::new(self.source.clone()))
    }

    fn source_key(&self, _cell: &CellId) -> String {
        "shared".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn directory_layout_falls_back_toward_the_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("1").join("2")).unwrap();
        let inputs = DirectoryInputs::new(dir.path());

        let staged = inputs.resolve(&CellId::new(1, 2));
        assert!(staged.ends_with("1/2"));

        let flat = inputs.resolve(&CellId::new(1, 1));
        assert!(flat.ends_with("1"));

        let root = inputs.resolve(&CellId::new(9, 1));
        assert_eq!(root, dir.path());
    }

    #[test]
    fn cells_sharing_a_directory_share_a_source_key() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("1").join("2")).unwrap();
        let inputs = DirectoryInputs::new(dir.path());

        assert_eq!(
            inputs.source_key(&CellId::new(9, 1)),
            inputs.source_key(&CellId::new(9, 2))
        );
        assert_ne!(
            inputs.source_key(&CellId::new(1, 2)),
            inputs.source_key(&CellId::new(1, 1))
        );
    }
}
