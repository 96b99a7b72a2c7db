//! Input sources and the persistent results store for capx scenarios.

pub mod source;
pub mod store;

pub use source::{CellIo, MemorySource, TabularSource};
pub use store::{ImportManifest, ResultsStore, StagedImport};
