//! Registry of available solver backends.

use crate::backend::{SolverBackend, StubSolver};
use anyhow::{anyhow, Result};
use std::sync::Arc;

/// Named solver backends a run can select by string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SolverKind {
    #[default]
    Stub,
}

impl SolverKind {
    pub fn from_str(input: &str) -> Result<Self> {
        match input.to_ascii_lowercase().as_str() {
            "stub" | "default" => Ok(SolverKind::Stub),
            other => Err(anyhow!(
                "unknown solver '{}'; supported values: {}",
                other,
                Self::available().join(", ")
            )),
        }
    }

    pub fn build_solver(self) -> Arc<dyn SolverBackend> {
        match self {
            SolverKind::Stub => Arc::new(StubSolver),
        }
    }

    pub fn available() -> &'static [&'static str] {
        &["stub"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolverKind::Stub => "stub",
        }
    }
}
