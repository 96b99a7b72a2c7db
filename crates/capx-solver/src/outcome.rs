//! Outcome types returned by solver backends.

use capx_core::IndexKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Status of a solve attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Optimal solution found.
    Optimal,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// Solver hit its time limit.
    Timeout,
    /// Solver crashed or reported an internal error.
    Error,
}

impl SolveStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::Infeasible => write!(f, "infeasible"),
            SolveStatus::Unbounded => write!(f, "unbounded"),
            SolveStatus::Timeout => write!(f, "timeout"),
            SolveStatus::Error => write!(f, "error"),
        }
    }
}

/// Everything a backend reports back for one cell: status, objective, and
/// the solved values of each variable keyed by index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    pub values: BTreeMap<String, BTreeMap<IndexKey, f64>>,
    pub message: Option<String>,
    pub solve_time_ms: u64,
}

impl SolveOutcome {
    pub fn failed(status: SolveStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            objective: None,
            values: BTreeMap::new(),
            message: Some(message.into()),
            solve_time_ms: 0,
        }
    }

    pub fn variable(&self, symbol: &str) -> Option<&BTreeMap<IndexKey, f64>> {
        self.values.get(symbol)
    }
}

/// Per-solve options passed through to the backend.
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    pub timeout: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&SolveStatus::Infeasible).unwrap();
        assert_eq!(json, "\"infeasible\"");
        let back: SolveStatus = serde_json::from_str("\"timeout\"").unwrap();
        assert_eq!(back, SolveStatus::Timeout);
    }

    #[test]
    fn only_optimal_counts_as_success() {
        assert!(SolveStatus::Optimal.is_success());
        assert!(!SolveStatus::Infeasible.is_success());
        assert!(!SolveStatus::Timeout.is_success());
    }
}
