//! Unified error types for the capx ecosystem.
//!
//! This module provides the common error type [`CapxError`] used across the
//! model-building pipeline, the temporal decomposition, and the results
//! aggregation. Errors fall into three classes (see [`ErrorClass`]):
//!
//! - **Configuration** errors (unknown modules, dependency cycles, symbol
//!   references to components that were never declared) abort the whole
//!   scenario. They indicate a broken catalog or scenario definition and are
//!   never recoverable at run time.
//! - **Data** errors (missing input values, unresolved module tags) abort
//!   the affected solve cell but not its siblings.
//! - Everything else (I/O, serialization, wrapped external errors) is
//!   treated as data-class for propagation purposes.
//!
//! Solver outcomes (infeasible, unbounded, timeout) are not errors in this
//! taxonomy; they are recorded per cell as a
//! [`FailureReason`](crate::cell::FailureReason).

use crate::context::Axis;
use thiserror::Error;

/// Unified error type for all capx operations.
#[derive(Error, Debug)]
pub enum CapxError {
    /// A module name was looked up that is not in the registry.
    #[error("unknown module '{module}'")]
    UnknownModule { module: String },

    /// A registered module declares a prerequisite that is absent from the
    /// registry. Caught at registry construction time.
    #[error("module '{module}' lists prerequisite '{prerequisite}' which is not registered")]
    MissingPrerequisite {
        module: String,
        prerequisite: String,
    },

    /// Two modules were registered under the same name.
    #[error("module '{module}' registered twice")]
    DuplicateModule { module: String },

    /// The transitive prerequisite graph of a module contains a cycle.
    #[error("cyclic module dependency: {}", cycle.join(" -> "))]
    CyclicModuleDependency { cycle: Vec<String> },

    /// The linking edges declared by the scenario configuration form a cycle
    /// between stages.
    #[error("cyclic linking between stages: {detail}")]
    CyclicLinking { detail: String },

    /// A module referenced a model symbol that no earlier module declared.
    #[error("module '{module}' referenced undeclared symbol '{symbol}'")]
    UndeclaredSymbol { module: String, symbol: String },

    /// A module tried to declare a symbol name that is already taken.
    #[error("symbol '{symbol}' declared by '{module}' is already declared by '{declared_by}'")]
    DuplicateSymbol {
        symbol: String,
        module: String,
        declared_by: String,
    },

    /// A required parameter value was absent from the cell's inputs and the
    /// symbol declares no default.
    #[error("missing input for symbol '{symbol}' at index [{key}]")]
    MissingInput { symbol: String, key: String },

    /// An axis-discriminator tag found in the scenario data does not map to
    /// any registered module.
    #[error("unresolved {axis} tag '{tag}' on entities: {}", entities.join(", "))]
    UnresolvedModule {
        axis: Axis,
        tag: String,
        entities: Vec<String>,
    },

    /// Two modules export the same value column into the same result frame.
    #[error("result column '{column}' in frame '{frame}' exported by both '{first}' and '{second}'")]
    ResultColumnConflict {
        frame: String,
        column: String,
        first: String,
        second: String,
    },

    /// Two contributions to the same result frame disagree on the index
    /// column set.
    #[error("frame '{frame}' index mismatch: expected [{}], found [{}]", expected.join(", "), found.join(", "))]
    FrameIndexMismatch {
        frame: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Another run of the same scenario holds the results-store lock.
    #[error("scenario '{scenario_id}' is already being imported by another run")]
    ScenarioLocked { scenario_id: String },

    /// I/O errors (file access, staging moves, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors (wrapped external errors, internal invariants).
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using CapxError.
pub type CapxResult<T> = Result<T, CapxError>;

/// Propagation class of an error (spec-level taxonomy).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Fatal for the whole scenario.
    Configuration,
    /// Fatal for the affected cell only.
    Data,
}

impl CapxError {
    /// Classify this error for failure propagation.
    pub fn class(&self) -> ErrorClass {
        match self {
            CapxError::UnknownModule { .. }
            | CapxError::MissingPrerequisite { .. }
            | CapxError::DuplicateModule { .. }
            | CapxError::CyclicModuleDependency { .. }
            | CapxError::CyclicLinking { .. }
            | CapxError::UndeclaredSymbol { .. }
            | CapxError::DuplicateSymbol { .. }
            | CapxError::ResultColumnConflict { .. }
            | CapxError::FrameIndexMismatch { .. }
            | CapxError::ScenarioLocked { .. } => ErrorClass::Configuration,
            CapxError::MissingInput { .. }
            | CapxError::UnresolvedModule { .. }
            | CapxError::Io(_)
            | CapxError::Other(_) => ErrorClass::Data,
        }
    }

    /// Whether this error must abort the entire scenario.
    pub fn aborts_scenario(&self) -> bool {
        self.class() == ErrorClass::Configuration
    }
}

impl From<anyhow::Error> for CapxError {
    fn from(err: anyhow::Error) -> Self {
        CapxError::Other(err.to_string())
    }
}

impl From<String> for CapxError {
    fn from(s: String) -> Self {
        CapxError::Other(s)
    }
}

impl From<&str> for CapxError {
    fn from(s: &str) -> Self {
        CapxError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_abort_the_scenario() {
        let err = CapxError::UnknownModule {
            module: "gen_fancy".into(),
        };
        assert!(err.aborts_scenario());

        let err = CapxError::MissingInput {
            symbol: "load_mw".into(),
            key: "zone_a, 1".into(),
        };
        assert!(!err.aborts_scenario());
        assert_eq!(err.class(), ErrorClass::Data);
    }

    #[test]
    fn cycle_error_displays_path() {
        let err = CapxError::CyclicModuleDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn unresolved_module_names_offending_entities() {
        let err = CapxError::UnresolvedModule {
            axis: Axis::CapacityType,
            tag: "gen_mystery".into(),
            entities: vec!["plant_1".into(), "plant_2".into()],
        };
        let text = err.to_string();
        assert!(text.contains("gen_mystery"));
        assert!(text.contains("plant_1, plant_2"));
    }
}
