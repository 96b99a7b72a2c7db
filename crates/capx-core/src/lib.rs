//! # capx-core: Orchestration Core Types
//!
//! Shared data model for the capx capacity-expansion orchestration engine:
//!
//! - [`error`]: the unified [`CapxError`] taxonomy (configuration vs data
//!   errors) used across the workspace.
//! - [`model`]: the accumulating optimization [`Model`] symbol table that
//!   formulation modules contribute sets, params, vars, and constraints to.
//! - [`context`]: [`Axis`] enumeration plus the typed [`BuildContext`] bag
//!   of cross-module state populated in dependency order.
//! - [`cell`]: solve-cell identity ([`CellId`]) and the per-cell state
//!   machine ([`CellState`], [`FailureReason`]).
//! - [`linking`]: immutable [`LinkingDecision`] values carried along the
//!   cell DAG edges.
//! - [`frame`]: [`ResultFrame`] accumulators merged into scenario-level
//!   result tables.
//! - [`diagnostics`]: the append-only [`ValidationCollector`] for non-fatal
//!   data-quality findings.

pub mod cell;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod linking;
pub mod model;

pub use cell::{CellId, CellState, FailureReason};
pub use context::{Axis, BuildContext, RequiredModules};
pub use diagnostics::{ValidationCollector, ValidationFinding, ValidationSeverity};
pub use error::{CapxError, CapxResult, ErrorClass};
pub use frame::ResultFrame;
pub use linking::LinkingDecision;
pub use model::{ComponentKind, IndexKey, Model, SymbolDef};
