//! Scenario configuration, module resolution, and temporal decomposition.
//!
//! A scenario names its subproblems, stages, iteration counts, and linking
//! rules; this crate loads and validates that configuration, resolves the
//! module set its input tables imply, and expands it into the cell DAG the
//! orchestrator executes.

pub mod decompose;
pub mod resolver;
pub mod spec;

pub use decompose::{decompose, CellPlan, LinkProduction, PlannedCell};
pub use resolver::{build_targets, ComponentResolver};
pub use spec::{
    load_config_from_path, validate_config, LinkingRule, ScenarioConfig, SubproblemSpec,
};
