//! Cross-module build state: axes, required-module lists, and the typed
//! [`BuildContext`] bag shared by all modules while a cell's model is built.

use crate::linking::LinkingDecision;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A category of swappable formulation behavior.
///
/// Each axis has a closed enumeration of known module tags (see the registry
/// in capx-modules); scenario input data selects, per axis, which of those
/// modules a particular scenario needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    CapacityType,
    OperationalType,
    AvailabilityType,
    ReserveType,
    TxCapacityType,
    TxOperationalType,
    PolicyType,
}

impl Axis {
    pub const ALL: [Axis; 7] = [
        Axis::CapacityType,
        Axis::OperationalType,
        Axis::AvailabilityType,
        Axis::ReserveType,
        Axis::TxCapacityType,
        Axis::TxOperationalType,
        Axis::PolicyType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::CapacityType => "capacity_type",
            Axis::OperationalType => "operational_type",
            Axis::AvailabilityType => "availability_type",
            Axis::ReserveType => "reserve_type",
            Axis::TxCapacityType => "tx_capacity_type",
            Axis::TxOperationalType => "tx_operational_type",
            Axis::PolicyType => "policy_type",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-axis required-module lists for one scenario.
///
/// Lists are kept sorted by module name so that identical input data always
/// produces an identical, identically-ordered resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredModules {
    by_axis: BTreeMap<Axis, Vec<String>>,
}

impl RequiredModules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the required modules for an axis (sorted, de-duplicated).
    pub fn insert(&mut self, axis: Axis, mut modules: Vec<String>) {
        modules.sort();
        modules.dedup();
        self.by_axis.insert(axis, modules);
    }

    pub fn for_axis(&self, axis: Axis) -> &[String] {
        self.by_axis.get(&axis).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All required modules across axes, in axis order then name order.
    pub fn all(&self) -> Vec<String> {
        let mut out = Vec::new();
        for axis in Axis::ALL {
            out.extend(self.for_axis(axis).iter().cloned());
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.by_axis.values().all(Vec::is_empty)
    }
}

/// Shared mutable state for one cell's model build.
///
/// Fields are declared up front, one per cross-module datum; producer
/// modules populate them and downstream modules read them. The composer's
/// dependency ordering guarantees a field is never read before its producer
/// has run. A fresh context is created per cell and discarded after the
/// build.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    /// Per-axis required modules resolved from the scenario data.
    pub required: RequiredModules,
    /// Capacity-type tag per project (populated by the projects module).
    pub capacity_type_of_project: BTreeMap<String, String>,
    /// Operational-type tag per project.
    pub operational_type_of_project: BTreeMap<String, String>,
    /// Availability-type tag per project.
    pub availability_type_of_project: BTreeMap<String, String>,
    /// Capacity-type tag per transmission line.
    pub tx_capacity_type_of_line: BTreeMap<String, String>,
    /// Operational-type tag per transmission line.
    pub tx_operational_type_of_line: BTreeMap<String, String>,
    /// Projects contributing to each reserve product.
    pub reserve_projects: BTreeMap<String, Vec<String>>,
    /// Upward-reserve variable names per project, appended by reserve modules.
    pub headroom_variables: BTreeMap<String, Vec<String>>,
    /// Downward-reserve variable names per project.
    pub footroom_variables: BTreeMap<String, Vec<String>>,
    /// Linking decisions fixed from upstream cells, keyed by decision name.
    pub linking_inputs: BTreeMap<String, LinkingDecision>,
}

impl BuildContext {
    /// Context for one cell: the scenario's resolved modules plus the
    /// linking decisions this cell consumes.
    pub fn for_cell(
        required: RequiredModules,
        linking_inputs: BTreeMap<String, LinkingDecision>,
    ) -> Self {
        Self {
            required,
            linking_inputs,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_modules_are_sorted_and_deduplicated() {
        let mut required = RequiredModules::new();
        required.insert(
            Axis::CapacityType,
            vec!["stor_spec".into(), "gen_spec".into(), "gen_spec".into()],
        );
        assert_eq!(
            required.for_axis(Axis::CapacityType),
            ["gen_spec".to_string(), "stor_spec".to_string()]
        );
        assert!(required.for_axis(Axis::PolicyType).is_empty());
    }

    #[test]
    fn all_lists_axes_in_fixed_order() {
        let mut required = RequiredModules::new();
        required.insert(Axis::PolicyType, vec!["carbon_cap".into()]);
        required.insert(Axis::CapacityType, vec!["gen_spec".into()]);
        assert_eq!(
            required.all(),
            vec!["gen_spec".to_string(), "carbon_cap".to_string()]
        );
    }

    #[test]
    fn axis_serializes_snake_case() {
        let json = serde_json::to_string(&Axis::TxCapacityType).unwrap();
        assert_eq!(json, "\"tx_capacity_type\"");
    }
}
