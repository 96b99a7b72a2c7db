//! Resolves which modules a scenario needs by scanning its input tables.
//!
//! Every project, transmission line, and reserve row names a tag on one of
//! the module axes; the resolver checks each tag against the registry and
//! turns the union into a [`RequiredModules`] map. Unknown tags fail loudly
//! with the entities that carry them, so a typo in one row of `projects.tab`
//! is reported as exactly that.

use capx_core::{Axis, CapxError, CapxResult, RequiredModules};
use capx_io::CellIo;
use capx_modules::ModuleRegistry;
use std::collections::BTreeMap;

pub struct ComponentResolver<'a> {
    registry: &'a ModuleRegistry,
}

impl<'a> ComponentResolver<'a> {
    pub fn new(registry: &'a ModuleRegistry) -> Self {
        Self { registry }
    }

    /// Scans the scenario inputs and returns the module set they imply.
    /// Output is deterministic: tags on each axis come back sorted and
    /// deduplicated regardless of input row order.
    pub fn resolve(&self, io: &dyn CellIo, features: &[String]) -> CapxResult<RequiredModules> {
        let mut required = RequiredModules::new();

        let projects = io.read_columns(
            "projects",
            &["project", "capacity_type", "operational_type", "availability_type"],
        )?;
        let mut by_tag: BTreeMap<(Axis, String), Vec<String>> = BTreeMap::new();
        for row in &projects {
            for (axis, tag) in [
                (Axis::CapacityType, &row[1]),
                (Axis::OperationalType, &row[2]),
                (Axis::AvailabilityType, &row[3]),
            ] {
                by_tag
                    .entry((axis, tag.clone()))
                    .or_default()
                    .push(row[0].clone());
            }
        }

        if io.has_table("transmission_lines") {
            let lines = io.read_columns(
                "transmission_lines",
                &["tx_line", "tx_capacity_type", "tx_operational_type"],
            )?;
            for row in &lines {
                for (axis, tag) in [
                    (Axis::TxCapacityType, &row[1]),
                    (Axis::TxOperationalType, &row[2]),
                ] {
                    by_tag
                        .entry((axis, tag.clone()))
                        .or_default()
                        .push(row[0].clone());
                }
            }
        }

        if io.has_table("project_reserves") {
            let rows = io.read_columns("project_reserves", &["project", "reserve_type"])?;
            for row in &rows {
                by_tag
                    .entry((Axis::ReserveType, row[1].clone()))
                    .or_default()
                    .push(row[0].clone());
            }
        }

        for feature in features {
            by_tag
                .entry((Axis::PolicyType, feature.clone()))
                .or_default();
        }

        let mut per_axis: BTreeMap<Axis, Vec<String>> = BTreeMap::new();
        for ((axis, tag), mut entities) in by_tag {
            self.check_tag(axis, &tag, &mut entities)?;
            per_axis.entry(axis).or_default().push(tag);
        }
        for (axis, tags) in per_axis {
            required.insert(axis, tags);
        }
        Ok(required)
    }

    fn check_tag(&self, axis: Axis, tag: &str, entities: &mut Vec<String>) -> CapxResult<()> {
        let on_axis = self
            .registry
            .module(tag)
            .ok()
            .and_then(|module| module.axis())
            .map(|found| found == axis)
            .unwrap_or(false);
        if on_axis {
            return Ok(());
        }
        entities.sort();
        entities.dedup();
        Err(CapxError::UnresolvedModule {
            axis,
            tag: tag.to_string(),
            entities: std::mem::take(entities),
        })
    }
}

/// Pipeline targets for a resolved scenario: every required module plus the
/// objective, whose prerequisites pull in the shared infrastructure.
pub fn build_targets(required: &RequiredModules) -> Vec<String> {
    let mut targets = required.all();
    if !targets.iter().any(|name| name == "objective") {
        targets.push("objective".to_string());
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use capx_io::MemorySource;
    use capx_modules::builtin_registry;

    fn source_with_projects(rows: &[[&str; 4]]) -> MemorySource {
        MemorySource::new().with_table(
            "projects",
            &["project", "capacity_type", "operational_type", "availability_type"],
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn project_tags_resolve_onto_their_axes() {
        let registry = builtin_registry().unwrap();
        let io = source_with_projects(&[
            ["coal_1", "gen_spec", "gen_simple", "avail_exogenous"],
            ["wind_1", "gen_new_lin", "gen_var", "avail_exogenous"],
        ]);
        let resolver = ComponentResolver::new(&registry);
        let required = resolver.resolve(&io, &[]).unwrap();
        assert_eq!(
            required.for_axis(Axis::CapacityType),
            ["gen_new_lin", "gen_spec"]
        );
        assert_eq!(
            required.for_axis(Axis::OperationalType),
            ["gen_simple", "gen_var"]
        );
        assert_eq!(
            required.for_axis(Axis::AvailabilityType),
            ["avail_exogenous"]
        );
        assert!(required.for_axis(Axis::ReserveType).is_empty());
    }

    #[test]
    fn unknown_tag_names_the_offending_projects() {
        let registry = builtin_registry().unwrap();
        let io = source_with_projects(&[
            ["plant_2", "gen_mystery", "gen_simple", "avail_exogenous"],
            ["plant_1", "gen_mystery", "gen_simple", "avail_exogenous"],
        ]);
        let resolver = ComponentResolver::new(&registry);
        let err = resolver.resolve(&io, &[]).unwrap_err();
        match err {
            CapxError::UnresolvedModule { axis, tag, entities } => {
                assert_eq!(axis, Axis::CapacityType);
                assert_eq!(tag, "gen_mystery");
                assert_eq!(entities, ["plant_1", "plant_2"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tag_on_wrong_axis_is_unresolved() {
        let registry = builtin_registry().unwrap();
        // gen_simple exists, but it is an operational type, not a capacity type.
        let io = source_with_projects(&[["plant_1", "gen_simple", "gen_simple", "avail_exogenous"]]);
        let resolver = ComponentResolver::new(&registry);
        let err = resolver.resolve(&io, &[]).unwrap_err();
        assert!(matches!(
            err,
            CapxError::UnresolvedModule {
                axis: Axis::CapacityType,
                ..
            }
        ));
    }

    #[test]
    fn features_resolve_as_policy_modules() {
        let registry = builtin_registry().unwrap();
        let io = source_with_projects(&[["coal_1", "gen_spec", "gen_simple", "avail_exogenous"]]);
        let resolver = ComponentResolver::new(&registry);
        let required = resolver
            .resolve(&io, &["carbon_cap".to_string()])
            .unwrap();
        assert_eq!(required.for_axis(Axis::PolicyType), ["carbon_cap"]);

        let err = resolver
            .resolve(&io, &["carbon_tax".to_string()])
            .unwrap_err();
        assert!(matches!(err, CapxError::UnresolvedModule { .. }));
    }

    #[test]
    fn resolution_is_deterministic_across_row_orders() {
        let registry = builtin_registry().unwrap();
        let forward = source_with_projects(&[
            ["a", "gen_spec", "gen_var", "avail_exogenous"],
            ["b", "gen_new_lin", "gen_simple", "avail_exogenous"],
        ]);
        let reversed = source_with_projects(&[
            ["b", "gen_new_lin", "gen_simple", "avail_exogenous"],
            ["a", "gen_spec", "gen_var", "avail_exogenous"],
        ]);
        let resolver = ComponentResolver::new(&registry);
        let first = resolver.resolve(&forward, &[]).unwrap();
        let second = resolver.resolve(&reversed, &[]).unwrap();
        for axis in Axis::ALL {
            assert_eq!(first.for_axis(axis), second.for_axis(axis));
        }
    }

    #[test]
    fn build_targets_append_objective() {
        let mut required = RequiredModules::new();
        required.insert(Axis::CapacityType, vec!["gen_spec".to_string()]);
        let targets = build_targets(&required);
        assert!(targets.contains(&"gen_spec".to_string()));
        assert!(targets.contains(&"objective".to_string()));
    }
}
