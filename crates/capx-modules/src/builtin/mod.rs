//! Built-in formulation module catalog.
//!
//! The closed enumeration of known module tags per axis, plus the
//! infrastructure modules every scenario carries. Modules whose tag is
//! registered but which carry no callbacks simply do not participate in any
//! pipeline phase yet; their presence keeps the tag space closed so the
//! resolver can fail fast on unknown tags.

mod availability;
mod capacity;
mod infrastructure;
mod operations;
mod policy;
mod reserves;
mod transmission;

use crate::registry::{Module, ModuleRegistry};
use capx_core::{Axis, CapxError, CapxResult};

/// Assemble the full built-in registry.
pub fn builtin_registry() -> CapxResult<ModuleRegistry> {
    let mut modules = vec![
        // Axis-independent infrastructure.
        Module::new("temporal")
            .schema(infrastructure::temporal_schema)
            .load(infrastructure::temporal_load),
        Module::new("geography")
            .schema(infrastructure::geography_schema)
            .load(infrastructure::geography_load),
        Module::new("projects")
            .requires(&["temporal", "geography"])
            .schema(infrastructure::projects_schema)
            .load(infrastructure::projects_load)
            .validate(infrastructure::projects_validate),
        Module::new("operations")
            .requires(&["projects"])
            .schema(infrastructure::operations_schema)
            .export(infrastructure::operations_export)
            .import(infrastructure::operations_import)
            .exports_column("project_dispatch", "power_mw"),
        Module::new("transmission")
            .requires(&["geography", "temporal"])
            .schema(infrastructure::transmission_schema)
            .load(infrastructure::transmission_load),
        Module::new("load_balance")
            .requires(&["operations", "geography"])
            .schema(infrastructure::load_balance_schema)
            .load(infrastructure::load_balance_load)
            .validate(infrastructure::load_balance_validate)
            .export(infrastructure::load_balance_export)
            .exports_column("load_balance", "load_mw"),
        Module::new("objective")
            .requires(&["load_balance"])
            .schema(infrastructure::objective_schema),
        // Capacity types.
        Module::new("gen_spec")
            .on_axis(Axis::CapacityType)
            .requires(&["projects"])
            .schema(capacity::gen_spec_schema)
            .load(capacity::gen_spec_load)
            .validate(capacity::gen_spec_validate)
            .export(capacity::gen_spec_export)
            .exports_column("project_capacity", "specified_capacity_mw"),
        Module::new("gen_new_lin")
            .on_axis(Axis::CapacityType)
            .requires(&["projects"])
            .schema(capacity::gen_new_lin_schema)
            .load(capacity::gen_new_lin_load)
            .export(capacity::gen_new_lin_export)
            .exports_column("project_capacity", "new_build_mw"),
        Module::new("gen_ret_lin")
            .on_axis(Axis::CapacityType)
            .requires(&["projects"]),
        Module::new("stor_spec")
            .on_axis(Axis::CapacityType)
            .requires(&["projects"])
            .schema(capacity::stor_spec_schema)
            .load(capacity::stor_spec_load)
            .export(capacity::stor_spec_export)
            .exports_column("project_capacity", "storage_power_mw")
            .exports_column("project_capacity", "storage_energy_mwh"),
        Module::new("stor_new_lin")
            .on_axis(Axis::CapacityType)
            .requires(&["projects"]),
        Module::new("fuel_prod_spec")
            .on_axis(Axis::CapacityType)
            .requires(&["projects"]),
        // Operational types.
        Module::new("gen_simple")
            .on_axis(Axis::OperationalType)
            .requires(&["operations"])
            .schema(operations::gen_simple_schema)
            .load(operations::gen_simple_load),
        Module::new("gen_must_run")
            .on_axis(Axis::OperationalType)
            .requires(&["operations"])
            .schema(operations::gen_must_run_schema)
            .load(operations::gen_must_run_load),
        Module::new("gen_var")
            .on_axis(Axis::OperationalType)
            .requires(&["operations"])
            .schema(operations::gen_var_schema)
            .load(operations::gen_var_load)
            .validate(operations::gen_var_validate),
        Module::new("gen_commit_lin")
            .on_axis(Axis::OperationalType)
            .requires(&["operations"])
            .schema(operations::gen_commit_lin_schema)
            .load(operations::gen_commit_lin_load)
            .export(operations::gen_commit_lin_export)
            .exports_column("project_dispatch", "committed_mw"),
        Module::new("gen_commit_bin")
            .on_axis(Axis::OperationalType)
            .requires(&["operations"]),
        Module::new("gen_hydro")
            .on_axis(Axis::OperationalType)
            .requires(&["operations"]),
        Module::new("stor")
            .on_axis(Axis::OperationalType)
            .requires(&["operations"])
            .schema(operations::stor_schema)
            .load(operations::stor_load)
            .export(operations::stor_export)
            .exports_column("storage_dispatch", "charge_mw")
            .exports_column("storage_dispatch", "discharge_mw"),
        // Availability types.
        Module::new("avail_exogenous")
            .on_axis(Axis::AvailabilityType)
            .requires(&["projects"])
            .schema(availability::exogenous_schema)
            .load(availability::exogenous_load)
            .validate(availability::exogenous_validate),
        Module::new("avail_binary")
            .on_axis(Axis::AvailabilityType)
            .requires(&["projects"]),
        Module::new("avail_continuous")
            .on_axis(Axis::AvailabilityType)
            .requires(&["projects"]),
        // Reserve products.
        Module::new("reg_up")
            .on_axis(Axis::ReserveType)
            .requires(&["operations"])
            .schema(reserves::reg_up_schema)
            .load(reserves::reg_up_load)
            .export(reserves::reg_up_export)
            .exports_column("reserves", "reg_up_mw"),
        Module::new("reg_down")
            .on_axis(Axis::ReserveType)
            .requires(&["operations"])
            .schema(reserves::reg_down_schema)
            .load(reserves::reg_down_load)
            .export(reserves::reg_down_export)
            .exports_column("reserves", "reg_down_mw"),
        Module::new("spin")
            .on_axis(Axis::ReserveType)
            .requires(&["operations"])
            .schema(reserves::spin_schema)
            .load(reserves::spin_load)
            .export(reserves::spin_export)
            .exports_column("reserves", "spin_mw"),
        Module::new("lf_up")
            .on_axis(Axis::ReserveType)
            .requires(&["operations"]),
        Module::new("lf_down")
            .on_axis(Axis::ReserveType)
            .requires(&["operations"]),
        Module::new("freq_resp")
            .on_axis(Axis::ReserveType)
            .requires(&["operations"]),
        // Transmission capacity types.
        Module::new("tx_spec")
            .on_axis(Axis::TxCapacityType)
            .requires(&["transmission"])
            .schema(transmission::tx_spec_schema)
            .load(transmission::tx_spec_load)
            .export(transmission::tx_spec_export)
            .exports_column("transmission_capacity", "specified_capacity_mw"),
        Module::new("tx_new_lin")
            .on_axis(Axis::TxCapacityType)
            .requires(&["transmission"]),
        // Transmission operational types.
        Module::new("tx_simple")
            .on_axis(Axis::TxOperationalType)
            .requires(&["transmission"])
            .schema(transmission::tx_simple_schema)
            .load(transmission::tx_simple_load)
            .export(transmission::tx_simple_export)
            .exports_column("transmission_dispatch", "flow_mw"),
        Module::new("tx_losses")
            .on_axis(Axis::TxOperationalType)
            .requires(&["transmission"]),
        // Policies.
        Module::new("energy_target")
            .on_axis(Axis::PolicyType)
            .requires(&["projects"])
            .schema(policy::energy_target_schema)
            .load(policy::energy_target_load),
        Module::new("carbon_cap")
            .on_axis(Axis::PolicyType)
            .requires(&["projects"])
            .schema(policy::carbon_cap_schema)
            .load(policy::carbon_cap_load),
        Module::new("prm")
            .on_axis(Axis::PolicyType)
            .requires(&["projects"]),
    ];
    modules.sort_by(|a, b| a.name().cmp(b.name()));
    ModuleRegistry::new(modules)
}

pub(crate) fn parse_f64(table: &str, column: &str, raw: &str) -> CapxResult<f64> {
    raw.trim().parse::<f64>().map_err(|_| {
        CapxError::Other(format!(
            "table '{table}' column '{column}': cannot parse '{raw}' as a number"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::resolve_order;

    #[test]
    fn builtin_registry_constructs_cleanly() {
        let registry = builtin_registry().unwrap();
        assert!(registry.len() > 30);
        assert!(registry.contains("objective"));
        assert!(registry.tags_for_axis(Axis::CapacityType).contains(&"gen_spec"));
    }

    #[test]
    fn objective_pulls_in_the_infrastructure_chain() {
        let registry = builtin_registry().unwrap();
        let order = resolve_order(&registry, &["objective".to_string()]).unwrap();
        let pos = |name: &str| order.iter().position(|m| m == name).unwrap();
        assert!(pos("temporal") < pos("projects"));
        assert!(pos("projects") < pos("operations"));
        assert!(pos("operations") < pos("load_balance"));
        assert!(pos("load_balance") < pos("objective"));
    }
}
