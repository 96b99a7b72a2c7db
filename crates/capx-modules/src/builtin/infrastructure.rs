//! Axis-independent infrastructure modules: temporal and geographic index
//! sets, the project roster, the shared dispatch variable, the zonal energy
//! balance, and the objective placeholder.

use super::parse_f64;
use capx_core::{
    BuildContext, CapxError, CapxResult, ComponentKind, Model, ResultFrame, SymbolDef,
    ValidationCollector, ValidationSeverity,
};
use capx_io::CellIo;
use std::collections::BTreeSet;

const MODULE_TEMPORAL: &str = "temporal";
const MODULE_GEOGRAPHY: &str = "geography";
const MODULE_PROJECTS: &str = "projects";
const MODULE_OPERATIONS: &str = "operations";
const MODULE_TRANSMISSION: &str = "transmission";
const MODULE_LOAD_BALANCE: &str = "load_balance";
const MODULE_OBJECTIVE: &str = "objective";

pub fn temporal_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("TIMEPOINTS", ComponentKind::Set, MODULE_TEMPORAL))?;
    model.declare(SymbolDef::new("PERIODS", ComponentKind::Set, MODULE_TEMPORAL))?;
    model.declare(
        SymbolDef::new("timepoint_weight", ComponentKind::Param, MODULE_TEMPORAL)
            .over(&["TIMEPOINTS"])
            .with_default(1.0),
    )
}

pub fn temporal_load(model: &mut Model, _ctx: &mut BuildContext, io: &dyn CellIo) -> CapxResult<()> {
    let rows = io.read_columns("timepoints", &["timepoint", "period", "weight"])?;
    let mut periods = BTreeSet::new();
    for row in rows {
        let (timepoint, period, weight) = (row[0].clone(), row[1].clone(), row[2].clone());
        model.add_set_members(MODULE_TEMPORAL, "TIMEPOINTS", [timepoint.clone()])?;
        periods.insert(period);
        if !weight.trim().is_empty() {
            let weight = parse_f64("timepoints", "weight", &weight)?;
            model.bind(MODULE_TEMPORAL, "timepoint_weight", vec![timepoint], weight)?;
        }
    }
    model.add_set_members(MODULE_TEMPORAL, "PERIODS", periods)
}

pub fn geography_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("LOAD_ZONES", ComponentKind::Set, MODULE_GEOGRAPHY))
}

pub fn geography_load(
    model: &mut Model,
    _ctx: &mut BuildContext,
    io: &dyn CellIo,
) -> CapxResult<()> {
    let rows = io.read_columns("load_zones", &["load_zone"])?;
    model.add_set_members(
        MODULE_GEOGRAPHY,
        "LOAD_ZONES",
        rows.into_iter().map(|mut r| r.remove(0)),
    )
}

pub fn projects_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("PROJECTS", ComponentKind::Set, MODULE_PROJECTS))
}

/// Loads the project roster and records each project's axis tags in the
/// build context for the type-specific modules downstream.
pub fn projects_load(model: &mut Model, ctx: &mut BuildContext, io: &dyn CellIo) -> CapxResult<()> {
    let rows = io.read_columns(
        "projects",
        &[
            "project",
            "capacity_type",
            "operational_type",
            "availability_type",
        ],
    )?;
    for row in rows {
        let project = row[0].clone();
        model.add_set_members(MODULE_PROJECTS, "PROJECTS", [project.clone()])?;
        ctx.capacity_type_of_project
            .insert(project.clone(), row[1].clone());
        ctx.operational_type_of_project
            .insert(project.clone(), row[2].clone());
        ctx.availability_type_of_project.insert(project, row[3].clone());
    }
    Ok(())
}

pub fn projects_validate(io: &dyn CellIo, collector: &mut ValidationCollector) {
    let rows = match io.read_columns("projects", &["project"]) {
        Ok(rows) => rows,
        Err(err) => {
            collector.collect(
                MODULE_PROJECTS,
                "projects",
                ValidationSeverity::High,
                [format!("cannot read project roster: {err}")],
            );
            return;
        }
    };
    let mut seen = BTreeSet::new();
    let mut duplicates = Vec::new();
    for row in rows {
        if !seen.insert(row[0].clone()) {
            duplicates.push(format!("duplicate project row '{}'", row[0]));
        }
    }
    collector.collect(MODULE_PROJECTS, "projects", ValidationSeverity::Mid, duplicates);
}

pub fn operations_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(
        SymbolDef::new("Project_Power_MW", ComponentKind::Var, MODULE_OPERATIONS)
            .over(&["PROJECTS", "TIMEPOINTS"]),
    )
}

/// Project dispatch, one row per bound (project, timepoint) solution value.
pub fn operations_export(model: &Model, _ctx: &BuildContext) -> CapxResult<Vec<ResultFrame>> {
    let mut frame = ResultFrame::new("project_dispatch", &["project", "timepoint"]);
    frame.add_column(MODULE_OPERATIONS, "power_mw")?;
    for (key, value) in model.bindings("Project_Power_MW") {
        frame.set(key.clone(), "power_mw", value)?;
    }
    Ok(vec![frame])
}

/// Post-commit check: a scenario that exported dispatch must have its
/// dispatch table readable from the results store.
pub fn operations_import(io: &dyn CellIo, scenario_id: &str) -> CapxResult<()> {
    if !io.has_table("project_dispatch") {
        return Err(CapxError::Other(format!(
            "scenario '{scenario_id}' has no committed project_dispatch table"
        )));
    }
    io.read_columns("project_dispatch", &["project", "timepoint", "power_mw"])?;
    Ok(())
}

pub fn transmission_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("TX_LINES", ComponentKind::Set, MODULE_TRANSMISSION))
}

/// Transmission is optional: scenarios without a line table simply get an
/// empty TX_LINES set.
pub fn transmission_load(
    model: &mut Model,
    ctx: &mut BuildContext,
    io: &dyn CellIo,
) -> CapxResult<()> {
    if !io.has_table("transmission_lines") {
        return Ok(());
    }
    let rows = io.read_columns(
        "transmission_lines",
        &["tx_line", "tx_capacity_type", "tx_operational_type"],
    )?;
    for row in rows {
        let line = row[0].clone();
        model.add_set_members(MODULE_TRANSMISSION, "TX_LINES", [line.clone()])?;
        ctx.tx_capacity_type_of_line.insert(line.clone(), row[1].clone());
        ctx.tx_operational_type_of_line.insert(line, row[2].clone());
    }
    Ok(())
}

pub fn load_balance_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(
        SymbolDef::new("zone_load_mw", ComponentKind::Param, MODULE_LOAD_BALANCE)
            .over(&["LOAD_ZONES", "TIMEPOINTS"]),
    )?;
    model.declare(
        SymbolDef::new("Zone_Energy_Balance", ComponentKind::Constraint, MODULE_LOAD_BALANCE)
            .over(&["LOAD_ZONES", "TIMEPOINTS"]),
    )?;
    // Reserve balance: one row per product registered by the reserve
    // modules, which load earlier in every resolved order.
    model.declare(SymbolDef::new("RESERVE_PRODUCTS", ComponentKind::Set, MODULE_LOAD_BALANCE))?;
    model.declare(
        SymbolDef::new("reserve_requirement_mw", ComponentKind::Param, MODULE_LOAD_BALANCE)
            .over(&["RESERVE_PRODUCTS", "TIMEPOINTS"])
            .with_default(0.0),
    )?;
    model.declare(
        SymbolDef::new("Reserve_Balance", ComponentKind::Constraint, MODULE_LOAD_BALANCE)
            .over(&["RESERVE_PRODUCTS", "TIMEPOINTS"]),
    )
}

pub fn load_balance_load(
    model: &mut Model,
    ctx: &mut BuildContext,
    io: &dyn CellIo,
) -> CapxResult<()> {
    let rows = io.read_columns("loads", &["load_zone", "timepoint", "load_mw"])?;
    for row in rows {
        let load = parse_f64("loads", "load_mw", &row[2])?;
        model.bind(
            MODULE_LOAD_BALANCE,
            "zone_load_mw",
            vec![row[0].clone(), row[1].clone()],
            load,
        )?;
    }
    for (product, projects) in &ctx.reserve_projects {
        model.add_set_members(MODULE_LOAD_BALANCE, "RESERVE_PRODUCTS", [product.clone()])?;
        // A rostered project with no registered headroom or footroom
        // variable has nothing to balance against the requirement.
        for project in projects {
            let provides = ctx
                .headroom_variables
                .get(project)
                .map_or(false, |vars| !vars.is_empty())
                || ctx
                    .footroom_variables
                    .get(project)
                    .map_or(false, |vars| !vars.is_empty());
            if !provides {
                return Err(CapxError::Other(format!(
                    "project '{project}' is in the '{product}' reserve roster but \
                     registered no provision variable"
                )));
            }
        }
    }
    if io.has_table("reserve_requirements") {
        let rows = io.read_columns(
            "reserve_requirements",
            &["reserve_type", "timepoint", "requirement_mw"],
        )?;
        for row in rows {
            if !ctx.reserve_projects.contains_key(&row[0]) {
                continue;
            }
            let requirement = parse_f64("reserve_requirements", "requirement_mw", &row[2])?;
            model.bind(
                MODULE_LOAD_BALANCE,
                "reserve_requirement_mw",
                vec![row[0].clone(), row[1].clone()],
                requirement,
            )?;
        }
    }
    Ok(())
}

pub fn load_balance_validate(io: &dyn CellIo, collector: &mut ValidationCollector) {
    let rows = match io.read_columns("loads", &["load_zone", "timepoint", "load_mw"]) {
        Ok(rows) => rows,
        Err(_) => return,
    };
    let mut findings = Vec::new();
    for row in rows {
        if let Ok(load) = row[2].trim().parse::<f64>() {
            if load < 0.0 {
                findings.push(format!(
                    "negative load {} in zone '{}' at timepoint '{}'",
                    load, row[0], row[1]
                ));
            }
        }
    }
    collector.collect(MODULE_LOAD_BALANCE, "loads", ValidationSeverity::Mid, findings);
}

pub fn load_balance_export(model: &Model, _ctx: &BuildContext) -> CapxResult<Vec<ResultFrame>> {
    let mut frame = ResultFrame::new("load_balance", &["load_zone", "timepoint"]);
    frame.add_column(MODULE_LOAD_BALANCE, "load_mw")?;
    for (key, value) in model.bindings("zone_load_mw") {
        frame.set(key.clone(), "load_mw", value)?;
    }
    Ok(vec![frame])
}

pub fn objective_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("Total_Cost", ComponentKind::Expression, MODULE_OBJECTIVE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use capx_io::MemorySource;

    fn balance_model() -> Model {
        let mut model = Model::new();
        model
            .declare(SymbolDef::new("TIMEPOINTS", ComponentKind::Set, MODULE_TEMPORAL))
            .unwrap();
        model
            .declare(SymbolDef::new("LOAD_ZONES", ComponentKind::Set, MODULE_GEOGRAPHY))
            .unwrap();
        load_balance_schema(&mut model, &mut BuildContext::default()).unwrap();
        model
    }

    #[test]
    fn reserve_rosters_become_balance_rows() {
        let mut model = balance_model();
        let mut ctx = BuildContext::default();
        ctx.reserve_projects
            .insert("reg_up".to_string(), vec!["plant_a".to_string()]);
        ctx.headroom_variables
            .insert("plant_a".to_string(), vec!["RegUp_Provide_MW".to_string()]);

        let io = MemorySource::new()
            .with_table(
                "loads",
                &["load_zone", "timepoint", "load_mw"],
                vec![vec!["zone_a", "t1", "400"]],
            )
            .with_table(
                "reserve_requirements",
                &["reserve_type", "timepoint", "requirement_mw"],
                vec![vec!["reg_up", "t1", "25"], vec!["lf_up", "t1", "10"]],
            );
        load_balance_load(&mut model, &mut ctx, &io).unwrap();

        assert_eq!(
            model
                .set_members(MODULE_LOAD_BALANCE, "RESERVE_PRODUCTS")
                .unwrap(),
            ["reg_up".to_string()]
        );
        // Only products with a roster take a requirement binding.
        let bound: Vec<_> = model.bindings("reserve_requirement_mw").collect();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].1, 25.0);
    }

    #[test]
    fn rostered_project_without_provision_variable_is_an_error() {
        let mut model = balance_model();
        let mut ctx = BuildContext::default();
        ctx.reserve_projects
            .insert("spin".to_string(), vec!["plant_b".to_string()]);

        let io = MemorySource::new().with_table(
            "loads",
            &["load_zone", "timepoint", "load_mw"],
            vec![vec!["zone_a", "t1", "400"]],
        );
        let err = load_balance_load(&mut model, &mut ctx, &io).unwrap_err();
        assert!(err.to_string().contains("registered no provision variable"));
    }
}
