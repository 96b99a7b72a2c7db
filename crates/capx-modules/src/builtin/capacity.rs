//! Capacity-type modules: how a project's installable capacity enters the
//! model. Each module owns a project subset keyed off the capacity_type tag
//! recorded by the projects module.

use super::parse_f64;
use capx_core::{
    BuildContext, CapxResult, ComponentKind, Model, ResultFrame, SymbolDef, ValidationCollector,
    ValidationSeverity,
};
use capx_io::CellIo;

fn projects_of_capacity_type(ctx: &BuildContext, tag: &str) -> Vec<String> {
    ctx.capacity_type_of_project
        .iter()
        .filter(|(_, t)| t.as_str() == tag)
        .map(|(p, _)| p.clone())
        .collect()
}

// --- gen_spec: exogenously specified generator capacity ---------------------

pub fn gen_spec_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("GEN_SPEC_PRJS", ComponentKind::Set, "gen_spec"))?;
    model.declare(
        SymbolDef::new("gen_spec_capacity_mw", ComponentKind::Param, "gen_spec")
            .over(&["GEN_SPEC_PRJS", "PERIODS"]),
    )
}

pub fn gen_spec_load(model: &mut Model, ctx: &mut BuildContext, io: &dyn CellIo) -> CapxResult<()> {
    let members = projects_of_capacity_type(ctx, "gen_spec");
    model.add_set_members("gen_spec", "GEN_SPEC_PRJS", members.iter().cloned())?;
    let rows = io.read_columns("project_capacity", &["project", "period", "capacity_mw"])?;
    for row in rows {
        if !members.contains(&row[0]) {
            continue;
        }
        let capacity = parse_f64("project_capacity", "capacity_mw", &row[2])?;
        model.bind(
            "gen_spec",
            "gen_spec_capacity_mw",
            vec![row[0].clone(), row[1].clone()],
            capacity,
        )?;
    }
    Ok(())
}

pub fn gen_spec_validate(io: &dyn CellIo, collector: &mut ValidationCollector) {
    let rows = match io.read_columns("project_capacity", &["project", "period", "capacity_mw"]) {
        Ok(rows) => rows,
        Err(_) => return,
    };
    let mut findings = Vec::new();
    for row in rows {
        if let Ok(capacity) = row[2].trim().parse::<f64>() {
            if capacity <= 0.0 {
                findings.push(format!(
                    "non-positive capacity {} for project '{}' in period '{}'",
                    capacity, row[0], row[1]
                ));
            }
        }
    }
    collector.collect("gen_spec", "project_capacity", ValidationSeverity::Mid, findings);
}

pub fn gen_spec_export(model: &Model, _ctx: &BuildContext) -> CapxResult<Vec<ResultFrame>> {
    let mut frame = ResultFrame::new("project_capacity", &["project", "period"]);
    frame.add_column("gen_spec", "specified_capacity_mw")?;
    for (key, value) in model.bindings("gen_spec_capacity_mw") {
        frame.set(key.clone(), "specified_capacity_mw", value)?;
    }
    Ok(vec![frame])
}

// --- gen_new_lin: linear new-build candidate generators ---------------------

pub fn gen_new_lin_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("GEN_NEW_LIN_PRJS", ComponentKind::Set, "gen_new_lin"))?;
    model.declare(
        SymbolDef::new(
            "gen_new_lin_annualized_cost_per_mw",
            ComponentKind::Param,
            "gen_new_lin",
        )
        .over(&["GEN_NEW_LIN_PRJS", "PERIODS"]),
    )?;
    model.declare(
        SymbolDef::new("GenNewLin_Build_MW", ComponentKind::Var, "gen_new_lin")
            .over(&["GEN_NEW_LIN_PRJS", "PERIODS"]),
    )
}

pub fn gen_new_lin_load(
    model: &mut Model,
    ctx: &mut BuildContext,
    io: &dyn CellIo,
) -> CapxResult<()> {
    let members = projects_of_capacity_type(ctx, "gen_new_lin");
    model.add_set_members("gen_new_lin", "GEN_NEW_LIN_PRJS", members.iter().cloned())?;
    let rows = io.read_columns(
        "new_build_costs",
        &["project", "period", "annualized_cost_per_mw"],
    )?;
    for row in rows {
        if !members.contains(&row[0]) {
            continue;
        }
        let cost = parse_f64("new_build_costs", "annualized_cost_per_mw", &row[2])?;
        model.bind(
            "gen_new_lin",
            "gen_new_lin_annualized_cost_per_mw",
            vec![row[0].clone(), row[1].clone()],
            cost,
        )?;
    }
    Ok(())
}

pub fn gen_new_lin_export(model: &Model, _ctx: &BuildContext) -> CapxResult<Vec<ResultFrame>> {
    let mut frame = ResultFrame::new("project_capacity", &["project", "period"]);
    frame.add_column("gen_new_lin", "new_build_mw")?;
    for (key, value) in model.bindings("GenNewLin_Build_MW") {
        frame.set(key.clone(), "new_build_mw", value)?;
    }
    Ok(vec![frame])
}

// --- stor_spec: exogenously specified storage -------------------------------

pub fn stor_spec_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("STOR_SPEC_PRJS", ComponentKind::Set, "stor_spec"))?;
    model.declare(
        SymbolDef::new("stor_spec_power_mw", ComponentKind::Param, "stor_spec")
            .over(&["STOR_SPEC_PRJS", "PERIODS"]),
    )?;
    model.declare(
        SymbolDef::new("stor_spec_energy_mwh", ComponentKind::Param, "stor_spec")
            .over(&["STOR_SPEC_PRJS", "PERIODS"]),
    )
}

pub fn stor_spec_load(model: &mut Model, ctx: &mut BuildContext, io: &dyn CellIo) -> CapxResult<()> {
    let members = projects_of_capacity_type(ctx, "stor_spec");
    model.add_set_members("stor_spec", "STOR_SPEC_PRJS", members.iter().cloned())?;
    let rows = io.read_columns(
        "storage_capacity",
        &["project", "period", "power_mw", "energy_mwh"],
    )?;
    for row in rows {
        if !members.contains(&row[0]) {
            continue;
        }
        let key = vec![row[0].clone(), row[1].clone()];
        let power = parse_f64("storage_capacity", "power_mw", &row[2])?;
        let energy = parse_f64("storage_capacity", "energy_mwh", &row[3])?;
        model.bind("stor_spec", "stor_spec_power_mw", key.clone(), power)?;
        model.bind("stor_spec", "stor_spec_energy_mwh", key, energy)?;
    }
    Ok(())
}

pub fn stor_spec_export(model: &Model, _ctx: &BuildContext) -> CapxResult<Vec<ResultFrame>> {
    let mut frame = ResultFrame::new("project_capacity", &["project", "period"]);
    frame.add_column("stor_spec", "storage_power_mw")?;
    frame.add_column("stor_spec", "storage_energy_mwh")?;
    for (key, value) in model.bindings("stor_spec_power_mw") {
        frame.set(key.clone(), "storage_power_mw", value)?;
    }
    for (key, value) in model.bindings("stor_spec_energy_mwh") {
        frame.set(key.clone(), "storage_energy_mwh", value)?;
    }
    Ok(vec![frame])
}
