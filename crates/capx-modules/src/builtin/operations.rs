//! Operational-type modules: how committed projects dispatch within a
//! timepoint. The shared dispatch variable lives in the `operations`
//! infrastructure module; these modules add type-specific structure on
//! their own project subsets.

use super::parse_f64;
use capx_core::{
    BuildContext, CapxResult, ComponentKind, Model, ResultFrame, SymbolDef, ValidationCollector,
    ValidationSeverity,
};
use capx_io::CellIo;

fn projects_of_operational_type(ctx: &BuildContext, tag: &str) -> Vec<String> {
    ctx.operational_type_of_project
        .iter()
        .filter(|(_, t)| t.as_str() == tag)
        .map(|(p, _)| p.clone())
        .collect()
}

// --- gen_simple -------------------------------------------------------------

pub fn gen_simple_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("GEN_SIMPLE_PRJS", ComponentKind::Set, "gen_simple"))?;
    model.declare(
        SymbolDef::new("GenSimple_Max_Power", ComponentKind::Constraint, "gen_simple")
            .over(&["GEN_SIMPLE_PRJS", "TIMEPOINTS"]),
    )
}

pub fn gen_simple_load(
    model: &mut Model,
    ctx: &mut BuildContext,
    _io: &dyn CellIo,
) -> CapxResult<()> {
    let members = projects_of_operational_type(ctx, "gen_simple");
    model.add_set_members("gen_simple", "GEN_SIMPLE_PRJS", members)
}

// --- gen_must_run -----------------------------------------------------------

pub fn gen_must_run_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("GEN_MUST_RUN_PRJS", ComponentKind::Set, "gen_must_run"))?;
    model.declare(
        SymbolDef::new("GenMustRun_Fixed_Output", ComponentKind::Constraint, "gen_must_run")
            .over(&["GEN_MUST_RUN_PRJS", "TIMEPOINTS"]),
    )
}

pub fn gen_must_run_load(
    model: &mut Model,
    ctx: &mut BuildContext,
    _io: &dyn CellIo,
) -> CapxResult<()> {
    let members = projects_of_operational_type(ctx, "gen_must_run");
    model.add_set_members("gen_must_run", "GEN_MUST_RUN_PRJS", members)
}

// --- gen_var: variable renewables with exogenous profiles -------------------

pub fn gen_var_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("GEN_VAR_PRJS", ComponentKind::Set, "gen_var"))?;
    model.declare(
        SymbolDef::new("gen_var_cap_factor", ComponentKind::Param, "gen_var")
            .over(&["GEN_VAR_PRJS", "TIMEPOINTS"]),
    )?;
    model.declare(
        SymbolDef::new("GenVar_Max_Power", ComponentKind::Constraint, "gen_var")
            .over(&["GEN_VAR_PRJS", "TIMEPOINTS"]),
    )
}

pub fn gen_var_load(model: &mut Model, ctx: &mut BuildContext, io: &dyn CellIo) -> CapxResult<()> {
    let members = projects_of_operational_type(ctx, "gen_var");
    model.add_set_members("gen_var", "GEN_VAR_PRJS", members.iter().cloned())?;
    let rows = io.read_columns("variable_profiles", &["project", "timepoint", "cap_factor"])?;
    for row in rows {
        if !members.contains(&row[0]) {
            continue;
        }
        let cap_factor = parse_f64("variable_profiles", "cap_factor", &row[2])?;
        model.bind(
            "gen_var",
            "gen_var_cap_factor",
            vec![row[0].clone(), row[1].clone()],
            cap_factor,
        )?;
    }
    Ok(())
}

pub fn gen_var_validate(io: &dyn CellIo, collector: &mut ValidationCollector) {
    let rows = match io.read_columns("variable_profiles", &["project", "timepoint", "cap_factor"]) {
        Ok(rows) => rows,
        Err(_) => return,
    };
    let mut findings = Vec::new();
    for row in rows {
        if let Ok(cap_factor) = row[2].trim().parse::<f64>() {
            if !(0.0..=1.0).contains(&cap_factor) {
                findings.push(format!(
                    "capacity factor {} outside [0, 1] for project '{}' at timepoint '{}'",
                    cap_factor, row[0], row[1]
                ));
            }
        }
    }
    collector.collect("gen_var", "variable_profiles", ValidationSeverity::High, findings);
}

// --- gen_commit_lin: linear commitment, the linking-decision producer -------

pub fn gen_commit_lin_schema(model: &mut Model, ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("GEN_COMMIT_LIN_PRJS", ComponentKind::Set, "gen_commit_lin"))?;
    model.declare(
        SymbolDef::new("GenCommitLin_Commit_MW", ComponentKind::Var, "gen_commit_lin")
            .over(&["GEN_COMMIT_LIN_PRJS", "TIMEPOINTS"]),
    )?;
    // A downstream stage consuming an upstream commitment fixes it via a
    // param bound from the linking decision rather than a free variable.
    if ctx.linking_inputs.contains_key("commitment") {
        model.declare(
            SymbolDef::new("gen_commit_lin_fixed_commit_mw", ComponentKind::Param, "gen_commit_lin")
                .over(&["GEN_COMMIT_LIN_PRJS", "TIMEPOINTS"])
                .with_default(0.0),
        )?;
        model.declare(
            SymbolDef::new(
                "GenCommitLin_Fixed_Commitment",
                ComponentKind::Constraint,
                "gen_commit_lin",
            )
            .over(&["GEN_COMMIT_LIN_PRJS", "TIMEPOINTS"]),
        )?;
    }
    Ok(())
}

pub fn gen_commit_lin_load(
    model: &mut Model,
    ctx: &mut BuildContext,
    _io: &dyn CellIo,
) -> CapxResult<()> {
    let members = projects_of_operational_type(ctx, "gen_commit_lin");
    model.add_set_members("gen_commit_lin", "GEN_COMMIT_LIN_PRJS", members)?;
    if let Some(decision) = ctx.linking_inputs.get("commitment") {
        for (key, value) in decision.values() {
            model.bind(
                "gen_commit_lin",
                "gen_commit_lin_fixed_commit_mw",
                key.clone(),
                value,
            )?;
        }
    }
    Ok(())
}

pub fn gen_commit_lin_export(model: &Model, _ctx: &BuildContext) -> CapxResult<Vec<ResultFrame>> {
    let mut frame = ResultFrame::new("project_dispatch", &["project", "timepoint"]);
    frame.add_column("gen_commit_lin", "committed_mw")?;
    for (key, value) in model.bindings("GenCommitLin_Commit_MW") {
        frame.set(key.clone(), "committed_mw", value)?;
    }
    Ok(vec![frame])
}

// --- stor: storage operations ----------------------------------------------

pub fn stor_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("STOR_OPR_PRJS", ComponentKind::Set, "stor"))?;
    model.declare(
        SymbolDef::new("Stor_Charge_MW", ComponentKind::Var, "stor")
            .over(&["STOR_OPR_PRJS", "TIMEPOINTS"]),
    )?;
    model.declare(
        SymbolDef::new("Stor_Discharge_MW", ComponentKind::Var, "stor")
            .over(&["STOR_OPR_PRJS", "TIMEPOINTS"]),
    )?;
    model.declare(
        SymbolDef::new("Stor_Energy_Balance", ComponentKind::Constraint, "stor")
            .over(&["STOR_OPR_PRJS", "TIMEPOINTS"]),
    )
}

pub fn stor_load(model: &mut Model, ctx: &mut BuildContext, _io: &dyn CellIo) -> CapxResult<()> {
    let members = projects_of_operational_type(ctx, "stor");
    model.add_set_members("stor", "STOR_OPR_PRJS", members)
}

pub fn stor_export(model: &Model, _ctx: &BuildContext) -> CapxResult<Vec<ResultFrame>> {
    let mut frame = ResultFrame::new("storage_dispatch", &["project", "timepoint"]);
    frame.add_column("stor", "charge_mw")?;
    frame.add_column("stor", "discharge_mw")?;
    for (key, value) in model.bindings("Stor_Charge_MW") {
        frame.set(key.clone(), "charge_mw", value)?;
    }
    for (key, value) in model.bindings("Stor_Discharge_MW") {
        frame.set(key.clone(), "discharge_mw", value)?;
    }
    Ok(vec![frame])
}
