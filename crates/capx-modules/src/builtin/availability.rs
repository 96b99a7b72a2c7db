//! Availability-type modules: derates on installed capacity.

use super::parse_f64;
use capx_core::{
    BuildContext, CapxResult, ComponentKind, Model, SymbolDef, ValidationCollector,
    ValidationSeverity,
};
use capx_io::CellIo;

pub fn exogenous_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(
        SymbolDef::new("avail_derate", ComponentKind::Param, "avail_exogenous")
            .over(&["PROJECTS", "TIMEPOINTS"])
            .with_default(1.0),
    )
}

/// The availability table is optional; absent rows default to full
/// availability via the param default.
pub fn exogenous_load(model: &mut Model, _ctx: &mut BuildContext, io: &dyn CellIo) -> CapxResult<()> {
    if !io.has_table("availability") {
        return Ok(());
    }
    let rows = io.read_columns("availability", &["project", "timepoint", "derate"])?;
    for row in rows {
        let derate = parse_f64("availability", "derate", &row[2])?;
        model.bind(
            "avail_exogenous",
            "avail_derate",
            vec![row[0].clone(), row[1].clone()],
            derate,
        )?;
    }
    Ok(())
}

pub fn exogenous_validate(io: &dyn CellIo, collector: &mut ValidationCollector) {
    if !io.has_table("availability") {
        return;
    }
    let rows = match io.read_columns("availability", &["project", "timepoint", "derate"]) {
        Ok(rows) => rows,
        Err(_) => return,
    };
    let mut findings = Vec::new();
    for row in rows {
        if let Ok(derate) = row[2].trim().parse::<f64>() {
            if !(0.0..=1.0).contains(&derate) {
                findings.push(format!(
                    "derate {} outside [0, 1] for project '{}' at timepoint '{}'",
                    derate, row[0], row[1]
                ));
            }
        }
    }
    collector.collect("avail_exogenous", "availability", ValidationSeverity::Mid, findings);
}
