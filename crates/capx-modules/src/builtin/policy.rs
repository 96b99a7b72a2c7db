//! Policy modules, selected via scenario features rather than entity tags.

use super::parse_f64;
use capx_core::{BuildContext, CapxResult, ComponentKind, Model, SymbolDef};
use capx_io::CellIo;

pub fn energy_target_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(
        SymbolDef::new("energy_target_mwh", ComponentKind::Param, "energy_target")
            .over(&["PERIODS"]),
    )?;
    model.declare(
        SymbolDef::new("Energy_Target_Constraint", ComponentKind::Constraint, "energy_target")
            .over(&["PERIODS"]),
    )
}

pub fn energy_target_load(
    model: &mut Model,
    _ctx: &mut BuildContext,
    io: &dyn CellIo,
) -> CapxResult<()> {
    let rows = io.read_columns("energy_targets", &["period", "target_mwh"])?;
    for row in rows {
        let target = parse_f64("energy_targets", "target_mwh", &row[1])?;
        model.bind("energy_target", "energy_target_mwh", vec![row[0].clone()], target)?;
    }
    Ok(())
}

pub fn carbon_cap_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(
        SymbolDef::new("carbon_cap_tco2", ComponentKind::Param, "carbon_cap").over(&["PERIODS"]),
    )?;
    model.declare(
        SymbolDef::new("Carbon_Cap_Constraint", ComponentKind::Constraint, "carbon_cap")
            .over(&["PERIODS"]),
    )
}

pub fn carbon_cap_load(
    model: &mut Model,
    _ctx: &mut BuildContext,
    io: &dyn CellIo,
) -> CapxResult<()> {
    let rows = io.read_columns("carbon_cap", &["period", "cap_tco2"])?;
    for row in rows {
        let cap = parse_f64("carbon_cap", "cap_tco2", &row[1])?;
        model.bind("carbon_cap", "carbon_cap_tco2", vec![row[0].clone()], cap)?;
    }
    Ok(())
}
