//! Transmission capacity and operational type modules.

use super::parse_f64;
use capx_core::{BuildContext, CapxResult, ComponentKind, Model, ResultFrame, SymbolDef};
use capx_io::CellIo;

fn lines_of_type(map: &std::collections::BTreeMap<String, String>, tag: &str) -> Vec<String> {
    map.iter()
        .filter(|(_, t)| t.as_str() == tag)
        .map(|(l, _)| l.clone())
        .collect()
}

pub fn tx_spec_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("TX_SPEC_LINES", ComponentKind::Set, "tx_spec"))?;
    model.declare(
        SymbolDef::new("tx_spec_capacity_mw", ComponentKind::Param, "tx_spec")
            .over(&["TX_SPEC_LINES", "PERIODS"]),
    )
}

pub fn tx_spec_load(model: &mut Model, ctx: &mut BuildContext, io: &dyn CellIo) -> CapxResult<()> {
    let members = lines_of_type(&ctx.tx_capacity_type_of_line, "tx_spec");
    model.add_set_members("tx_spec", "TX_SPEC_LINES", members.iter().cloned())?;
    if members.is_empty() {
        return Ok(());
    }
    let rows = io.read_columns("tx_capacity", &["tx_line", "period", "capacity_mw"])?;
    for row in rows {
        if !members.contains(&row[0]) {
            continue;
        }
        let capacity = parse_f64("tx_capacity", "capacity_mw", &row[2])?;
        model.bind(
            "tx_spec",
            "tx_spec_capacity_mw",
            vec![row[0].clone(), row[1].clone()],
            capacity,
        )?;
    }
    Ok(())
}

pub fn tx_spec_export(model: &Model, _ctx: &BuildContext) -> CapxResult<Vec<ResultFrame>> {
    let mut frame = ResultFrame::new("transmission_capacity", &["tx_line", "period"]);
    frame.add_column("tx_spec", "specified_capacity_mw")?;
    for (key, value) in model.bindings("tx_spec_capacity_mw") {
        frame.set(key.clone(), "specified_capacity_mw", value)?;
    }
    Ok(vec![frame])
}

pub fn tx_simple_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    model.declare(SymbolDef::new("TX_SIMPLE_LINES", ComponentKind::Set, "tx_simple"))?;
    model.declare(
        SymbolDef::new("TxSimple_Transmit_Power_MW", ComponentKind::Var, "tx_simple")
            .over(&["TX_SIMPLE_LINES", "TIMEPOINTS"]),
    )?;
    model.declare(
        SymbolDef::new("TxSimple_Flow_Limits", ComponentKind::Constraint, "tx_simple")
            .over(&["TX_SIMPLE_LINES", "TIMEPOINTS"]),
    )
}

pub fn tx_simple_load(model: &mut Model, ctx: &mut BuildContext, _io: &dyn CellIo) -> CapxResult<()> {
    let members = lines_of_type(&ctx.tx_operational_type_of_line, "tx_simple");
    model.add_set_members("tx_simple", "TX_SIMPLE_LINES", members)
}

pub fn tx_simple_export(model: &Model, _ctx: &BuildContext) -> CapxResult<Vec<ResultFrame>> {
    let mut frame = ResultFrame::new("transmission_dispatch", &["tx_line", "timepoint"]);
    frame.add_column("tx_simple", "flow_mw")?;
    for (key, value) in model.bindings("TxSimple_Transmit_Power_MW") {
        frame.set(key.clone(), "flow_mw", value)?;
    }
    Ok(vec![frame])
}
