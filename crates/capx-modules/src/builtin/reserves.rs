//! Reserve-product modules. Each product owns a project subset read from
//! the optional `project_reserves` table, a provision variable, and a
//! results column; upward products register their variable as headroom,
//! downward products as footroom.

use capx_core::{BuildContext, CapxResult, ComponentKind, Model, ResultFrame, SymbolDef};
use capx_io::CellIo;

enum Direction {
    Headroom,
    Footroom,
}

fn reserve_schema(model: &mut Model, module: &str, set: &str, var: &str) -> CapxResult<()> {
    model.declare(SymbolDef::new(set, ComponentKind::Set, module))?;
    model.declare(SymbolDef::new(var, ComponentKind::Var, module).over(&[set, "TIMEPOINTS"]))
}

fn reserve_load(
    model: &mut Model,
    ctx: &mut BuildContext,
    io: &dyn CellIo,
    module: &str,
    set: &str,
    var: &str,
    direction: Direction,
) -> CapxResult<()> {
    if !io.has_table("project_reserves") {
        return Ok(());
    }
    let rows = io.read_columns("project_reserves", &["project", "reserve_type"])?;
    let mut members = Vec::new();
    for row in rows {
        if row[1] == module {
            members.push(row[0].clone());
        }
    }
    model.add_set_members(module, set, members.iter().cloned())?;
    ctx.reserve_projects
        .insert(module.to_string(), members.clone());
    let registry = match direction {
        Direction::Headroom => &mut ctx.headroom_variables,
        Direction::Footroom => &mut ctx.footroom_variables,
    };
    for project in members {
        registry.entry(project).or_default().push(var.to_string());
    }
    Ok(())
}

fn reserve_export(model: &Model, module: &str, var: &str, column: &str) -> CapxResult<Vec<ResultFrame>> {
    let mut frame = ResultFrame::new("reserves", &["project", "timepoint"]);
    frame.add_column(module, column)?;
    for (key, value) in model.bindings(var) {
        frame.set(key.clone(), column, value)?;
    }
    Ok(vec![frame])
}

pub fn reg_up_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    reserve_schema(model, "reg_up", "REG_UP_PRJS", "RegUp_Provide_MW")
}

pub fn reg_up_load(model: &mut Model, ctx: &mut BuildContext, io: &dyn CellIo) -> CapxResult<()> {
    reserve_load(model, ctx, io, "reg_up", "REG_UP_PRJS", "RegUp_Provide_MW", Direction::Headroom)
}

pub fn reg_up_export(model: &Model, _ctx: &BuildContext) -> CapxResult<Vec<ResultFrame>> {
    reserve_export(model, "reg_up", "RegUp_Provide_MW", "reg_up_mw")
}

pub fn reg_down_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    reserve_schema(model, "reg_down", "REG_DOWN_PRJS", "RegDown_Provide_MW")
}

pub fn reg_down_load(model: &mut Model, ctx: &mut BuildContext, io: &dyn CellIo) -> CapxResult<()> {
    reserve_load(
        model,
        ctx,
        io,
        "reg_down",
        "REG_DOWN_PRJS",
        "RegDown_Provide_MW",
        Direction::Footroom,
    )
}

pub fn reg_down_export(model: &Model, _ctx: &BuildContext) -> CapxResult<Vec<ResultFrame>> {
    reserve_export(model, "reg_down", "RegDown_Provide_MW", "reg_down_mw")
}

pub fn spin_schema(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
    reserve_schema(model, "spin", "SPIN_PRJS", "Spin_Provide_MW")
}

pub fn spin_load(model: &mut Model, ctx: &mut BuildContext, io: &dyn CellIo) -> CapxResult<()> {
    reserve_load(model, ctx, io, "spin", "SPIN_PRJS", "Spin_Provide_MW", Direction::Headroom)
}

pub fn spin_export(model: &Model, _ctx: &BuildContext) -> CapxResult<Vec<ResultFrame>> {
    reserve_export(model, "spin", "Spin_Provide_MW", "spin_mw")
}

#[cfg(test)]
mod tests {
    use super::*;
    use capx_io::MemorySource;

    #[test]
    fn reserve_load_registers_headroom_variables() {
        let mut model = Model::new();
        model
            .declare(SymbolDef::new("TIMEPOINTS", ComponentKind::Set, "temporal"))
            .unwrap();
        reg_up_schema(&mut model, &mut BuildContext::default()).unwrap();

        let io = MemorySource::new().with_table(
            "project_reserves",
            &["project", "reserve_type"],
            vec![
                vec!["plant_a", "reg_up"],
                vec!["plant_b", "spin"],
            ],
        );
        let mut ctx = BuildContext::default();
        reg_up_load(&mut model, &mut ctx, &io).unwrap();

        assert_eq!(
            model.set_members("reg_up", "REG_UP_PRJS").unwrap(),
            ["plant_a".to_string()]
        );
        assert_eq!(
            ctx.headroom_variables["plant_a"],
            ["RegUp_Provide_MW".to_string()]
        );
        assert!(ctx.footroom_variables.is_empty());
    }
}
