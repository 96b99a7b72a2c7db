//! Dependency-ordered composition of formulation modules into one model.
//!
//! Ordering is load-bearing: a module may only reference symbols contributed
//! by a module earlier in its resolved order. The composer therefore runs
//! two strict passes over the same topological order — schema contribution
//! first, then data loading — and finishes with a missing-input sweep over
//! every parameter that declares no default.

use crate::registry::ModuleRegistry;
use capx_core::{
    BuildContext, CapxError, CapxResult, ComponentKind, Model, ResultFrame, ValidationCollector,
};
use capx_io::CellIo;
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Resolve the transitive prerequisite closure of `targets` into a valid
/// topological order, de-duplicated by first visit.
///
/// Every prerequisite appears before its dependent and each module exactly
/// once; a cycle anywhere in the closure is a fatal
/// [`CapxError::CyclicModuleDependency`] naming the cycle path.
pub fn resolve_order(registry: &ModuleRegistry, targets: &[String]) -> CapxResult<Vec<String>> {
    let mut marks: HashMap<String, Mark> = HashMap::new();
    let mut stack: Vec<String> = Vec::new();
    let mut order: Vec<String> = Vec::new();
    for target in targets {
        visit(registry, target, &mut marks, &mut stack, &mut order)?;
    }
    Ok(order)
}

fn visit(
    registry: &ModuleRegistry,
    name: &str,
    marks: &mut HashMap<String, Mark>,
    stack: &mut Vec<String>,
    order: &mut Vec<String>,
) -> CapxResult<()> {
    match marks.get(name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            let start = stack.iter().position(|m| m == name).unwrap_or(0);
            let mut cycle: Vec<String> = stack[start..].to_vec();
            cycle.push(name.to_string());
            return Err(CapxError::CyclicModuleDependency { cycle });
        }
        None => {}
    }
    let module = registry.module(name)?;
    marks.insert(name.to_string(), Mark::Visiting);
    stack.push(name.to_string());
    for prerequisite in module.prerequisites() {
        visit(registry, prerequisite, marks, stack, order)?;
    }
    stack.pop();
    marks.insert(name.to_string(), Mark::Done);
    order.push(name.to_string());
    Ok(())
}

/// Invokes module callbacks against a shared model in dependency order.
pub struct PipelineComposer<'r> {
    registry: &'r ModuleRegistry,
}

impl<'r> PipelineComposer<'r> {
    pub fn new(registry: &'r ModuleRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a single target and compose it (schema pass, then load pass).
    pub fn compose(
        &self,
        target: &str,
        ctx: &mut BuildContext,
        model: &mut Model,
        io: &dyn CellIo,
    ) -> CapxResult<Vec<String>> {
        let order = resolve_order(self.registry, &[target.to_string()])?;
        self.compose_resolved(&order, ctx, model, io)?;
        Ok(order)
    }

    /// Compose an already-resolved module order into the model.
    pub fn compose_resolved(
        &self,
        order: &[String],
        ctx: &mut BuildContext,
        model: &mut Model,
        io: &dyn CellIo,
    ) -> CapxResult<()> {
        for name in order {
            let module = self.registry.module(name)?;
            if let Some(contribute_schema) = module.hooks.contribute_schema {
                contribute_schema(model, ctx)?;
            }
        }
        for name in order {
            let module = self.registry.module(name)?;
            if let Some(load_data) = module.hooks.load_data {
                load_data(model, ctx, io)?;
            }
        }
        self.check_inputs(model)
    }

    /// Enforce the missing-input policy: after the load pass, every param
    /// without an explicit default must be bound over its full index space.
    fn check_inputs(&self, model: &Model) -> CapxResult<()> {
        let names: Vec<String> = model
            .symbols_in_order()
            .filter(|def| def.kind == ComponentKind::Param && def.default.is_none())
            .map(|def| def.name.clone())
            .collect();
        for name in names {
            if let Some(key) = model.missing_bindings(&name)?.into_iter().next() {
                return Err(CapxError::MissingInput {
                    symbol: name,
                    key: key.join(", "),
                });
            }
        }
        Ok(())
    }

    /// Run every export callback in composition order and collect frames.
    pub fn export(
        &self,
        order: &[String],
        model: &Model,
        ctx: &BuildContext,
    ) -> CapxResult<Vec<ResultFrame>> {
        let mut frames = Vec::new();
        for name in order {
            let module = self.registry.module(name)?;
            if let Some(export_results) = module.hooks.export_results {
                frames.extend(export_results(model, ctx)?);
            }
        }
        Ok(frames)
    }

    /// Run every validation callback. Findings accumulate; nothing fails.
    pub fn validate(
        &self,
        order: &[String],
        io: &dyn CellIo,
        collector: &mut ValidationCollector,
    ) -> CapxResult<()> {
        for name in order {
            let module = self.registry.module(name)?;
            if let Some(validate) = module.hooks.validate {
                validate(io, collector);
            }
        }
        Ok(())
    }

    /// Run every import callback for a scenario.
    pub fn import(&self, order: &[String], io: &dyn CellIo, scenario_id: &str) -> CapxResult<()> {
        for name in order {
            let module = self.registry.module(name)?;
            if let Some(import_results) = module.hooks.import_results {
                import_results(io, scenario_id)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Module;
    use capx_core::{Axis, SymbolDef};
    use capx_io::MemorySource;

    fn linear_registry() -> ModuleRegistry {
        ModuleRegistry::new(vec![
            Module::new("a"),
            Module::new("b").requires(&["a"]),
            Module::new("c").requires(&["b", "a"]),
            Module::new("d").requires(&["c", "b"]),
        ])
        .unwrap()
    }

    #[test]
    fn resolve_order_is_topological_and_deduplicated() {
        let registry = linear_registry();
        let order = resolve_order(&registry, &["d".to_string()]).unwrap();
        assert_eq!(order, ["a", "b", "c", "d"]);
        for (i, name) in order.iter().enumerate() {
            for prerequisite in registry.module(name).unwrap().prerequisites() {
                let pos = order.iter().position(|m| m == prerequisite).unwrap();
                assert!(pos < i, "{prerequisite} must precede {name}");
            }
        }
    }

    #[test]
    fn operational_module_with_capacity_prerequisite_composes_in_order() {
        // Axes {capacity_type: {A, B}, operational_type: {X}}, X requires A:
        // the composed order for X must be exactly [A, X].
        let registry = ModuleRegistry::new(vec![
            Module::new("cap_a").on_axis(Axis::CapacityType),
            Module::new("cap_b").on_axis(Axis::CapacityType),
            Module::new("op_x")
                .on_axis(Axis::OperationalType)
                .requires(&["cap_a"]),
        ])
        .unwrap();
        let order = resolve_order(&registry, &["op_x".to_string()]).unwrap();
        assert_eq!(order, ["cap_a", "op_x"]);
    }

    #[test]
    fn cycle_is_detected_with_path() {
        let registry = ModuleRegistry::new(vec![
            Module::new("a").requires(&["c"]),
            Module::new("b").requires(&["a"]),
            Module::new("c").requires(&["b"]),
        ])
        .unwrap();
        let err = resolve_order(&registry, &["a".to_string()]).unwrap_err();
        match err {
            CapxError::CyclicModuleDependency { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.len() >= 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resolve_order_handles_multiple_targets_first_seen() {
        let registry = linear_registry();
        let order =
            resolve_order(&registry, &["c".to_string(), "d".to_string(), "a".to_string()])
                .unwrap();
        assert_eq!(order, ["a", "b", "c", "d"]);
    }

    fn declare_projects(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
        model.declare(SymbolDef::new("PROJECTS", ComponentKind::Set, "projects"))
    }

    fn load_projects(
        model: &mut Model,
        _ctx: &mut BuildContext,
        io: &dyn CellIo,
    ) -> CapxResult<()> {
        let rows = io.read_columns("projects", &["project"])?;
        model.add_set_members(
            "projects",
            "PROJECTS",
            rows.into_iter().map(|mut r| r.remove(0)),
        )
    }

    fn declare_capacity(model: &mut Model, _ctx: &mut BuildContext) -> CapxResult<()> {
        model.declare(
            SymbolDef::new("capacity_mw", ComponentKind::Param, "gen_spec").over(&["PROJECTS"]),
        )
    }

    fn load_nothing(
        _model: &mut Model,
        _ctx: &mut BuildContext,
        _io: &dyn CellIo,
    ) -> CapxResult<()> {
        Ok(())
    }

    #[test]
    fn unloaded_param_without_default_is_missing_input() {
        let registry = ModuleRegistry::new(vec![
            Module::new("projects").schema(declare_projects).load(load_projects),
            Module::new("gen_spec")
                .requires(&["projects"])
                .schema(declare_capacity)
                .load(load_nothing),
        ])
        .unwrap();
        let io = MemorySource::new().with_table("projects", &["project"], vec![vec!["plant_a"]]);
        let composer = PipelineComposer::new(&registry);
        let mut ctx = BuildContext::default();
        let mut model = Model::new();
        let err = composer
            .compose("gen_spec", &mut ctx, &mut model, &io)
            .unwrap_err();
        match err {
            CapxError::MissingInput { symbol, key } => {
                assert_eq!(symbol, "capacity_mw");
                assert_eq!(key, "plant_a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
