//! The closed catalog of formulation modules.
//!
//! A [`Module`] is a named unit of formulation logic: the axis it belongs to
//! (infrastructure modules are axis-independent), an ordered prerequisite
//! list, and a capability set of optional callbacks. Modules are stateless;
//! all mutable state lives in the [`Model`] and [`BuildContext`] passed into
//! the callbacks.
//!
//! The registry is validated once at construction: every prerequisite must
//! resolve, names must be unique, and no two modules may export the same
//! value column into the same result frame. A violation is a fatal
//! configuration error, not a data error.

use capx_core::{
    Axis, BuildContext, CapxError, CapxResult, Model, ResultFrame, ValidationCollector,
};
use capx_io::CellIo;
use std::collections::BTreeMap;

/// Adds sets/params/vars/constraints to the model.
pub type SchemaFn = fn(&mut Model, &mut BuildContext) -> CapxResult<()>;
/// Binds concrete values from the cell's input source into declared symbols.
pub type LoadFn = fn(&mut Model, &mut BuildContext, &dyn CellIo) -> CapxResult<()>;
/// Extracts result frames from a solved model.
pub type ExportFn = fn(&Model, &BuildContext) -> CapxResult<Vec<ResultFrame>>;
/// Inspects raw inputs for data-quality findings. Never fails the pipeline.
pub type ValidateFn = fn(&dyn CellIo, &mut ValidationCollector);
/// Post-processes imported results for one scenario.
pub type ImportFn = fn(&dyn CellIo, &str) -> CapxResult<()>;

/// Optional callbacks a module may implement. Absence of a callback means
/// the module does not participate in that phase.
#[derive(Default, Clone, Copy)]
pub struct ModuleHooks {
    pub contribute_schema: Option<SchemaFn>,
    pub load_data: Option<LoadFn>,
    pub export_results: Option<ExportFn>,
    pub validate: Option<ValidateFn>,
    pub import_results: Option<ImportFn>,
}

impl std::fmt::Debug for ModuleHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHooks")
            .field("contribute_schema", &self.contribute_schema.is_some())
            .field("load_data", &self.load_data.is_some())
            .field("export_results", &self.export_results.is_some())
            .field("validate", &self.validate.is_some())
            .field("import_results", &self.import_results.is_some())
            .finish()
    }
}

/// One registered formulation module.
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    axis: Option<Axis>,
    prerequisites: Vec<String>,
    pub hooks: ModuleHooks,
    /// (frame, column) pairs this module exports; checked for collisions at
    /// registration.
    result_columns: Vec<(String, String)>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            axis: None,
            prerequisites: Vec::new(),
            hooks: ModuleHooks::default(),
            result_columns: Vec::new(),
        }
    }

    pub fn on_axis(mut self, axis: Axis) -> Self {
        self.axis = Some(axis);
        self
    }

    pub fn requires(mut self, prerequisites: &[&str]) -> Self {
        self.prerequisites = prerequisites.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn schema(mut self, f: SchemaFn) -> Self {
        self.hooks.contribute_schema = Some(f);
        self
    }

    pub fn load(mut self, f: LoadFn) -> Self {
        self.hooks.load_data = Some(f);
        self
    }

    pub fn export(mut self, f: ExportFn) -> Self {
        self.hooks.export_results = Some(f);
        self
    }

    pub fn validate(mut self, f: ValidateFn) -> Self {
        self.hooks.validate = Some(f);
        self
    }

    pub fn import(mut self, f: ImportFn) -> Self {
        self.hooks.import_results = Some(f);
        self
    }

    pub fn exports_column(mut self, frame: &str, column: &str) -> Self {
        self.result_columns
            .push((frame.to_string(), column.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn axis(&self) -> Option<Axis> {
        self.axis
    }

    pub fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    pub fn result_columns(&self) -> &[(String, String)] {
        &self.result_columns
    }
}

/// Closed, validated catalog of modules, grouped by axis.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    by_name: BTreeMap<String, Module>,
}

impl ModuleRegistry {
    /// Build and validate a registry.
    pub fn new(modules: Vec<Module>) -> CapxResult<Self> {
        let mut by_name: BTreeMap<String, Module> = BTreeMap::new();
        for module in modules {
            if by_name.contains_key(module.name()) {
                return Err(CapxError::DuplicateModule {
                    module: module.name().to_string(),
                });
            }
            by_name.insert(module.name().to_string(), module);
        }
        let registry = Self { by_name };
        registry.check_prerequisites()?;
        registry.check_result_columns()?;
        Ok(registry)
    }

    fn check_prerequisites(&self) -> CapxResult<()> {
        for module in self.by_name.values() {
            for prerequisite in module.prerequisites() {
                if !self.by_name.contains_key(prerequisite) {
                    return Err(CapxError::MissingPrerequisite {
                        module: module.name().to_string(),
                        prerequisite: prerequisite.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_result_columns(&self) -> CapxResult<()> {
        let mut owners: BTreeMap<(String, String), String> = BTreeMap::new();
        for module in self.by_name.values() {
            for (frame, column) in module.result_columns() {
                if let Some(first) =
                    owners.insert((frame.clone(), column.clone()), module.name().to_string())
                {
                    return Err(CapxError::ResultColumnConflict {
                        frame: frame.clone(),
                        column: column.clone(),
                        first,
                        second: module.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn module(&self, name: &str) -> CapxResult<&Module> {
        self.by_name
            .get(name)
            .ok_or_else(|| CapxError::UnknownModule {
                module: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Modules on an axis, ordered by canonical name.
    pub fn modules_for_axis(&self, axis: Axis) -> Vec<&Module> {
        self.by_name
            .values()
            .filter(|m| m.axis() == Some(axis))
            .collect()
    }

    /// Known tags on an axis (the closed enumeration the resolver validates
    /// scenario data against).
    pub fn tags_for_axis(&self, axis: Axis) -> Vec<&str> {
        self.modules_for_axis(axis)
            .into_iter()
            .map(Module::name)
            .collect()
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prerequisite_fails_at_construction() {
        let modules = vec![Module::new("gen_simple").requires(&["projects"])];
        let err = ModuleRegistry::new(modules).unwrap_err();
        match err {
            CapxError::MissingPrerequisite {
                module,
                prerequisite,
            } => {
                assert_eq!(module, "gen_simple");
                assert_eq!(prerequisite, "projects");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let modules = vec![Module::new("projects"), Module::new("projects")];
        assert!(matches!(
            ModuleRegistry::new(modules).unwrap_err(),
            CapxError::DuplicateModule { .. }
        ));
    }

    #[test]
    fn result_column_collision_is_caught_at_registration() {
        let modules = vec![
            Module::new("gen_simple").exports_column("project_dispatch", "power_mw"),
            Module::new("gen_var").exports_column("project_dispatch", "power_mw"),
        ];
        let err = ModuleRegistry::new(modules).unwrap_err();
        match err {
            CapxError::ResultColumnConflict {
                frame,
                column,
                first,
                second,
            } => {
                assert_eq!(frame, "project_dispatch");
                assert_eq!(column, "power_mw");
                assert_eq!((first.as_str(), second.as_str()), ("gen_simple", "gen_var"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn axis_lookup_is_ordered_by_name() {
        let registry = ModuleRegistry::new(vec![
            Module::new("stor_spec").on_axis(Axis::CapacityType),
            Module::new("gen_spec").on_axis(Axis::CapacityType),
            Module::new("gen_simple").on_axis(Axis::OperationalType),
        ])
        .unwrap();
        let names: Vec<_> = registry
            .modules_for_axis(Axis::CapacityType)
            .into_iter()
            .map(Module::name)
            .collect();
        assert_eq!(names, ["gen_spec", "stor_spec"]);
        assert!(matches!(
            registry.module("gen_fancy").unwrap_err(),
            CapxError::UnknownModule { .. }
        ));
    }
}
