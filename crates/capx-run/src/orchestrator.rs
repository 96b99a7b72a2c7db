//! Executes a scenario's cell DAG: builds, solves, and collects each cell,
//! level by level, carrying linked decisions forward.

use crate::inputs::InputProvider;
use crate::links::LinkStore;
use anyhow::{Context, Result};
use capx_core::{
    BuildContext, CapxError, CapxResult, CellId, CellState, ComponentKind, FailureReason,
    LinkingDecision, Model, RequiredModules, ResultFrame, SymbolDef, ValidationCollector,
};
use capx_modules::{resolve_order, ModuleRegistry, PipelineComposer};
use capx_scenarios::{build_targets, decompose, ComponentResolver, PlannedCell, ScenarioConfig};
use capx_solver::{solve_bounded, SolveOptions, SolveStatus, SolverBackend, SolverKind};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub struct RunConfig {
    pub scenario: ScenarioConfig,
    pub solver: SolverKind,
    pub solve_options: SolveOptions,
    /// 0 means one worker per CPU.
    pub threads: usize,
}

/// Terminal record for one cell.
#[derive(Debug, Clone)]
pub struct CellRecord {
    pub id: CellId,
    pub state: CellState,
    pub objective: Option<f64>,
    pub solve_time_ms: u64,
}

impl CellRecord {
    fn failed(id: CellId, reason: FailureReason) -> Self {
        Self {
            id,
            state: CellState::Failed(reason),
            objective: None,
            solve_time_ms: 0,
        }
    }
}

/// Everything a finished run hands to reporting and the results importer.
pub struct RunSummary {
    pub scenario_id: String,
    pub modules: Vec<String>,
    pub records: Vec<CellRecord>,
    /// Aggregated, cell-scoped frames keyed by frame name.
    pub frames: BTreeMap<String, ResultFrame>,
    pub validation: ValidationCollector,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.state, CellState::Succeeded))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.succeeded()
    }
}

/// Live cell states shared across the worker pool, advanced only along the
/// legal lifecycle (pending, building, solving, then a terminal state).
struct StateTracker {
    states: Mutex<HashMap<CellId, CellState>>,
}

impl StateTracker {
    fn new(cells: impl Iterator<Item = CellId>) -> Self {
        Self {
            states: Mutex::new(cells.map(|id| (id, CellState::Pending)).collect()),
        }
    }

    fn mark(&self, id: CellId, next: CellState) -> CapxResult<()> {
        let mut states = self.lock()?;
        let current = states.get(&id).cloned().unwrap_or(CellState::Pending);
        if !current.can_transition_to(&next) {
            return Err(CapxError::Other(format!(
                "cell {} cannot move from {} to {}",
                id,
                current.label(),
                next.label()
            )));
        }
        debug!(cell = %id, state = next.label(), "cell state");
        states.insert(id, next);
        Ok(())
    }

    fn is_failed(&self, id: &CellId) -> CapxResult<bool> {
        Ok(matches!(self.lock()?.get(id), Some(CellState::Failed(_))))
    }

    fn lock(&self) -> CapxResult<std::sync::MutexGuard<'_, HashMap<CellId, CellState>>> {
        self.states
            .lock()
            .map_err(|_| CapxError::Other("cell state map poisoned by a panicked cell".to_string()))
    }
}

struct CellOutput {
    record: CellRecord,
    frames: Vec<ResultFrame>,
}

impl CellOutput {
    fn failed(id: CellId, reason: FailureReason) -> Self {
        Self {
            record: CellRecord::failed(id, reason),
            frames: Vec::new(),
        }
    }
}

pub struct SolveOrchestrator<'r> {
    registry: &'r ModuleRegistry,
}

impl<'r> SolveOrchestrator<'r> {
    pub fn new(registry: &'r ModuleRegistry) -> Self {
        Self { registry }
    }

    pub fn run(&self, config: &RunConfig, inputs: &dyn InputProvider) -> Result<RunSummary> {
        capx_scenarios::validate_config(&config.scenario)?;
        let plan = decompose(&config.scenario)?;

        // Module resolution reads the first cell's inputs; every cell of a
        // scenario shares one module set.
        let first = plan.cells()[0].id;
        let probe = inputs.source(&first)?;
        let required = ComponentResolver::new(self.registry)
            .resolve(&*probe, &config.scenario.features)
            .context("resolving required modules")?;
        let order = resolve_order(self.registry, &build_targets(&required))?;

        let thread_count = if config.threads == 0 {
            num_cpus::get()
        } else {
            config.threads
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build()
            .context("building thread pool for cell solves")?;

        info!(
            scenario = %config.scenario.scenario_id,
            cells = plan.len(),
            modules = order.len(),
            solver = config.solver.as_str(),
            threads = thread_count,
            "starting scenario run"
        );

        let backend = config.solver.build_solver();
        let links = LinkStore::new();
        let states = StateTracker::new(plan.cells().iter().map(|cell| cell.id));
        let mut records = Vec::with_capacity(plan.len());
        let mut frames: BTreeMap<String, ResultFrame> = BTreeMap::new();

        // Data checks run once per distinct input source, not once per cell;
        // cells reading the same tables would only repeat the same findings.
        let composer = PipelineComposer::new(self.registry);
        let mut validation = ValidationCollector::new();
        let mut checked_sources = HashSet::new();
        for cell in plan.cells() {
            if checked_sources.insert(inputs.source_key(&cell.id)) {
                let source = inputs.source(&cell.id)?;
                composer.validate(&order, &*source, &mut validation)?;
            }
        }

        for (depth, level) in plan.levels().into_iter().enumerate() {
            debug!(depth, cells = level.len(), "executing dependency level");
            let outputs: CapxResult<Vec<CellOutput>> = pool.install(|| {
                level
                    .par_iter()
                    .map(|&idx| {
                        self.run_cell(
                            &plan.cells()[idx],
                            &order,
                            &required,
                            &states,
                            &links,
                            inputs,
                            backend.clone(),
                            &config.solve_options,
                        )
                    })
                    .collect()
            });
            for output in outputs? {
                if let CellState::Failed(reason) = &output.record.state {
                    warn!(cell = %output.record.id, reason = %reason, "cell failed");
                }
                states.mark(output.record.id, output.record.state.clone())?;
                for frame in output.frames {
                    match frames.get_mut(frame.name()) {
                        Some(existing) => existing.merge(frame)?,
                        None => {
                            frames.insert(frame.name().to_string(), frame);
                        }
                    }
                }
                records.push(output.record);
            }
        }

        let summary = RunSummary {
            scenario_id: config.scenario.scenario_id.clone(),
            modules: order,
            records,
            frames,
            validation,
        };
        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            findings = summary.validation.count(),
            "scenario run finished"
        );
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_cell(
        &self,
        cell: &PlannedCell,
        order: &[String],
        required: &RequiredModules,
        states: &StateTracker,
        links: &LinkStore,
        inputs: &dyn InputProvider,
        backend: Arc<dyn SolverBackend>,
        options: &SolveOptions,
    ) -> CapxResult<CellOutput> {
        // A failed upstream poisons the cell before any work happens; it
        // goes straight from pending to failed.
        for (upstream, _) in &cell.upstream {
            if states.is_failed(upstream)? {
                return Ok(CellOutput::failed(
                    cell.id,
                    FailureReason::UpstreamFailure(*upstream),
                ));
            }
        }

        let mut linking_inputs = BTreeMap::new();
        for (upstream, decision) in &cell.upstream {
            let decision = links.fetch(*upstream, decision)?;
            linking_inputs.insert(decision.name.clone(), decision);
        }

        let source = inputs.source(&cell.id)?;
        let composer = PipelineComposer::new(self.registry);

        states.mark(cell.id, CellState::Building)?;
        let mut ctx = BuildContext::for_cell(required.clone(), linking_inputs);
        let mut model = Model::new();
        seed_cell_coordinates(&mut model, cell.id)?;
        match composer.compose_resolved(order, &mut ctx, &mut model, &*source) {
            Ok(()) => {}
            Err(err) if err.aborts_scenario() => return Err(err),
            Err(err) => {
                return Ok(CellOutput::failed(
                    cell.id,
                    FailureReason::BuildError(err.to_string()),
                ))
            }
        }

        states.mark(cell.id, CellState::Solving)?;
        let outcome = solve_bounded(backend, model.clone(), options.clone())?;
        if !outcome.status.is_success() {
            let reason = match outcome.status {
                SolveStatus::Infeasible => FailureReason::Infeasible,
                SolveStatus::Unbounded => FailureReason::Unbounded,
                SolveStatus::Timeout => FailureReason::SolverTimeout,
                SolveStatus::Error | SolveStatus::Optimal => {
                    FailureReason::SolverCrash(outcome.message.unwrap_or_default())
                }
            };
            return Ok(CellOutput::failed(cell.id, reason));
        }

        for (symbol, values) in &outcome.values {
            for (key, value) in values {
                model.bind("solver", symbol, key.clone(), *value)?;
            }
        }

        for production in &cell.produces {
            let Some(values) = outcome.variable(&production.symbol) else {
                return Ok(CellOutput::failed(
                    cell.id,
                    FailureReason::BuildError(format!(
                        "linking symbol '{}' missing from solve outcome",
                        production.symbol
                    )),
                ));
            };
            links.publish(
                LinkingDecision::new(&production.decision, cell.id)
                    .with_values(values.clone()),
            )?;
        }

        let frames = composer
            .export(order, &model, &ctx)?
            .into_iter()
            .map(|frame| frame.scoped_to_cell(cell.id))
            .collect();

        Ok(CellOutput {
            record: CellRecord {
                id: cell.id,
                state: CellState::Succeeded,
                objective: outcome.objective,
                solve_time_ms: outcome.solve_time_ms,
            },
            frames,
        })
    }
}

/// Every cell's model carries its own coordinates as scalar params, so
/// formulations and exports can condition on where they are in the plan.
fn seed_cell_coordinates(model: &mut Model, id: CellId) -> CapxResult<()> {
    let coordinates = [
        ("subproblem_id", id.subproblem),
        ("stage_id", id.stage),
        ("weather_iteration", id.weather_iteration),
        ("hydro_iteration", id.hydro_iteration),
        ("availability_iteration", id.availability_iteration),
    ];
    for (name, value) in coordinates {
        model.declare(SymbolDef::new(name, ComponentKind::Param, "orchestrator"))?;
        model.bind("orchestrator", name, Vec::new(), value as f64)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::SharedInputs;
    use capx_io::MemorySource;
    use capx_modules::builtin_registry;
    use capx_scenarios::{LinkingRule, SubproblemSpec};

    fn minimal_inputs() -> SharedInputs {
        let source = MemorySource::new()
            .with_table(
                "timepoints",
                &["timepoint", "period", "weight"],
                vec![vec!["t1", "p1", "1.0"], vec!["t2", "p1", "1.0"]],
            )
            .with_table("load_zones", &["load_zone"], vec![vec!["zone_a"]])
            .with_table(
                "projects",
                &["project", "capacity_type", "operational_type", "availability_type"],
                vec![
                    vec!["coal_1", "gen_spec", "gen_commit_lin", "avail_exogenous"],
                    vec!["wind_1", "gen_spec", "gen_var", "avail_exogenous"],
                ],
            )
            .with_table(
                "project_capacity",
                &["project", "period", "capacity_mw"],
                vec![vec!["coal_1", "p1", "500"], vec!["wind_1", "p1", "200"]],
            )
            .with_table(
                "variable_profiles",
                &["project", "timepoint", "cap_factor"],
                vec![vec!["wind_1", "t1", "0.3"], vec!["wind_1", "t2", "0.8"]],
            )
            .with_table(
                "loads",
                &["load_zone", "timepoint", "load_mw"],
                vec![vec!["zone_a", "t1", "400"], vec!["zone_a", "t2", "450"]],
            );
        SharedInputs::new(source)
    }

    fn two_stage_config() -> RunConfig {
        RunConfig {
            scenario: ScenarioConfig {
                scenario_id: "two_stage".to_string(),
                description: None,
                features: Vec::new(),
                subproblems: vec![SubproblemSpec {
                    subproblem: 1,
                    stages: vec![1, 2],
                }],
                weather_iterations: 1,
                hydro_iterations: 1,
                availability_iterations: 1,
                linking: vec![LinkingRule {
                    decision: "commitment".to_string(),
                    symbol: "GenCommitLin_Commit_MW".to_string(),
                    from_stage: 1,
                    to_stage: 2,
                }],
            },
            solver: SolverKind::Stub,
            solve_options: SolveOptions::default(),
            threads: 2,
        }
    }

    #[test]
    fn tracker_enforces_the_cell_lifecycle() {
        let cell = CellId::new(1, 1);
        let tracker = StateTracker::new([cell].into_iter());
        tracker.mark(cell, CellState::Building).unwrap();
        tracker.mark(cell, CellState::Solving).unwrap();
        let err = tracker.mark(cell, CellState::Building).unwrap_err();
        assert!(err.to_string().contains("cannot move from solving"));
        tracker.mark(cell, CellState::Succeeded).unwrap();
        assert!(!tracker.is_failed(&cell).unwrap());
    }

    #[test]
    fn two_stage_run_succeeds_and_links_commitment() {
        let registry = builtin_registry().unwrap();
        let orchestrator = SolveOrchestrator::new(&registry);
        let summary = orchestrator
            .run(&two_stage_config(), &minimal_inputs())
            .unwrap();
        assert_eq!(summary.records.len(), 2);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 0);
        assert!(summary.modules.iter().any(|m| m == "gen_commit_lin"));
        assert!(summary.frames.contains_key("project_dispatch"));
    }

    #[test]
    fn aggregated_frames_are_scoped_by_cell() {
        let registry = builtin_registry().unwrap();
        let orchestrator = SolveOrchestrator::new(&registry);
        let summary = orchestrator
            .run(&two_stage_config(), &minimal_inputs())
            .unwrap();
        let dispatch = &summary.frames["project_dispatch"];
        let (headers, rows) = dispatch.to_rows();
        assert_eq!(headers[0], "subproblem_id");
        assert_eq!(headers[1], "stage_id");
        // Two projects, two timepoints, two stages.
        assert_eq!(rows.len(), 8);
        assert!(rows.iter().any(|row| row[1] == "1"));
        assert!(rows.iter().any(|row| row[1] == "2"));
    }

    #[test]
    fn missing_inputs_fail_the_cell_not_the_run() {
        let registry = builtin_registry().unwrap();
        let source = MemorySource::new()
            .with_table(
                "timepoints",
                &["timepoint", "period", "weight"],
                vec![vec!["t1", "p1", "1.0"]],
            )
            .with_table("load_zones", &["load_zone"], vec![vec!["zone_a"]])
            .with_table(
                "projects",
                &["project", "capacity_type", "operational_type", "availability_type"],
                vec![vec!["coal_1", "gen_spec", "gen_simple", "avail_exogenous"]],
            )
            // project_capacity is absent: gen_spec's load fails.
            .with_table(
                "loads",
                &["load_zone", "timepoint", "load_mw"],
                vec![vec!["zone_a", "t1", "400"]],
            );
        let mut config = two_stage_config();
        config.scenario.linking.clear();
        config.scenario.subproblems[0].stages = vec![1];
        let orchestrator = SolveOrchestrator::new(&registry);
        let summary = orchestrator
            .run(&config, &SharedInputs::new(source))
            .unwrap();
        assert_eq!(summary.failed(), 1);
        assert!(matches!(
            summary.records[0].state,
            CellState::Failed(FailureReason::BuildError(_))
        ));
    }

    #[test]
    fn upstream_failure_propagates_without_building() {
        let registry = builtin_registry().unwrap();
        // Stage 1 fails to build (no capacity table), so stage 2 must fail
        // as UpstreamFailure rather than attempting its own build.
        let source = MemorySource::new()
            .with_table(
                "timepoints",
                &["timepoint", "period", "weight"],
                vec![vec!["t1", "p1", "1.0"]],
            )
            .with_table("load_zones", &["load_zone"], vec![vec!["zone_a"]])
            .with_table(
                "projects",
                &["project", "capacity_type", "operational_type", "availability_type"],
                vec![vec!["coal_1", "gen_spec", "gen_commit_lin", "avail_exogenous"]],
            )
            .with_table(
                "loads",
                &["load_zone", "timepoint", "load_mw"],
                vec![vec!["zone_a", "t1", "400"]],
            );
        let config = two_stage_config();
        let orchestrator = SolveOrchestrator::new(&registry);
        let summary = orchestrator
            .run(&config, &SharedInputs::new(source))
            .unwrap();
        assert_eq!(summary.failed(), 2);
        let stage_two = summary
            .records
            .iter()
            .find(|r| r.id.stage == 2)
            .unwrap();
        match &stage_two.state {
            CellState::Failed(FailureReason::UpstreamFailure(upstream)) => {
                assert_eq!(upstream.stage, 1);
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn validation_findings_survive_into_the_summary() {
        let registry = builtin_registry().unwrap();
        let source = MemorySource::new()
            .with_table(
                "timepoints",
                &["timepoint", "period", "weight"],
                vec![vec!["t1", "p1", "1.0"]],
            )
            .with_table("load_zones", &["load_zone"], vec![vec!["zone_a"]])
            .with_table(
                "projects",
                &["project", "capacity_type", "operational_type", "availability_type"],
                vec![vec!["wind_1", "gen_spec", "gen_var", "avail_exogenous"]],
            )
            .with_table(
                "project_capacity",
                &["project", "period", "capacity_mw"],
                vec![vec!["wind_1", "p1", "200"]],
            )
            .with_table(
                "variable_profiles",
                &["project", "timepoint", "cap_factor"],
                // Out of range: validation should flag it.
                vec![vec!["wind_1", "t1", "1.7"]],
            )
            .with_table(
                "loads",
                &["load_zone", "timepoint", "load_mw"],
                vec![vec!["zone_a", "t1", "400"]],
            );
        let mut config = two_stage_config();
        config.scenario.linking.clear();
        config.scenario.subproblems[0].stages = vec![1];
        let orchestrator = SolveOrchestrator::new(&registry);
        let summary = orchestrator
            .run(&config, &SharedInputs::new(source))
            .unwrap();
        assert!(summary.validation.has_findings());
    }

    #[test]
    fn cells_sharing_a_source_do_not_repeat_findings() {
        let registry = builtin_registry().unwrap();
        let source = MemorySource::new()
            .with_table(
                "timepoints",
                &["timepoint", "period", "weight"],
                vec![vec!["t1", "p1", "1.0"]],
            )
            .with_table("load_zones", &["load_zone"], vec![vec!["zone_a"]])
            .with_table(
                "projects",
                &["project", "capacity_type", "operational_type", "availability_type"],
                vec![vec!["wind_1", "gen_spec", "gen_var", "avail_exogenous"]],
            )
            .with_table(
                "project_capacity",
                &["project", "period", "capacity_mw"],
                vec![vec!["wind_1", "p1", "200"]],
            )
            .with_table(
                "variable_profiles",
                &["project", "timepoint", "cap_factor"],
                vec![vec!["wind_1", "t1", "1.7"]],
            )
            .with_table(
                "loads",
                &["load_zone", "timepoint", "load_mw"],
                vec![vec!["zone_a", "t1", "400"]],
            );
        // Two stages reading identical tables: the out-of-range capacity
        // factor must be reported once, not once per cell.
        let mut config = two_stage_config();
        config.scenario.linking.clear();
        let orchestrator = SolveOrchestrator::new(&registry);
        let summary = orchestrator
            .run(&config, &SharedInputs::new(source))
            .unwrap();
        assert_eq!(summary.records.len(), 2);
        assert_eq!(summary.validation.count(), 1);
    }
}
