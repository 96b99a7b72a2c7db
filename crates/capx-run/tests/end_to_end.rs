//! Full pipeline: tab-delimited inputs on disk, a two-stage linked run,
//! results committed to the store, and module import checks over the
//! committed tables.

use capx_io::{CellIo, ResultsStore, TabularSource};
use capx_modules::{builtin_registry, PipelineComposer};
use capx_run::{
    import_results, render_report, verify_import, write_run_manifest, DirectoryInputs, RunConfig,
    RunManifest, SolveOrchestrator,
};
use capx_scenarios::{LinkingRule, ScenarioConfig, SubproblemSpec};
use capx_solver::{SolveOptions, SolverKind};
use chrono::Utc;
use std::fs;
use std::path::Path;

fn write_inputs(dir: &Path) {
    let tables: &[(&str, &str)] = &[
        (
            "timepoints",
            "timepoint\tperiod\tweight\nt1\tp1\t1.0\nt2\tp1\t1.0\n",
        ),
        ("load_zones", "load_zone\nzone_a\n"),
        (
            "projects",
            "project\tcapacity_type\toperational_type\tavailability_type\n\
             coal_1\tgen_spec\tgen_commit_lin\tavail_exogenous\n\
             wind_1\tgen_spec\tgen_var\tavail_exogenous\n",
        ),
        (
            "project_capacity",
            "project\tperiod\tcapacity_mw\ncoal_1\tp1\t500\nwind_1\tp1\t200\n",
        ),
        (
            "variable_profiles",
            "project\ttimepoint\tcap_factor\nwind_1\tt1\t0.3\nwind_1\tt2\t0.8\n",
        ),
        (
            "loads",
            "load_zone\ttimepoint\tload_mw\nzone_a\tt1\t400\nzone_a\tt2\t450\n",
        ),
    ];
    for (name, content) in tables {
        fs::write(dir.join(format!("{name}.tab")), content).unwrap();
    }
}

fn config() -> RunConfig {
    RunConfig {
        scenario: ScenarioConfig {
            scenario_id: "e2e".to_string(),
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
fn run_import_and_verify_round_trip() {
    let input_dir = tempfile::tempdir().unwrap();
    let store_dir = tempfile::tempdir().unwrap();
    write_inputs(input_dir.path());

    let registry = builtin_registry().unwrap();
    let orchestrator = SolveOrchestrator::new(&registry);
    let config = config();
    let inputs = DirectoryInputs::new(input_dir.path());
    let started = Utc::now();
    let summary = orchestrator.run(&config, &inputs).unwrap();
    assert_eq!(summary.succeeded(), 2);

    let store = ResultsStore::open(store_dir.path()).unwrap();
    let manifest = import_results(&store, &summary).unwrap();
    assert!(manifest.tables.iter().any(|t| t == "project_dispatch"));
    assert!(manifest.tables.iter().any(|t| t == "validation_log"));

    let composer = PipelineComposer::new(&registry);
    verify_import(&store, &composer, &summary).unwrap();

    // The committed dispatch table carries cell coordinates alongside the
    // frame's own index.
    let committed = TabularSource::csv(store_dir.path().join("e2e"));
    let rows = committed
        .read_columns("project_dispatch", &["stage_id", "project", "power_mw"])
        .unwrap();
    assert_eq!(rows.len(), 8);
    assert!(rows.iter().any(|row| row[0] == "2" && row[1] == "wind_1"));

    let run_manifest = RunManifest::from_summary(
        &summary,
        manifest.run_id,
        config.solver.as_str(),
        started,
    );
    let manifest_path = store_dir.path().join("e2e").join("run_manifest.json");
    write_run_manifest(&manifest_path, &run_manifest).unwrap();
    let report = render_report(&summary);
    assert!(report.contains("2 succeeded, 0 failed"));
    assert!(report.contains("validation: no findings"));
}

#[test]
fn reimport_replaces_previous_results() {
    let input_dir = tempfile::tempdir().unwrap();
    let store_dir = tempfile::tempdir().unwrap();
    write_inputs(input_dir.path());

    let registry = builtin_registry().unwrap();
    let orchestrator = SolveOrchestrator::new(&registry);
    let config = config();
    let inputs = DirectoryInputs::new(input_dir.path());

    let store = ResultsStore::open(store_dir.path()).unwrap();
    let first = orchestrator.run(&config, &inputs).unwrap();
    let first_manifest = import_results(&store, &first).unwrap();

    let second = orchestrator.run(&config, &inputs).unwrap();
    let second_manifest = import_results(&store, &second).unwrap();

    assert_ne!(first_manifest.run_id, second_manifest.run_id);
    let stored = store.manifest("e2e").unwrap();
    assert_eq!(stored.run_id, second_manifest.run_id);
}
