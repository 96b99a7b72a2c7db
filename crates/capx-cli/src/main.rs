use anyhow::{Context, Result};
use capx_core::Axis;
use capx_io::{ResultsStore, TabularSource};
use capx_modules::{builtin_registry, resolve_order, PipelineComposer};
use capx_run::{
    import_results, render_report, verify_import, write_run_manifest, DirectoryInputs, RunConfig,
    RunManifest, SolveOrchestrator,
};
use capx_scenarios::{
    build_targets, decompose, load_config_from_path, validate_config, ComponentResolver,
    ScenarioConfig,
};
use capx_solver::{SolveOptions, SolverKind};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "capx", about = "Capacity-expansion scenario runner")]
struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a scenario configuration and run input validation
    Validate {
        /// Path to the scenario config (YAML or JSON)
        #[arg(long)]
        config: PathBuf,
        /// Scenario inputs directory
        #[arg(long)]
        inputs: PathBuf,
    },
    /// Show the modules a scenario's inputs imply
    Resolve {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        inputs: PathBuf,
    },
    /// Show the cell plan and its dependency levels
    Plan {
        #[arg(long)]
        config: PathBuf,
    },
    /// Run a scenario end to end and import its results
    Run {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        inputs: PathBuf,
        /// Results store root directory
        #[arg(long)]
        results: PathBuf,
        /// Solver backend
        #[arg(long, default_value = "stub")]
        solver: String,
        /// Worker threads (0 = one per CPU)
        #[arg(long, default_value_t = 0)]
        threads: usize,
        /// Per-cell solve time limit in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let result = match cli.command {
        Commands::Validate { config, inputs } => cmd_validate(&config, &inputs),
        Commands::Resolve { config, inputs } => cmd_resolve(&config, &inputs),
        Commands::Plan { config } => cmd_plan(&config),
        Commands::Run {
            config,
            inputs,
            results,
            solver,
            threads,
            timeout_secs,
        } => cmd_run(&config, &inputs, &results, &solver, threads, timeout_secs),
    };
    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn load_scenario(path: &PathBuf) -> Result<ScenarioConfig> {
    let config = load_config_from_path(path)?;
    validate_config(&config)
        .with_context(|| format!("invalid scenario config '{}'", path.display()))?;
    Ok(config)
}

fn cmd_validate(config: &PathBuf, inputs: &PathBuf) -> Result<()> {
    let config = load_scenario(config)?;
    let registry = builtin_registry()?;
    let source = TabularSource::new(inputs);
    let required = ComponentResolver::new(&registry).resolve(&source, &config.features)?;
    let order = resolve_order(&registry, &build_targets(&required))?;
    let composer = PipelineComposer::new(&registry);
    let mut collector = capx_core::ValidationCollector::new();
    composer.validate(&order, &source, &mut collector)?;
    println!("{collector}");
    if collector.count_at(capx_core::ValidationSeverity::High) > 0 {
        std::process::exit(2);
    }
    Ok(())
}

fn cmd_resolve(config: &PathBuf, inputs: &PathBuf) -> Result<()> {
    let config = load_scenario(config)?;
    let registry = builtin_registry()?;
    let source = TabularSource::new(inputs);
    let required = ComponentResolver::new(&registry).resolve(&source, &config.features)?;
    for axis in Axis::ALL {
        let tags = required.for_axis(axis);
        if !tags.is_empty() {
            println!("{axis}: {}", tags.join(", "));
        }
    }
    let order = resolve_order(&registry, &build_targets(&required))?;
    println!("composition order: {}", order.join(" -> "));
    Ok(())
}

fn cmd_plan(config: &PathBuf) -> Result<()> {
    let config = load_scenario(config)?;
    let plan = decompose(&config)?;
    println!("{} cells", plan.len());
    for (depth, level) in plan.levels().into_iter().enumerate() {
        let cells: Vec<String> = level
            .iter()
            .map(|&idx| plan.cells()[idx].id.to_string())
            .collect();
        println!("level {depth}: {}", cells.join(", "));
    }
    Ok(())
}

fn cmd_run(
    config: &PathBuf,
    inputs: &PathBuf,
    results: &PathBuf,
    solver: &str,
    threads: usize,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let scenario = load_scenario(config)?;
    let registry = builtin_registry()?;
    let solver = SolverKind::from_str(solver)?;
    let run_config = RunConfig {
        scenario,
        solver,
        solve_options: SolveOptions {
            timeout: timeout_secs.map(Duration::from_secs),
        },
        threads,
    };
    let started = Utc::now();
    let orchestrator = SolveOrchestrator::new(&registry);
    let summary = orchestrator.run(&run_config, &DirectoryInputs::new(inputs))?;

    let store = ResultsStore::open(results)?;
    let manifest = import_results(&store, &summary)?;
    let composer = PipelineComposer::new(&registry);
    verify_import(&store, &composer, &summary)?;

    let run_manifest =
        RunManifest::from_summary(&summary, manifest.run_id.clone(), solver.as_str(), started);
    let manifest_path = store
        .root()
        .join(&summary.scenario_id)
        .join("run_manifest.json");
    write_run_manifest(&manifest_path, &run_manifest)?;
    info!(manifest = %manifest_path.display(), "run manifest written");

    print!("{}", render_report(&summary));
    if summary.failed() > 0 {
        std::process::exit(3);
    }
    Ok(())
}
