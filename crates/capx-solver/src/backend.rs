//! Solver backend trait and the built-in stub backend.

use crate::outcome::{SolveOptions, SolveOutcome, SolveStatus};
use capx_core::{CapxResult, Model};
use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

/// A backend takes a fully-built model and returns a solve outcome. Errors
/// are reserved for malformed models; solver-side failures (infeasible,
/// timeout, crash) travel in the outcome status instead.
pub trait SolverBackend: Send + Sync {
    fn name(&self) -> &str;

    fn solve(&self, model: &Model, options: &SolveOptions) -> CapxResult<SolveOutcome>;
}

/// Backend that accepts every model and reports an all-zero optimum. Keeps
/// the orchestration path exercisable without an optimization engine.
#[derive(Debug, Clone, Default)]
pub struct StubSolver;

impl SolverBackend for StubSolver {
    fn name(&self) -> &str {
        "stub"
    }

    fn solve(&self, model: &Model, _options: &SolveOptions) -> CapxResult<SolveOutcome> {
        let started = Instant::now();
        let mut values = BTreeMap::new();
        for var in model.vars() {
            let keys = model.index_space(&var.name)?;
            let solved: BTreeMap<_, _> = keys.into_iter().map(|key| (key, 0.0)).collect();
            values.insert(var.name.clone(), solved);
        }
        debug!(variables = values.len(), "stub solve complete");
        Ok(SolveOutcome {
            status: SolveStatus::Optimal,
            objective: Some(0.0),
            values,
            message: None,
            solve_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Runs the backend with its timeout enforced. The solve happens on a
/// detached thread; if the deadline passes the thread is abandoned and a
/// timeout outcome is returned, so a hung backend fails one cell rather
/// than the whole run.
pub fn solve_bounded(
    backend: Arc<dyn SolverBackend>,
    model: Model,
    options: SolveOptions,
) -> CapxResult<SolveOutcome> {
    let Some(timeout) = options.timeout else {
        return backend.solve(&model, &options);
    };
    let (tx, rx) = mpsc::channel();
    let name = backend.name().to_string();
    thread::spawn(move || {
        let result = backend.solve(&model, &options);
        let _ = tx.send(result);
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!(solver = %name, timeout_ms = timeout.as_millis() as u64, "solve timed out");
            Ok(SolveOutcome::failed(
                SolveStatus::Timeout,
                format!("solver '{}' exceeded {}ms", name, timeout.as_millis()),
            ))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Ok(SolveOutcome::failed(
            SolveStatus::Error,
            format!("solver '{}' terminated without reporting an outcome", name),
        )),
    }
}
