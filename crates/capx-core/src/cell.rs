//! Solve-cell identity and the per-cell state machine.

use serde::{Deserialize, Serialize};

/// Coordinates of one concrete optimization sub-problem.
///
/// A cell is the cross product of the temporal decomposition (subproblem,
/// stage) with the three iteration axes (weather, hydro, availability).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct CellId {
    pub subproblem: u32,
    pub stage: u32,
    pub weather_iteration: u32,
    pub hydro_iteration: u32,
    pub availability_iteration: u32,
}

impl CellId {
    pub fn new(subproblem: u32, stage: u32) -> Self {
        Self {
            subproblem,
            stage,
            ..Self::default()
        }
    }

    pub fn with_iterations(mut self, weather: u32, hydro: u32, availability: u32) -> Self {
        self.weather_iteration = weather;
        self.hydro_iteration = hydro;
        self.availability_iteration = availability;
        self
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "s{}.st{}.w{}.h{}.a{}",
            self.subproblem,
            self.stage,
            self.weather_iteration,
            self.hydro_iteration,
            self.availability_iteration
        )
    }
}

/// Why a cell ended in the `Failed` state.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// Solver reported the formulation infeasible.
    Infeasible,
    /// Solver reported the formulation unbounded.
    Unbounded,
    /// Solver did not return within the configured time bound.
    SolverTimeout,
    /// Solver process crashed or returned an unintelligible result.
    SolverCrash(String),
    /// Model build or data load failed before solving.
    BuildError(String),
    /// An upstream cell this cell consumes a linking decision from failed.
    UpstreamFailure(CellId),
}

impl FailureReason {
    pub fn label(&self) -> &'static str {
        match self {
            FailureReason::Infeasible => "infeasible",
            FailureReason::Unbounded => "unbounded",
            FailureReason::SolverTimeout => "solver_timeout",
            FailureReason::SolverCrash(_) => "solver_crash",
            FailureReason::BuildError(_) => "build_error",
            FailureReason::UpstreamFailure(_) => "upstream_failure",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::SolverCrash(msg) => write!(f, "solver_crash: {msg}"),
            FailureReason::BuildError(msg) => write!(f, "build_error: {msg}"),
            FailureReason::UpstreamFailure(cell) => write!(f, "upstream_failure: {cell}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Lifecycle of one cell: PENDING -> BUILDING -> SOLVING -> terminal.
///
/// A cell only enters `Solving` once every linking decision it depends on
/// has been produced by a `Succeeded` upstream cell; a failed upstream sends
/// it straight to `Failed(UpstreamFailure)` without building.
#[derive(Debug, Clone, PartialEq)]
pub enum CellState {
    Pending,
    Building,
    Solving,
    Succeeded,
    Failed(FailureReason),
}

impl CellState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CellState::Succeeded | CellState::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            CellState::Pending => "pending",
            CellState::Building => "building",
            CellState::Solving => "solving",
            CellState::Succeeded => "succeeded",
            CellState::Failed(_) => "failed",
        }
    }

    /// Whether `next` is a legal lifecycle step from this state. `Failed` is
    /// reachable from any non-terminal state (upstream failure from
    /// `Pending`, load errors from `Building`, solver outcomes from
    /// `Solving`); success requires passing through the full lifecycle.
    pub fn can_transition_to(&self, next: &CellState) -> bool {
        matches!(
            (self, next),
            (CellState::Pending, CellState::Building)
                | (CellState::Building, CellState::Solving)
                | (CellState::Solving, CellState::Succeeded)
                | (CellState::Pending, CellState::Failed(_))
                | (CellState::Building, CellState::Failed(_))
                | (CellState::Solving, CellState::Failed(_))
        )
    }
}
