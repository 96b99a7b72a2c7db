//! Solver abstraction: backends, outcomes, and timeout-bounded invocation.

pub mod backend;
pub mod outcome;
pub mod registry;

pub use backend::{solve_bounded, SolverBackend, StubSolver};
pub use outcome::{SolveOptions, SolveOutcome, SolveStatus};
pub use registry::SolverKind;
