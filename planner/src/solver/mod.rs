//! Solver adapter: hands an [`OptimizationModel`] to a MILP backend and
//!  brings back a status and, when there is one, a variable assignment.

#[macro_use]
pub mod macros;
mod lp;

pub use lp::GoodLpSolver;

use crate::model::{Assignment, OptimizationModel};
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Terminal state of a solve call
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum SolutionStatus {
    /// Proven optimal assignment
    Optimal,

    /// No assignment satisfies the constraints
    Infeasible,

    /// The objective can grow without limit
    Unbounded,

    /// Stopped by the time limit; an incumbent may be attached
    TimeLimitReached,

    /// The backend failed
    SolverFailure,
}

impl Display for SolutionStatus {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            SolutionStatus::Optimal => write!(f, "Optimal"),
            SolutionStatus::Infeasible => write!(f, "Infeasible"),
            SolutionStatus::Unbounded => write!(f, "Unbounded"),
            SolutionStatus::TimeLimitReached => write!(f, "Time limit reached"),
            SolutionStatus::SolverFailure => write!(f, "Solver failure"),
        }
    }
}

/// A solver thread that outlived the call that started it.
///
/// Clones share the same thread. [`SolverWorker::wait`] joins it once;
///  later calls return immediately.
#[derive(Debug, Clone)]
pub struct SolverWorker(Arc<Mutex<Option<JoinHandle<()>>>>);

impl SolverWorker {
    /// Track a running solver thread
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self(Arc::new(Mutex::new(Some(handle))))
    }

    /// Whether the thread has exited
    pub fn is_finished(&self) -> bool {
        let guard = self.0.lock().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map_or(true, |handle| handle.is_finished())
    }

    /// Block until the thread exits
    pub fn wait(&self) {
        let handle = self.0.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(handle) = handle else {
            return;
        };

        if handle.join().is_err() {
            solver_error!("(wait) Solver thread panicked.");
        }
    }
}

impl PartialEq for SolverWorker {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Status plus optional assignment returned by a [`MilpSolver`]
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    /// Terminal state
    pub status: SolutionStatus,

    /// Value of every declared variable, only for `Optimal` or
    ///  `TimeLimitReached` with an incumbent
    pub assignment: Option<Assignment>,

    /// Backend message for failures
    pub message: Option<String>,

    /// Solver thread still running when the call returned; whoever
    ///  bounds solver concurrency waits on it
    pub worker: Option<SolverWorker>,
}

impl SolveOutcome {
    /// Optimal outcome with its assignment
    pub fn optimal(assignment: Assignment) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            assignment: Some(assignment),
            message: None,
            worker: None,
        }
    }

    /// Outcome without an assignment
    pub fn without_assignment(status: SolutionStatus, message: Option<String>) -> Self {
        Self {
            status,
            assignment: None,
            message,
            worker: None,
        }
    }

    /// The assignment, when the status allows reading one
    pub fn usable_assignment(&self) -> Option<&Assignment> {
        match self.status {
            SolutionStatus::Optimal | SolutionStatus::TimeLimitReached => {
                self.assignment.as_ref()
            }
            _ => None,
        }
    }
}

/// A mixed-integer linear programming backend.
///
/// `solve` blocks until the backend finishes or `time_limit` elapses. A
///  backend that can't be interrupted hands its thread back in
///  [`SolveOutcome::worker`].
pub trait MilpSolver {
    /// Solve the model
    fn solve(&self, model: &OptimizationModel, time_limit: Option<Duration>) -> SolveOutcome;
}
