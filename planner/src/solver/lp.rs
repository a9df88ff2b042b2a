//! [`MilpSolver`] backed by `good_lp` and its pure Rust `microlp` solver.

use super::{MilpSolver, SolutionStatus, SolveOutcome, SolverWorker};
use crate::model::{Assignment, LinearExpr, OptimizationModel, Sense, VarDomain};
use good_lp::{
    constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

/// `microlp` branch and bound through `good_lp`.
///
/// `microlp` has no native time limit: with a limit the solve runs on a
///  worker thread and the call returns when the limit elapses, without
///  an incumbent. The thread can't be stopped, so it is handed back in
///  [`SolveOutcome::worker`] until it exits.
#[derive(Debug, Copy, Clone, Default)]
pub struct GoodLpSolver;

impl MilpSolver for GoodLpSolver {
    fn solve(&self, model: &OptimizationModel, time_limit: Option<Duration>) -> SolveOutcome {
        solver_info!(
            "(solve) Solving [{}] with {} variables and {} constraints, time limit {:?}.",
            model.name(),
            model.variables().len(),
            model.constraints().len(),
            time_limit
        );

        let Some(limit) = time_limit else {
            return solve_model(model);
        };

        let (tx, rx) = mpsc::channel();
        let owned = model.clone();
        let spawned = std::thread::Builder::new()
            .name(String::from("microlp"))
            .spawn(move || {
                // the receiver is gone once the limit has elapsed
                let _ = tx.send(solve_model(&owned));
            });

        let worker = match spawned {
            Ok(handle) => SolverWorker::new(handle),
            Err(e) => {
                solver_error!("(solve) Could not start solver thread: {}", e);
                return SolveOutcome::without_assignment(
                    SolutionStatus::SolverFailure,
                    Some(format!("could not start solver thread: {}", e)),
                );
            }
        };

        match rx.recv_timeout(limit) {
            Ok(outcome) => {
                worker.wait();
                outcome
            }
            Err(RecvTimeoutError::Timeout) => {
                solver_warn!(
                    "(solve) Time limit of {:?} reached without an incumbent.",
                    limit
                );
                SolveOutcome {
                    worker: Some(worker),
                    ..SolveOutcome::without_assignment(SolutionStatus::TimeLimitReached, None)
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                worker.wait();
                solver_error!("(solve) Solver thread stopped without a result.");
                SolveOutcome::without_assignment(
                    SolutionStatus::SolverFailure,
                    Some(String::from("solver thread stopped without a result")),
                )
            }
        }
    }
}

fn expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut result = Expression::from(0.0);
    for (var, coefficient) in expr.terms() {
        result += *coefficient * handles[var.index()];
    }
    result
}

fn solve_model(model: &OptimizationModel) -> SolveOutcome {
    let mut problem = ProblemVariables::new();
    let handles = model
        .variables()
        .iter()
        .map(|decl| {
            let definition = match decl.domain {
                VarDomain::Binary => variable().binary(),
                VarDomain::Integer { lower, upper } => {
                    variable().integer().min(lower as f64).max(upper as f64)
                }
            };
            problem.add(definition.name(decl.name.clone()))
        })
        .collect::<Vec<Variable>>();

    let objective = expression(&model.objective().expr, &handles);
    let mut lp = problem.maximise(objective).using(microlp);
    for c in model.constraints() {
        let lhs = expression(&c.expr, &handles);
        lp = lp.with(match c.sense {
            Sense::LessEq => constraint::leq(lhs, c.rhs),
            Sense::Equal => constraint::eq(lhs, c.rhs),
        });
    }

    match lp.solve() {
        Ok(solution) => {
            let values = handles.iter().map(|var| solution.value(*var)).collect();
            solver_debug!("(solve_model) Optimal solution found for [{}].", model.name());
            SolveOutcome::optimal(Assignment::new(values))
        }
        Err(ResolutionError::Infeasible) => {
            solver_info!("(solve_model) Model [{}] is infeasible.", model.name());
            SolveOutcome::without_assignment(SolutionStatus::Infeasible, None)
        }
        Err(ResolutionError::Unbounded) => {
            solver_error!("(solve_model) Model [{}] is unbounded.", model.name());
            SolveOutcome::without_assignment(SolutionStatus::Unbounded, None)
        }
        Err(e) => {
            solver_error!("(solve_model) Solver failed on [{}]: {}", model.name(), e);
            SolveOutcome::without_assignment(SolutionStatus::SolverFailure, Some(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{InstanceData, InstanceFile};
    use crate::model::{build_model, ModelOptions};
    use crate::test_util::*;

    #[tokio::test]
    async fn ut_solve_single_passenger() {
        crate::get_log_handle().await;
        ut_info!("(ut_solve_single_passenger) Start.");

        let mut file = two_vertiport_file();
        file.passengers.push(passenger("P1", "V1", "V2", 1.0));
        let instance = InstanceData::try_from(file).unwrap();
        let model = build_model(&instance, &ModelOptions::default()).unwrap();

        let outcome = GoodLpSolver.solve(&model, None);
        assert_eq!(outcome.status, SolutionStatus::Optimal);

        let assignment = outcome.assignment.unwrap();
        assert_eq!(assignment.len(), model.variables().len());
        assert!((model.objective().expr.evaluate(&assignment) - 1.0).abs() < 1e-6);
        assert!(model.violations(&assignment, 1e-6).is_empty());

        ut_info!("(ut_solve_single_passenger) Success.");
    }

    #[tokio::test]
    async fn ut_solve_with_time_limit() {
        crate::get_log_handle().await;
        ut_info!("(ut_solve_with_time_limit) Start.");

        let mut file = two_vertiport_file();
        file.passengers.push(passenger("P1", "V1", "V2", 2.0));
        let instance = InstanceData::try_from(file).unwrap();
        let model = build_model(&instance, &ModelOptions::default()).unwrap();

        let outcome = GoodLpSolver.solve(&model, Some(Duration::from_secs(60)));
        assert_eq!(outcome.status, SolutionStatus::Optimal);
        assert!(outcome.assignment.is_some());
        assert!(outcome.worker.is_none());

        ut_info!("(ut_solve_with_time_limit) Success.");
    }

    #[tokio::test]
    async fn ut_solve_time_limit_hands_back_worker() {
        crate::get_log_handle().await;
        ut_info!("(ut_solve_time_limit_hands_back_worker) Start.");

        let path = format!("{}/data/sample_instance.json", env!("CARGO_MANIFEST_DIR"));
        let instance = InstanceData::try_from(InstanceFile::from_path(&path).unwrap()).unwrap();
        let model = build_model(&instance, &ModelOptions::default()).unwrap();

        let outcome = GoodLpSolver.solve(&model, Some(Duration::ZERO));
        assert_eq!(outcome.status, SolutionStatus::TimeLimitReached);
        assert!(outcome.assignment.is_none());

        let worker = outcome.worker.unwrap();
        worker.wait();
        assert!(worker.is_finished());

        // a second wait is a no-op
        worker.wait();

        ut_info!("(ut_solve_time_limit_hands_back_worker) Success.");
    }

    #[tokio::test]
    async fn ut_solve_infeasible() {
        crate::get_log_handle().await;
        ut_info!("(ut_solve_infeasible) Start.");

        // one aircraft but nowhere to park it
        let mut file = two_vertiport_file();
        file.gates.insert("V1".to_string(), 0);
        file.gates.insert("V2".to_string(), 0);
        let instance = InstanceData::try_from(file).unwrap();
        let model = build_model(&instance, &ModelOptions::default()).unwrap();

        let outcome = GoodLpSolver.solve(&model, None);
        assert_eq!(outcome.status, SolutionStatus::Infeasible);
        assert!(outcome.assignment.is_none());

        ut_info!("(ut_solve_infeasible) Success.");
    }
}
