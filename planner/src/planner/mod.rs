//! Runs the whole pipeline for one instance or a batch of them:
//!  build the model, solve it, check the assignment and read it back.

#[macro_use]
pub mod macros;

use crate::config::Config;
use crate::extract::{extract, Extraction};
use crate::instance::{InputValidationError, InstanceData};
use crate::model::{build_model, ModelOptions};
use crate::solver::{GoodLpSolver, MilpSolver, SolutionStatus, SolveOutcome, SolverWorker};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Absolute slack allowed when checking a solver assignment
pub const VERIFY_TOLERANCE: f64 = 1e-6;

/// Result of planning one instance
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleReport {
    /// Unique id of this run
    pub run_id: String,

    /// When the solver returned
    pub solved_at: DateTime<Utc>,

    /// Wall time spent in the solver
    pub solve_duration_ms: u64,

    /// Number of declared variables
    pub variables: usize,

    /// Number of constraints
    pub constraints: usize,

    /// Solver or verification message, if any
    pub message: Option<String>,

    /// Served passengers and selected flights
    #[serde(flatten)]
    pub extraction: Extraction,
}

/// Error returned by [`plan_batch`] for a single instance
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// The model couldn't be built
    Validation(InputValidationError),

    /// The planning task didn't complete
    Task(String),
}

impl Display for PlanError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            PlanError::Validation(e) => write!(f, "Invalid instance: {}", e),
            PlanError::Task(e) => write!(f, "Planning task failed: {}", e),
        }
    }
}

impl std::error::Error for PlanError {}

impl From<InputValidationError> for PlanError {
    fn from(e: InputValidationError) -> Self {
        PlanError::Validation(e)
    }
}

/// Builds, solves and reads back scheduling models with one solver
#[derive(Debug, Clone)]
pub struct Planner<S = GoodLpSolver> {
    solver: S,
    model_options: ModelOptions,
    time_limit: Option<Duration>,
}

impl Planner<GoodLpSolver> {
    /// Planner using [`GoodLpSolver`] and the configured options
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            GoodLpSolver,
            config.model_options()?,
            config.time_limit(),
        ))
    }
}

impl<S: MilpSolver> Planner<S> {
    /// Create a planner
    pub fn new(solver: S, model_options: ModelOptions, time_limit: Option<Duration>) -> Self {
        Self {
            solver,
            model_options,
            time_limit,
        }
    }

    /// Formulation options in use
    pub fn model_options(&self) -> &ModelOptions {
        &self.model_options
    }

    /// Plan a single instance.
    ///
    /// Returns once the solver thread has exited, even when the time limit
    ///  cut the solve short.
    pub fn plan(&self, instance: &InstanceData) -> Result<ScheduleReport, InputValidationError> {
        let (report, worker) = self.plan_detached(instance)?;
        if let Some(worker) = worker {
            planner_debug!("(plan) [{}] Waiting for the solver thread.", report.run_id);
            worker.wait();
        }

        Ok(report)
    }

    /// Plan a single instance and return as soon as the report is ready.
    ///
    /// A solver thread still running past the time limit is returned with
    ///  the report; the caller decides when to wait on it.
    pub fn plan_detached(
        &self,
        instance: &InstanceData,
    ) -> Result<(ScheduleReport, Option<SolverWorker>), InputValidationError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        planner_info!("(plan) Starting run [{}].", run_id);

        let model = build_model(instance, &self.model_options)?;
        let stats = model.stats();
        planner_debug!(
            "(plan) [{}] x: {}, y: {}, p: {}, z: {}, constraints: {:?}",
            run_id,
            stats.flight_variables,
            stats.presence_variables,
            stats.aircraft_presence_variables,
            stats.passenger_variables,
            stats.constraints
        );

        let started = Instant::now();
        let mut outcome = self.solver.solve(&model, self.time_limit);
        let worker = outcome.worker.take();
        let elapsed = started.elapsed();
        let solved_at = Utc::now();
        planner_info!(
            "(plan) [{}] Solver returned {} after {} ms.",
            run_id,
            outcome.status,
            elapsed.as_millis()
        );

        if outcome.status == SolutionStatus::Unbounded {
            // Σz is bounded by the passenger count
            planner_error!(
                "(plan) [{}] Solver reported an unbounded model; the formulation is broken.",
                run_id
            );
        }

        let outcome = match outcome.usable_assignment() {
            Some(assignment) => {
                let violations = model.violations(assignment, VERIFY_TOLERANCE);
                if violations.is_empty() {
                    outcome
                } else {
                    for violation in &violations {
                        planner_error!("(plan) [{}] {}", run_id, violation);
                    }

                    SolveOutcome::without_assignment(
                        SolutionStatus::SolverFailure,
                        Some(format!(
                            "solver assignment breaks {} model requirements",
                            violations.len()
                        )),
                    )
                }
            }
            None => outcome,
        };

        let extraction = extract(instance, &model, &outcome);
        planner_info!(
            "(plan) [{}] {} of {} passengers served with {} flights.",
            run_id,
            extraction.served_count(),
            instance.passengers().len(),
            extraction.flights.len()
        );

        let report = ScheduleReport {
            run_id,
            solved_at,
            solve_duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            variables: model.variables().len(),
            constraints: model.constraints().len(),
            message: outcome.message,
            extraction,
        };

        Ok((report, worker))
    }
}

/// Plan every instance, running at most `max_parallel` solves at once.
///
/// Results keep the order of `instances`. A result can come back before its
///  timed-out solver thread exits; that thread keeps its slot until it does.
pub async fn plan_batch<S>(
    planner: Arc<Planner<S>>,
    instances: Vec<InstanceData>,
    max_parallel: usize,
) -> Vec<Result<ScheduleReport, PlanError>>
where
    S: MilpSolver + Send + Sync + 'static,
{
    planner_info!(
        "(plan_batch) Planning {} instances, {} at a time.",
        instances.len(),
        max_parallel.max(1)
    );

    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let runs = instances
        .into_iter()
        .map(|instance| plan_one(planner.clone(), semaphore.clone(), instance));

    join_all(runs).await
}

async fn plan_one<S>(
    planner: Arc<Planner<S>>,
    semaphore: Arc<Semaphore>,
    instance: InstanceData,
) -> Result<ScheduleReport, PlanError>
where
    S: MilpSolver + Send + Sync + 'static,
{
    let permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| PlanError::Task(e.to_string()))?;

    let (report, worker) = tokio::task::spawn_blocking(move || planner.plan_detached(&instance))
        .await
        .map_err(|e| {
            planner_error!("(plan_one) Planning task failed: {}", e);
            PlanError::Task(e.to_string())
        })??;

    if let Some(worker) = worker {
        let run_id = report.run_id.clone();
        tokio::task::spawn_blocking(move || {
            worker.wait();
            planner_debug!("(plan_one) [{}] Solver thread exited.", run_id);
            drop(permit);
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::HorizonRecord;
    use crate::model::{Assignment, OptimizationModel};
    use crate::test_util::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Returns the same outcome for every model
    struct FixedSolver(SolveOutcome);

    impl MilpSolver for FixedSolver {
        fn solve(&self, _model: &OptimizationModel, _time_limit: Option<Duration>) -> SolveOutcome {
            self.0.clone()
        }
    }

    /// Returns all-ones, which breaks the fleet size constraint
    struct SaturatingSolver;

    impl MilpSolver for SaturatingSolver {
        fn solve(&self, model: &OptimizationModel, _time_limit: Option<Duration>) -> SolveOutcome {
            SolveOutcome::optimal(Assignment::new(vec![1.0; model.variables().len()]))
        }
    }

    /// Gives up at once but leaves a thread busy for `busy`
    struct LingeringSolver {
        busy: Duration,
        done: Arc<AtomicBool>,
    }

    impl MilpSolver for LingeringSolver {
        fn solve(&self, _model: &OptimizationModel, _time_limit: Option<Duration>) -> SolveOutcome {
            let busy = self.busy;
            let done = self.done.clone();
            let handle = std::thread::spawn(move || {
                std::thread::sleep(busy);
                done.store(true, Ordering::SeqCst);
            });

            SolveOutcome {
                worker: Some(SolverWorker::new(handle)),
                ..SolveOutcome::without_assignment(SolutionStatus::TimeLimitReached, None)
            }
        }
    }

    fn lingering_planner(busy: Duration) -> (Planner<LingeringSolver>, Arc<AtomicBool>) {
        let done = Arc::new(AtomicBool::new(false));
        let solver = LingeringSolver {
            busy,
            done: done.clone(),
        };
        let planner = Planner::new(solver, ModelOptions::default(), Some(Duration::ZERO));
        (planner, done)
    }

    fn single_passenger_instance() -> InstanceData {
        let mut file = two_vertiport_file();
        file.passengers.push(passenger("P1", "V1", "V2", 1.0));
        InstanceData::try_from(file).unwrap()
    }

    #[tokio::test]
    async fn ut_plan_single_passenger() {
        crate::get_log_handle().await;
        ut_info!("(ut_plan_single_passenger) Start.");

        let planner = Planner::new(GoodLpSolver, ModelOptions::default(), None);
        let report = planner.plan(&single_passenger_instance()).unwrap();

        assert_eq!(report.extraction.status, SolutionStatus::Optimal);
        assert_eq!(report.extraction.served_passengers, vec!["P1".to_string()]);
        assert_eq!(report.extraction.flights.len(), 1);
        assert_eq!(report.extraction.flights[0].departure_time, 1);
        assert!(report.variables > 0);
        assert!(report.constraints > 0);
        assert!(!report.run_id.is_empty());

        ut_info!("(ut_plan_single_passenger) Success.");
    }

    #[tokio::test]
    async fn ut_plan_downgrades_broken_assignment() {
        crate::get_log_handle().await;
        ut_info!("(ut_plan_downgrades_broken_assignment) Start.");

        let planner = Planner::new(SaturatingSolver, ModelOptions::default(), None);
        let report = planner.plan(&single_passenger_instance()).unwrap();

        assert_eq!(report.extraction.status, SolutionStatus::SolverFailure);
        assert!(report.extraction.served_passengers.is_empty());
        assert!(report.extraction.flights.is_empty());
        assert!(report.message.is_some());

        ut_info!("(ut_plan_downgrades_broken_assignment) Success.");
    }

    #[tokio::test]
    async fn ut_plan_reports_solver_status() {
        crate::get_log_handle().await;
        ut_info!("(ut_plan_reports_solver_status) Start.");

        let outcome = SolveOutcome::without_assignment(
            SolutionStatus::TimeLimitReached,
            Some("stopped".to_string()),
        );
        let planner = Planner::new(FixedSolver(outcome), ModelOptions::default(), None);
        let report = planner.plan(&single_passenger_instance()).unwrap();

        assert_eq!(report.extraction.status, SolutionStatus::TimeLimitReached);
        assert_eq!(report.message, Some("stopped".to_string()));
        assert!(report.extraction.served_passengers.is_empty());

        ut_info!("(ut_plan_reports_solver_status) Success.");
    }

    #[tokio::test]
    async fn ut_plan_waits_for_solver_thread() {
        crate::get_log_handle().await;
        ut_info!("(ut_plan_waits_for_solver_thread) Start.");

        let (planner, done) = lingering_planner(Duration::from_millis(200));
        let report = planner.plan(&single_passenger_instance()).unwrap();

        assert_eq!(report.extraction.status, SolutionStatus::TimeLimitReached);
        assert!(done.load(Ordering::SeqCst));

        ut_info!("(ut_plan_waits_for_solver_thread) Success.");
    }

    #[tokio::test]
    async fn ut_plan_one_holds_permit_until_solver_exits() {
        crate::get_log_handle().await;
        ut_info!("(ut_plan_one_holds_permit_until_solver_exits) Start.");

        let (planner, done) = lingering_planner(Duration::from_millis(500));
        let semaphore = Arc::new(Semaphore::new(1));
        let report = plan_one(
            Arc::new(planner),
            semaphore.clone(),
            single_passenger_instance(),
        )
        .await
        .unwrap();

        // the report is out while the solver thread still runs
        assert_eq!(report.extraction.status, SolutionStatus::TimeLimitReached);
        assert!(!done.load(Ordering::SeqCst));
        assert_eq!(semaphore.available_permits(), 0);

        let mut waited = Duration::ZERO;
        while semaphore.available_permits() == 0 && waited < Duration::from_secs(10) {
            tokio::time::sleep(Duration::from_millis(20)).await;
            waited += Duration::from_millis(20);
        }

        assert_eq!(semaphore.available_permits(), 1);
        assert!(done.load(Ordering::SeqCst));

        ut_info!("(ut_plan_one_holds_permit_until_solver_exits) Success.");
    }

    #[tokio::test]
    async fn ut_plan_rejects_bad_tolerance() {
        crate::get_log_handle().await;
        ut_info!("(ut_plan_rejects_bad_tolerance) Start.");

        let options = ModelOptions {
            time_tolerance: -1.0,
            ..Default::default()
        };
        let planner = Planner::new(GoodLpSolver, options, None);
        let result = planner.plan(&single_passenger_instance());
        assert!(matches!(
            result,
            Err(InputValidationError::InvalidTimeTolerance(_))
        ));

        ut_info!("(ut_plan_rejects_bad_tolerance) Success.");
    }

    #[tokio::test]
    async fn ut_plan_batch_keeps_order() {
        crate::get_log_handle().await;
        ut_info!("(ut_plan_batch_keeps_order) Start.");

        let mut second = two_vertiport_file();
        second.horizon = HorizonRecord { start: 10, end: 14 };
        second.passengers.push(passenger("Q1", "V1", "V2", 12.0));
        second.passengers.push(passenger("Q2", "V2", "V1", 12.0));
        let second = InstanceData::try_from(second).unwrap();

        let planner = Arc::new(Planner::new(GoodLpSolver, ModelOptions::default(), None));
        let results = plan_batch(
            planner,
            vec![single_passenger_instance(), second],
            2,
        )
        .await;

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.extraction.served_passengers, vec!["P1".to_string()]);

        // no V2 -> V1 leg, so Q2 can't be served
        let second = results[1].as_ref().unwrap();
        assert_eq!(second.extraction.served_passengers, vec!["Q1".to_string()]);
        assert_eq!(second.extraction.flights[0].departure_time, 12);
        assert_ne!(first.run_id, second.run_id);

        ut_info!("(ut_plan_batch_keeps_order) Success.");
    }

    #[tokio::test]
    async fn ut_plan_batch_with_zero_parallelism() {
        crate::get_log_handle().await;
        ut_info!("(ut_plan_batch_with_zero_parallelism) Start.");

        let planner = Arc::new(Planner::new(GoodLpSolver, ModelOptions::default(), None));
        let results = plan_batch(planner, vec![single_passenger_instance()], 0).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());

        ut_info!("(ut_plan_batch_with_zero_parallelism) Success.");
    }
}
