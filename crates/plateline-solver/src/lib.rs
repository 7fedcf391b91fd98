//! # plateline-solver
//!
//! Constraint-programming scheduler for plating jobs.
//!
//! For each job the model carries three ordered stage intervals (Soak,
//! Plating, Rinse) over a bounded minute horizon; operator-attended
//! stages may only start inside working-hours shifts, and plating
//! intervals of the same type never overlap (one tank per type). The
//! driver minimises the makespan with the Pumpkin CP solver and
//! classifies the outcome as optimal, feasible, infeasible or unknown.
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use plateline_core::{Duration, Job, JobBatch, Scheduler};
//! use plateline_solver::CpSolver;
//!
//! let start = NaiveDate::from_ymd_opt(2025, 5, 15).unwrap();
//! let batch = JobBatch::new(start).job(
//!     Job::new("J-001", "Ni")
//!         .soak(Duration::minutes(30))
//!         .plating(Duration::minutes(120))
//!         .rinse(Duration::minutes(15)),
//! );
//!
//! let schedule = CpSolver::new().schedule(&batch).unwrap();
//! assert!(schedule.status.has_solution());
//! ```

use std::time::Instant;

use pumpkin_solver::optimisation::linear_sat_unsat::LinearSatUnsat;
use pumpkin_solver::optimisation::OptimisationDirection;
use pumpkin_solver::results::{OptimisationResult, ProblemSolution};
use pumpkin_solver::termination::TimeBudget;
use pumpkin_solver::Solver;
use tracing::{debug, info};

use plateline_core::calendar::MINUTES_PER_DAY;
use plateline_core::{
    FallbackNaming, JobBatch, Minutes, Schedule, ScheduleError, Scheduler, SolveStatus, TankMap,
};

mod extract;
mod model;

use extract::JobStageTimes;

/// Default horizon multiplier applied to the total workload.
///
/// 1.5× leaves enough slack for the solver to serialize contending
/// plating stages; the value is a heuristic inherited from shop
/// practice, not a proven bound, which is why it is a tunable and not
/// a constant.
pub const DEFAULT_HORIZON_FACTOR: f64 = 1.5;

/// Default horizon floor: two full days.
///
/// Small workloads scale to a horizon that ends before the first
/// attended shift even opens; the floor keeps such instances feasible.
pub const DEFAULT_MIN_HORIZON: Minutes = 2 * MINUTES_PER_DAY;

/// Default search time budget.
pub const DEFAULT_TIME_BUDGET: std::time::Duration = std::time::Duration::from_secs(10);

/// Tunables of the solver driver.
///
/// An undersized horizon silently turns feasible instances into false
/// infeasibilities; lower `horizon_factor` or `min_horizon` only with
/// that failure mode in mind.
#[derive(Clone, Debug)]
pub struct SolverOptions {
    /// Horizon = `max(ceil(horizon_factor × total workload), min_horizon)`
    pub horizon_factor: f64,
    /// Lower bound on the horizon, in minutes
    pub min_horizon: Minutes,
    /// Search budget; exhausting it classifies the run as
    /// [`SolveStatus::Unknown`], never as infeasible
    pub time_budget: std::time::Duration,
    /// Naming rule for tanks the tank table does not list
    pub tank_fallback: FallbackNaming,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            horizon_factor: DEFAULT_HORIZON_FACTOR,
            min_horizon: DEFAULT_MIN_HORIZON,
            time_budget: DEFAULT_TIME_BUDGET,
            tank_fallback: FallbackNaming::default(),
        }
    }
}

impl SolverOptions {
    /// Size the horizon from the batch workload.
    pub fn sized_horizon(&self, total_workload: Minutes) -> Minutes {
        let scaled = (total_workload as f64 * self.horizon_factor).ceil() as Minutes;
        scaled.max(self.min_horizon)
    }
}

/// CP-based plating scheduler.
///
/// Each call builds an isolated, request-scoped model, solves it once
/// and discards it; no solver state persists between requests.
pub struct CpSolver {
    pub options: SolverOptions,
}

impl CpSolver {
    pub fn new() -> Self {
        Self {
            options: SolverOptions::default(),
        }
    }

    pub fn with_options(options: SolverOptions) -> Self {
        Self { options }
    }
}

impl Default for CpSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for CpSolver {
    fn schedule(&self, batch: &JobBatch) -> Result<Schedule, ScheduleError> {
        batch.validate()?;

        let tank_map = TankMap::with_fallback(&batch.tanks, self.options.tank_fallback.clone());

        // Nothing to place; vacuously optimal, and no reason to spin up
        // a solving context.
        if batch.jobs.is_empty() {
            return Ok(Schedule::empty(SolveStatus::Optimal));
        }

        let total = batch.total_workload();
        let horizon = self.options.sized_horizon(total);
        let num_days = (horizon + MINUTES_PER_DAY - 1) / MINUTES_PER_DAY;
        debug!(
            jobs = batch.jobs.len(),
            total_workload = total,
            horizon,
            num_days,
            "building stage model"
        );

        let start_time = Instant::now();
        let model::StageModel {
            mut solver,
            stages,
            makespan,
        } = model::build(batch, horizon, num_days);

        let mut brancher = solver.default_brancher();
        let mut termination = TimeBudget::starting_now(self.options.time_budget);

        fn noop_callback<B>(_: &Solver, _: pumpkin_solver::results::SolutionReference, _: &B) {}
        let result = solver.optimise(
            &mut brancher,
            &mut termination,
            LinearSatUnsat::new(OptimisationDirection::Minimise, makespan, noop_callback),
        );

        // Stage values must be read out before the solving context is
        // released, hence the eager collect in the solution arms.
        let (status, times): (SolveStatus, Vec<JobStageTimes>) = match result {
            OptimisationResult::Optimal(solution) => {
                let times = stages
                    .iter()
                    .map(|vars| JobStageTimes {
                        soak_start: i64::from(solution.get_integer_value(vars.soak)),
                        plating_start: i64::from(solution.get_integer_value(vars.plating)),
                        rinse_start: i64::from(solution.get_integer_value(vars.rinse)),
                    })
                    .collect();
                (SolveStatus::Optimal, times)
            }
            OptimisationResult::Satisfiable(solution) => {
                // Found a solution but ran out of budget before proving
                // it optimal
                let times = stages
                    .iter()
                    .map(|vars| JobStageTimes {
                        soak_start: i64::from(solution.get_integer_value(vars.soak)),
                        plating_start: i64::from(solution.get_integer_value(vars.plating)),
                        rinse_start: i64::from(solution.get_integer_value(vars.rinse)),
                    })
                    .collect();
                (SolveStatus::Feasible, times)
            }
            OptimisationResult::Unsatisfiable => (SolveStatus::Infeasible, Vec::new()),
            OptimisationResult::Unknown => (SolveStatus::Unknown, Vec::new()),
        };

        info!(
            ?status,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "solve finished"
        );

        Ok(extract::build_schedule(batch, &tank_map, status, &times))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_options() {
        let options = SolverOptions::default();
        assert_eq!(options.horizon_factor, DEFAULT_HORIZON_FACTOR);
        assert_eq!(options.min_horizon, 2880);
        assert_eq!(options.time_budget, DEFAULT_TIME_BUDGET);
    }

    #[test]
    fn horizon_scales_and_rounds_up() {
        let options = SolverOptions {
            min_horizon: 0,
            ..SolverOptions::default()
        };
        // 1.5 × 165 = 247.5, rounded up
        assert_eq!(options.sized_horizon(165), 248);
        assert_eq!(options.sized_horizon(0), 0);
    }

    #[test]
    fn horizon_floor_protects_small_workloads() {
        let options = SolverOptions::default();
        assert_eq!(options.sized_horizon(10), 2880);
        // Large workloads are governed by the factor, not the floor
        assert_eq!(options.sized_horizon(10_000), 15_000);
    }
}
