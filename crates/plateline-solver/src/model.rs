//! Constraint model construction
//!
//! Builds, for every job, three ordered start-time variables over the
//! bounded horizon `[0, H)`, plus the constraints that make a start
//! assignment a legal plating schedule:
//!
//! 1. Stage ordering per job: `plating_start ≥ soak_end`,
//!    `rinse_start ≥ plating_end`. Gaps between stages are permitted
//!    (a job may wait for its tank).
//! 2. Attended stages (Soak, Rinse) must start inside a working-hours
//!    shift; Plating may start at any minute.
//! 3. Per plating type, Plating intervals pairwise never overlap: one
//!    tank per type, one job in it at a time.
//!
//! The attended-start restriction is encoded without reification via a
//! day/minute-of-day decomposition. The daily shift windows merge into
//! one contiguous block `[b_lo, b_hi)`, so
//!
//! ```text
//! start = 1440·q + r,   q ∈ [0, num_days),   r ∈ [b_lo, b_hi)
//! ```
//!
//! pins the start's minute of day inside the block with one linear
//! equality and two auxiliary variables, and nothing else.
//!
//! Mutual exclusion is a disjunctive constraint posted as `cumulative`
//! with unit demands and capacity 1, the classic single-machine
//! encoding.

use pumpkin_solver::constraints as cp;
use pumpkin_solver::variables::{DomainId, TransformableVariable};
use pumpkin_solver::Solver;

use plateline_core::calendar::{self, MINUTES_PER_DAY};
use plateline_core::{JobBatch, Minutes, Stage};

/// Start-time variables for one job, in stage order.
#[derive(Clone, Copy, Debug)]
pub(crate) struct JobStageVars {
    pub soak: DomainId,
    pub plating: DomainId,
    pub rinse: DomainId,
}

/// A fully constrained, request-scoped model ready to hand to the
/// driver. Dropped after extraction; nothing survives the request.
pub(crate) struct StageModel {
    pub solver: Solver,
    /// Per-job variables, in batch order
    pub stages: Vec<JobStageVars>,
    /// Latest rinse end; the driver minimises this
    pub makespan: DomainId,
}

/// Build the constraint model for `batch` over horizon `[0, horizon)`.
///
/// Variables are created in batch order with a fixed stage order, and
/// plating types are grouped in first-seen order, so the model (and
/// with it the search) is deterministic for fixed inputs.
pub(crate) fn build(batch: &JobBatch, horizon: Minutes, num_days: i64) -> StageModel {
    let mut solver = Solver::default();
    let tag = solver.new_constraint_tag();

    let block = calendar::attended_block();
    let horizon = horizon.max(0) as i32;

    let mut stages = Vec::with_capacity(batch.jobs.len());

    for job in &batch.jobs {
        let stage_var = |solver: &mut Solver, stage: Stage| {
            let duration = job.stage_duration(stage).minutes as i32;
            // A stage must finish inside the horizon
            let start = solver.new_bounded_integer(0, (horizon - duration).max(0));

            if stage.is_attended() {
                // start = 1440*q + r with r inside the attended block
                let q = solver.new_bounded_integer(0, (num_days as i32 - 1).max(0));
                let r = solver.new_bounded_integer(block.start as i32, block.end as i32 - 1);
                let terms = vec![
                    start.scaled(1),
                    q.scaled(-(MINUTES_PER_DAY as i32)),
                    r.scaled(-1),
                ];
                let _ = solver.add_constraint(cp::equals(terms, 0, tag)).post();
            }

            start
        };

        let vars = JobStageVars {
            soak: stage_var(&mut solver, Stage::Soak),
            plating: stage_var(&mut solver, Stage::Plating),
            rinse: stage_var(&mut solver, Stage::Rinse),
        };

        // plating_start - soak_start >= soak_duration
        let _ = solver
            .add_constraint(cp::greater_than_or_equals(
                vec![vars.plating.scaled(1), vars.soak.scaled(-1)],
                job.soak.minutes as i32,
                tag,
            ))
            .post();
        // rinse_start - plating_start >= plating_duration
        let _ = solver
            .add_constraint(cp::greater_than_or_equals(
                vec![vars.rinse.scaled(1), vars.plating.scaled(-1)],
                job.plating.minutes as i32,
                tag,
            ))
            .post();

        stages.push(vars);
    }

    // One tank per plating type: plating intervals of a type pairwise
    // disjoint. Types grouped in first-seen order; a type with a single
    // job contributes nothing to disjoin.
    for (_, members) in group_by_type(batch) {
        if members.len() < 2 {
            continue;
        }
        let starts: Vec<DomainId> = members.iter().map(|&i| stages[i].plating).collect();
        let durations: Vec<i32> = members
            .iter()
            .map(|&i| batch.jobs[i].plating.minutes as i32)
            .collect();
        let demands = vec![1; members.len()];
        let _ = solver
            .add_constraint(cp::cumulative(starts, durations, demands, 1, tag))
            .post();
    }

    // makespan >= rinse_end for every job; its upper bound caps the
    // whole schedule at the horizon
    let makespan = solver.new_bounded_integer(0, horizon);
    for (vars, job) in stages.iter().zip(&batch.jobs) {
        let _ = solver
            .add_constraint(cp::greater_than_or_equals(
                vec![makespan.scaled(1), vars.rinse.scaled(-1)],
                job.rinse.minutes as i32,
                tag,
            ))
            .post();
    }

    StageModel {
        solver,
        stages,
        makespan,
    }
}

/// Job indices grouped by plating type, groups and members both in
/// first-seen batch order.
fn group_by_type(batch: &JobBatch) -> Vec<(&str, Vec<usize>)> {
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
    for (idx, job) in batch.jobs.iter().enumerate() {
        match groups
            .iter_mut()
            .find(|(ty, _)| *ty == job.plating_type.as_str())
        {
            Some((_, members)) => members.push(idx),
            None => groups.push((job.plating_type.as_str(), vec![idx])),
        }
    }
    groups
}
