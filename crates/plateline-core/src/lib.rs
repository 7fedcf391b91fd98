//! # plateline-core
//!
//! Core domain model and traits for the plateline scheduling engine.
//!
//! This crate provides:
//! - Domain types: `Job`, `Tank`, `JobBatch`, `Stage`, `Schedule`
//! - The working-hours calendar (see [`calendar`])
//! - The [`Scheduler`] trait implemented by solver backends
//! - Error types and solve-status classification
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use plateline_core::{Duration, Job, JobBatch, Tank};
//!
//! let start = NaiveDate::from_ymd_opt(2025, 5, 15).unwrap();
//! let batch = JobBatch::new(start)
//!     .job(
//!         Job::new("J-001", "Ni")
//!             .soak(Duration::minutes(30))
//!             .plating(Duration::minutes(120))
//!             .rinse(Duration::minutes(15)),
//!     )
//!     .tank(Tank::new("T-01", "Ni"));
//! assert!(batch.validate().is_ok());
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub mod calendar;

pub use calendar::Shift;

// ============================================================================
// Type Aliases
// ============================================================================

/// Unique identifier for a job
pub type JobId = String;

/// Unique identifier for a tank
pub type TankId = String;

/// Categorical tag naming the plating process a job requires
/// (e.g. `"Ni"`, `"Cr"`, `"Zn"`); doubles as the tank-type key.
pub type PlatingType = String;

/// Integer minute offset from the scheduling horizon's origin
pub type Minutes = i64;

/// Duration in whole minutes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Duration {
    /// Number of minutes
    pub minutes: Minutes,
}

impl Duration {
    pub const fn zero() -> Self {
        Self { minutes: 0 }
    }

    pub const fn minutes(m: Minutes) -> Self {
        Self { minutes: m }
    }

    pub const fn hours(h: i64) -> Self {
        Self { minutes: h * 60 }
    }

    /// Convert a fractional hour count, floor-truncating to whole minutes.
    ///
    /// `from_hours(0.333)` is 19 minutes, not 20.
    pub fn from_hours(h: f64) -> Self {
        Self {
            minutes: (h * 60.0).floor() as i64,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.minutes == 0
    }

    pub fn as_hours(&self) -> f64 {
        self.minutes as f64 / 60.0
    }
}

impl std::ops::Add for Duration {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { minutes: self.minutes + rhs.minutes }
    }
}

impl std::ops::Sub for Duration {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { minutes: self.minutes - rhs.minutes }
    }
}

// ============================================================================
// Duration Ingestion
// ============================================================================

/// Primary plating duration as supplied by the caller.
///
/// Raw job records carry the plating duration either as a decimal hour
/// count or as integer minutes. Exactly one of the two fields must be
/// present; the variant is resolved once at ingestion so the model
/// builder never inspects field names.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum DurationSpec {
    /// Hour-denominated (`DurationHour` column), fractional
    Hours(f64),
    /// Minute-denominated (`DurationMin` column)
    Minutes(u32),
}

impl DurationSpec {
    /// Resolve the hour/minute duration fields of a raw record.
    ///
    /// Enforces the input contract: exactly one field present, value
    /// non-negative and finite. `job` is only used for error reporting.
    pub fn from_fields(
        job: &str,
        hours: Option<f64>,
        minutes: Option<i64>,
    ) -> Result<Self, ScheduleError> {
        match (hours, minutes) {
            (None, None) => Err(ScheduleError::MissingDurationField(job.to_owned())),
            (Some(_), Some(_)) => Err(ScheduleError::ConflictingDurationFields(job.to_owned())),
            (Some(h), None) => {
                if !h.is_finite() {
                    return Err(ScheduleError::InvalidDuration {
                        job: job.to_owned(),
                        reason: format!("hour field is not a number: {h}"),
                    });
                }
                if h < 0.0 {
                    return Err(ScheduleError::InvalidDuration {
                        job: job.to_owned(),
                        reason: format!("hour field is negative: {h}"),
                    });
                }
                Ok(Self::Hours(h))
            }
            (None, Some(m)) => {
                let m = u32::try_from(m).map_err(|_| ScheduleError::InvalidDuration {
                    job: job.to_owned(),
                    reason: format!("minute field is negative: {m}"),
                })?;
                Ok(Self::Minutes(m))
            }
        }
    }

    /// Normalize to whole minutes, floor-truncating hour values.
    pub fn to_duration(self) -> Duration {
        match self {
            Self::Hours(h) => Duration::from_hours(h),
            Self::Minutes(m) => Duration::minutes(Minutes::from(m)),
        }
    }
}

// ============================================================================
// Stage
// ============================================================================

/// One of the three sequential processing steps a job passes through.
///
/// Soak and Rinse are operator-attended; Plating runs unattended on the
/// tank and may span off-hours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Soak,
    Plating,
    Rinse,
}

impl Stage {
    /// Stages in processing order. Iteration over this constant is the
    /// canonical stage order everywhere (model construction, extraction,
    /// output).
    pub const ORDER: [Stage; 3] = [Stage::Soak, Stage::Plating, Stage::Rinse];

    /// Whether an operator must be present when the stage starts.
    pub fn is_attended(self) -> bool {
        matches!(self, Stage::Soak | Stage::Rinse)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Soak => write!(f, "Soak"),
            Stage::Plating => write!(f, "Plating"),
            Stage::Rinse => write!(f, "Rinse"),
        }
    }
}

// ============================================================================
// Job
// ============================================================================

/// A single item to be plated: three ordered stage durations plus the
/// plating type that decides which tank it contends for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier (caller-supplied, unique within a batch)
    pub id: JobId,
    /// Plating process this job requires
    pub plating_type: PlatingType,
    /// Operator-attended pre-treatment dip
    pub soak: Duration,
    /// Unattended tank time
    pub plating: Duration,
    /// Operator-attended final rinse
    pub rinse: Duration,
}

impl Job {
    /// Create a new job with zero durations
    pub fn new(id: impl Into<String>, plating_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            plating_type: plating_type.into(),
            soak: Duration::zero(),
            plating: Duration::zero(),
            rinse: Duration::zero(),
        }
    }

    /// Set the soak duration
    pub fn soak(mut self, d: Duration) -> Self {
        self.soak = d;
        self
    }

    /// Set the plating duration
    pub fn plating(mut self, d: Duration) -> Self {
        self.plating = d;
        self
    }

    /// Set the rinse duration
    pub fn rinse(mut self, d: Duration) -> Self {
        self.rinse = d;
        self
    }

    /// Build a job from the raw record fields of the input contract:
    /// a primary duration given in hours *or* minutes, and
    /// minute-denominated soak and rinse durations.
    pub fn from_fields(
        id: impl Into<String>,
        plating_type: impl Into<String>,
        duration_hour: Option<f64>,
        duration_min: Option<i64>,
        soak_minutes: i64,
        rinse_minutes: i64,
    ) -> Result<Self, ScheduleError> {
        let id = id.into();
        let spec = DurationSpec::from_fields(&id, duration_hour, duration_min)?;
        for (field, value) in [("soak", soak_minutes), ("rinse", rinse_minutes)] {
            if value < 0 {
                return Err(ScheduleError::InvalidDuration {
                    job: id,
                    reason: format!("{field} minutes are negative: {value}"),
                });
            }
        }
        Ok(Self {
            id,
            plating_type: plating_type.into(),
            soak: Duration::minutes(soak_minutes),
            plating: spec.to_duration(),
            rinse: Duration::minutes(rinse_minutes),
        })
    }

    /// Duration of a given stage
    pub fn stage_duration(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Soak => self.soak,
            Stage::Plating => self.plating,
            Stage::Rinse => self.rinse,
        }
    }

    /// Sum of all three stage durations
    pub fn total_duration(&self) -> Duration {
        self.soak + self.plating + self.rinse
    }

    fn validate(&self) -> Result<(), ScheduleError> {
        // Negative durations cannot be built through the ingestion path,
        // but the builder API takes raw Durations.
        for stage in Stage::ORDER {
            let d = self.stage_duration(stage);
            if d.minutes < 0 {
                return Err(ScheduleError::InvalidDuration {
                    job: self.id.clone(),
                    reason: format!("{stage} duration is negative: {}", d.minutes),
                });
            }
        }
        if self.total_duration().is_zero() {
            return Err(ScheduleError::InvalidDuration {
                job: self.id.clone(),
                reason: "all stage durations are zero".into(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Tank
// ============================================================================

/// A shared processing vessel dedicated to one plating type.
///
/// At most one job's Plating stage may occupy a tank at any instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tank {
    /// Unique identifier
    pub id: TankId,
    /// Plating process this tank serves
    pub plating_type: PlatingType,
}

impl Tank {
    pub fn new(id: impl Into<String>, plating_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            plating_type: plating_type.into(),
        }
    }
}

/// Naming rule used when the tank table has no entry for a plating type.
///
/// The fallback is an explicit configuration value injected at the
/// solver boundary rather than a constant buried in the model builder,
/// so callers can see (and override) what an implicit tank is called.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackNaming {
    /// Prefix prepended to the plating type, e.g. `"tank-"` → `"tank-Ni"`
    pub prefix: String,
}

impl Default for FallbackNaming {
    fn default() -> Self {
        Self { prefix: "tank-".into() }
    }
}

impl FallbackNaming {
    pub fn id_for(&self, plating_type: &str) -> TankId {
        format!("{}{}", self.prefix, plating_type)
    }
}

/// Resolves a plating type to the tank that serves it.
///
/// Built once per scheduling request from the (optional) tank table.
/// The current scope assumes exactly one tank per type, so when the
/// table lists several tanks for the same type the first one wins.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TankMap {
    by_type: HashMap<PlatingType, TankId>,
    fallback: FallbackNaming,
}

impl TankMap {
    /// Build from a tank table, falling back to `fallback` naming for
    /// types the table does not cover.
    pub fn with_fallback(tanks: &[Tank], fallback: FallbackNaming) -> Self {
        let mut by_type = HashMap::new();
        for tank in tanks {
            by_type
                .entry(tank.plating_type.clone())
                .or_insert_with(|| tank.id.clone());
        }
        Self { by_type, fallback }
    }

    /// Build from a tank table with the default fallback naming.
    pub fn from_tanks(tanks: &[Tank]) -> Self {
        Self::with_fallback(tanks, FallbackNaming::default())
    }

    /// The implicit 1:1 type→tank mapping used when no table is supplied.
    pub fn implicit(fallback: FallbackNaming) -> Self {
        Self {
            by_type: HashMap::new(),
            fallback,
        }
    }

    /// Tank serving the given plating type. Always resolves: types
    /// absent from the table get the fallback-named implicit tank.
    pub fn resolve(&self, plating_type: &str) -> TankId {
        self.by_type
            .get(plating_type)
            .cloned()
            .unwrap_or_else(|| self.fallback.id_for(plating_type))
    }
}

// ============================================================================
// JobBatch
// ============================================================================

/// One scheduling request: the jobs to place, the available tanks, and
/// the calendar date anchoring minute offset 0.
///
/// Constructed once per request from caller-supplied data and immutable
/// thereafter; no state persists across requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobBatch {
    /// Jobs in caller order (the order is part of the deterministic
    /// output contract)
    pub jobs: Vec<Job>,
    /// Tank table; may be empty, in which case the implicit mapping
    /// applies
    pub tanks: Vec<Tank>,
    /// Calendar date of minute offset 0 (midnight, no time component)
    pub start: NaiveDate,
}

impl JobBatch {
    pub fn new(start: NaiveDate) -> Self {
        Self {
            jobs: Vec::new(),
            tanks: Vec::new(),
            start,
        }
    }

    /// Add a job
    pub fn job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }

    /// Add a tank
    pub fn tank(mut self, tank: Tank) -> Self {
        self.tanks.push(tank);
        self
    }

    /// Midnight of the start date; offset 0 of every schedule produced
    /// for this batch.
    pub fn anchor(&self) -> NaiveDateTime {
        self.start
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time of day")
    }

    /// Sum of every stage duration across all jobs; the workload figure
    /// horizon sizing is based on.
    pub fn total_workload(&self) -> Minutes {
        self.jobs.iter().map(|j| j.total_duration().minutes).sum()
    }

    /// Fail-fast input validation, run before any model construction.
    ///
    /// A single bad job rejects the whole batch; partially scheduled
    /// output would be worse than no output.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let mut seen = std::collections::HashSet::new();
        for job in &self.jobs {
            if !seen.insert(job.id.as_str()) {
                return Err(ScheduleError::DuplicateJobId(job.id.clone()));
            }
            job.validate()?;
        }
        Ok(())
    }
}

// ============================================================================
// Schedule (Result)
// ============================================================================

/// Solver outcome classification.
///
/// `Infeasible` and `Unknown` are normal outcomes, not errors: the
/// caller renders them as "no schedule produced". `Unknown` means the
/// search hit its time budget and is deliberately distinct from
/// `Infeasible` (proven absence of a solution).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Solution found and proven optimal under the makespan objective
    Optimal,
    /// Solution found; optimality not proven within the time budget
    Feasible,
    /// Proven: no assignment satisfies the constraints
    Infeasible,
    /// Search ended inconclusively (time budget exhausted)
    Unknown,
}

impl SolveStatus {
    /// Whether stage values exist to extract
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// One scheduled stage occurrence; three of these per job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub job_id: JobId,
    pub plating_type: PlatingType,
    /// Tank hosting this job's plating stage (carried on all three
    /// stage rows)
    pub tank_id: TankId,
    pub stage: Stage,
    /// Minute offset of the stage start from the batch anchor
    pub start_offset: Minutes,
    /// Minute offset of the stage end; `end_offset = start_offset + duration`
    pub end_offset: Minutes,
    /// Absolute start timestamp (anchor + start offset)
    pub start: NaiveDateTime,
    /// Absolute end timestamp (anchor + end offset)
    pub end: NaiveDateTime,
    pub duration: Minutes,
    /// Operating shift of the start instant (reporting only)
    pub shift: Shift,
}

/// The result of one scheduling request.
///
/// Entries are deterministically ordered: jobs in batch order, stages
/// Soak → Plating → Rinse. Empty when `status` carries no solution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub status: SolveStatus,
    pub entries: Vec<ScheduleEntry>,
    /// Latest stage end offset (the makespan); 0 when empty
    pub span: Minutes,
}

impl Schedule {
    /// An entry-less schedule with the given status
    pub fn empty(status: SolveStatus) -> Self {
        Self {
            status,
            entries: Vec::new(),
            span: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry for a specific job and stage
    pub fn entry(&self, job_id: &str, stage: Stage) -> Option<&ScheduleEntry> {
        self.entries
            .iter()
            .find(|e| e.job_id == job_id && e.stage == stage)
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Core scheduling abstraction: a pure function of the batch.
///
/// Implementations must be deterministic for fixed inputs and must not
/// keep solver state across calls.
pub trait Scheduler: Send + Sync {
    /// Compute a schedule for the given batch.
    ///
    /// Input-validation failures are errors; an unsatisfiable or
    /// inconclusive search is *not*: it yields an empty schedule whose
    /// status says why.
    fn schedule(&self, batch: &JobBatch) -> Result<Schedule, ScheduleError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Input and engine errors. Solver outcomes are not errors; see
/// [`SolveStatus`].
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("job '{0}': neither an hour nor a minute duration field is present")]
    MissingDurationField(JobId),

    #[error("job '{0}': both hour and minute duration fields are present")]
    ConflictingDurationFields(JobId),

    #[error("job '{job}': invalid duration: {reason}")]
    InvalidDuration { job: JobId, reason: String },

    #[error("duplicate job id '{0}'")]
    DuplicateJobId(JobId),

    #[error("internal error: {0}")]
    Internal(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn may15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 15).unwrap()
    }

    #[test]
    fn duration_arithmetic() {
        let d1 = Duration::hours(2);
        let d2 = Duration::minutes(30);
        assert_eq!((d1 + d2).minutes, 150);
        assert_eq!((d1 - d2).minutes, 90);
        assert_eq!(d1.as_hours(), 2.0);
    }

    #[test]
    fn from_hours_floor_truncates() {
        assert_eq!(Duration::from_hours(2.5).minutes, 150);
        // 0.333 h = 19.98 min, truncated down
        assert_eq!(Duration::from_hours(0.333).minutes, 19);
        assert_eq!(Duration::from_hours(0.0).minutes, 0);
    }

    #[test]
    fn duration_spec_resolves_exactly_one_field() {
        let hours = DurationSpec::from_fields("j", Some(2.0), None).unwrap();
        assert_eq!(hours, DurationSpec::Hours(2.0));
        assert_eq!(hours.to_duration(), Duration::minutes(120));

        let minutes = DurationSpec::from_fields("j", None, Some(90)).unwrap();
        assert_eq!(minutes, DurationSpec::Minutes(90));
        assert_eq!(minutes.to_duration(), Duration::minutes(90));
    }

    #[test]
    fn duration_spec_neither_field_is_fatal() {
        let err = DurationSpec::from_fields("j7", None, None).unwrap_err();
        assert!(matches!(err, ScheduleError::MissingDurationField(id) if id == "j7"));
    }

    #[test]
    fn duration_spec_both_fields_is_fatal() {
        let err = DurationSpec::from_fields("j7", Some(1.0), Some(60)).unwrap_err();
        assert!(matches!(err, ScheduleError::ConflictingDurationFields(id) if id == "j7"));
    }

    #[test]
    fn duration_spec_rejects_negative_and_nan() {
        assert!(matches!(
            DurationSpec::from_fields("j", Some(-1.0), None),
            Err(ScheduleError::InvalidDuration { .. })
        ));
        assert!(matches!(
            DurationSpec::from_fields("j", Some(f64::NAN), None),
            Err(ScheduleError::InvalidDuration { .. })
        ));
        assert!(matches!(
            DurationSpec::from_fields("j", None, Some(-5)),
            Err(ScheduleError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn job_from_fields_hour_denominated() {
        let job = Job::from_fields("J-001", "Ni", Some(2.0), None, 30, 15).unwrap();
        assert_eq!(job.plating, Duration::minutes(120));
        assert_eq!(job.soak, Duration::minutes(30));
        assert_eq!(job.rinse, Duration::minutes(15));
        assert_eq!(job.total_duration(), Duration::minutes(165));
    }

    #[test]
    fn job_from_fields_rejects_negative_operator_stages() {
        let err = Job::from_fields("J-001", "Ni", None, Some(60), -1, 15).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidDuration { .. }));
    }

    #[test]
    fn job_builder() {
        let job = Job::new("J-002", "Cr")
            .soak(Duration::minutes(10))
            .plating(Duration::hours(1))
            .rinse(Duration::minutes(5));
        assert_eq!(job.id, "J-002");
        assert_eq!(job.plating_type, "Cr");
        assert_eq!(job.stage_duration(Stage::Plating), Duration::minutes(60));
    }

    #[test]
    fn stage_order_and_attendance() {
        assert_eq!(Stage::ORDER, [Stage::Soak, Stage::Plating, Stage::Rinse]);
        assert!(Stage::Soak.is_attended());
        assert!(!Stage::Plating.is_attended());
        assert!(Stage::Rinse.is_attended());
    }

    #[test]
    fn tank_map_prefers_table_over_fallback() {
        let tanks = vec![Tank::new("T-01", "Ni"), Tank::new("T-02", "Cr")];
        let map = TankMap::from_tanks(&tanks);
        assert_eq!(map.resolve("Ni"), "T-01");
        assert_eq!(map.resolve("Cr"), "T-02");
        // Type missing from the table resolves through fallback naming
        assert_eq!(map.resolve("Zn"), "tank-Zn");
    }

    #[test]
    fn tank_map_first_tank_wins_per_type() {
        let tanks = vec![Tank::new("T-01", "Ni"), Tank::new("T-09", "Ni")];
        let map = TankMap::from_tanks(&tanks);
        assert_eq!(map.resolve("Ni"), "T-01");
    }

    #[test]
    fn tank_map_implicit_mapping() {
        let map = TankMap::implicit(FallbackNaming { prefix: "line-".into() });
        assert_eq!(map.resolve("Ni"), "line-Ni");
    }

    #[test]
    fn batch_rejects_duplicate_job_ids() {
        let batch = JobBatch::new(may15())
            .job(Job::new("J-001", "Ni").plating(Duration::minutes(60)))
            .job(Job::new("J-001", "Cr").plating(Duration::minutes(30)));
        let err = batch.validate().unwrap_err();
        assert!(matches!(err, ScheduleError::DuplicateJobId(id) if id == "J-001"));
    }

    #[test]
    fn batch_rejects_all_zero_job() {
        let batch = JobBatch::new(may15()).job(Job::new("J-001", "Ni"));
        let err = batch.validate().unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidDuration { .. }));
    }

    #[test]
    fn batch_workload_sums_all_stages() {
        let batch = JobBatch::new(may15())
            .job(
                Job::new("a", "Ni")
                    .soak(Duration::minutes(30))
                    .plating(Duration::minutes(120))
                    .rinse(Duration::minutes(15)),
            )
            .job(Job::new("b", "Cr").plating(Duration::minutes(60)));
        assert_eq!(batch.total_workload(), 225);
    }

    #[test]
    fn batch_anchor_is_midnight() {
        let batch = JobBatch::new(may15());
        assert_eq!(
            batch.anchor(),
            may15().and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn empty_schedule_helpers() {
        let s = Schedule::empty(SolveStatus::Infeasible);
        assert!(s.is_empty());
        assert_eq!(s.span, 0);
        assert!(!s.status.has_solution());
        assert!(SolveStatus::Feasible.has_solution());
    }
}
