//! Working-hours calendar
//!
//! Operator-attended work may only *start* during a shift. Two fixed
//! shifts repeat every day:
//!
//! - Day:     08:30–17:30  (`[510, 1050)` minutes from midnight)
//! - Evening: 15:00–24:00  (`[900, 1440)`)
//!
//! The windows overlap in `[900, 1050)`, so attended time forms a
//! single contiguous block per day, `[510, 1440)`. Shift classification
//! in the overlap goes to Day: first matching window wins. That
//! precedence is a reporting policy, not a physical constraint, and is
//! preserved exactly so identical inputs always label identically.

use crate::Minutes;
use serde::{Deserialize, Serialize};

/// Minutes in one calendar day
pub const MINUTES_PER_DAY: Minutes = 24 * 60;

/// Half-open minute range within a day, `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftWindow {
    /// Minutes from midnight, inclusive
    pub start: Minutes,
    /// Minutes from midnight, exclusive
    pub end: Minutes,
}

impl ShiftWindow {
    pub fn contains(&self, minute_of_day: Minutes) -> bool {
        (self.start..self.end).contains(&minute_of_day)
    }

    pub fn len(&self) -> Minutes {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Day shift, 08:30–17:30
pub const DAY_SHIFT: ShiftWindow = ShiftWindow { start: 510, end: 1050 };

/// Evening shift, 15:00–24:00
pub const EVENING_SHIFT: ShiftWindow = ShiftWindow { start: 900, end: 1440 };

/// Classification order matters: [`shift_of`] returns the first window
/// containing the minute, so Day wins in the overlap.
const SHIFTS: [(ShiftWindow, Shift); 2] = [(DAY_SHIFT, Shift::Day), (EVENING_SHIFT, Shift::Evening)];

/// Operating shift of a time offset, used for reporting only
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shift {
    Day,
    Evening,
    OffHours,
}

impl std::fmt::Display for Shift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shift::Day => write!(f, "Day"),
            Shift::Evening => write!(f, "Evening"),
            Shift::OffHours => write!(f, "OffHours"),
        }
    }
}

/// Classify a horizon offset by its minute of day.
pub fn shift_of(minute: Minutes) -> Shift {
    let m = minute.rem_euclid(MINUTES_PER_DAY);
    for (window, shift) in SHIFTS {
        if window.contains(m) {
            return shift;
        }
    }
    Shift::OffHours
}

/// Whether operator-attended work may legally start at this offset.
pub fn is_attended_start(minute: Minutes) -> bool {
    shift_of(minute) != Shift::OffHours
}

/// All legal start instants for attended work across `num_days` days,
/// strictly increasing with the shift overlap deduplicated.
///
/// Pure function of `num_days` and the fixed shift windows; immutable
/// for the duration of one scheduling run.
pub fn working_minutes(num_days: i64) -> Vec<Minutes> {
    let mut minutes = Vec::new();
    for day in 0..num_days.max(0) {
        let day_base = day * MINUTES_PER_DAY;
        for block in merged_shift_windows() {
            minutes.extend(day_base + block.start..day_base + block.end);
        }
    }
    minutes
}

/// The contiguous attended block each day's shifts merge into.
///
/// The fixed windows overlap, so the merge always yields exactly one
/// block; the model builder relies on that to restrict attended starts
/// with plain interval bounds.
pub fn attended_block() -> ShiftWindow {
    let blocks = merged_shift_windows();
    debug_assert_eq!(blocks.len(), 1, "shift windows no longer merge into one block");
    blocks[0]
}

/// Merge the per-day shift windows into maximal disjoint blocks.
fn merged_shift_windows() -> Vec<ShiftWindow> {
    let mut windows: Vec<ShiftWindow> = SHIFTS
        .iter()
        .map(|(w, _)| *w)
        .filter(|w| !w.is_empty())
        .collect();
    windows.sort_by_key(|w| (w.start, w.end));

    let mut merged: Vec<ShiftWindow> = Vec::new();
    for window in windows {
        match merged.last_mut() {
            Some(last) if window.start <= last.end => {
                last.end = last.end.max(window.end);
            }
            _ => merged.push(window),
        }
    }
    merged
}
