//! Incremental re-scheduling after one stage's dates change.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::graph::DependencyIndex;
use crate::models::stage::Stage;

/// One proposed date move produced by an incremental reschedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateShift {
    pub stage_id: String,
    pub old_start: Option<NaiveDate>,
    pub old_end: Option<NaiveDate>,
    pub new_start: NaiveDate,
    pub new_end: NaiveDate,
    pub shift_days: i64,
}

/// Given one stage's dates changed, walk its direct dependents
/// recursively, preserving each dependent's original duration and
/// shifting it to start the day after its parent ends.
///
/// Returns the proposed shifts for audit/preview purposes; nothing is
/// persisted here, the caller applies what it accepts. A visited set
/// guards diamonds: the first path to reach a stage wins.
pub fn recalculate_downstream(
    stage_id: &str,
    new_start: NaiveDate,
    new_end: NaiveDate,
    stages: &[Stage],
) -> Vec<DateShift> {
    debug!(stage_id, %new_start, %new_end, "recalculating downstream dates");

    let index = DependencyIndex::build(stages);
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(stage_id.to_string());

    let mut shifts = Vec::new();
    shift_dependents(stage_id, new_end, &index, &mut visited, &mut shifts);
    shifts
}

fn shift_dependents(
    parent_id: &str,
    parent_end: NaiveDate,
    index: &DependencyIndex<'_>,
    visited: &mut HashSet<String>,
    shifts: &mut Vec<DateShift>,
) {
    for dep_id in index.direct_dependents(parent_id).to_vec() {
        if !visited.insert(dep_id.to_string()) {
            continue;
        }
        let Some(stage) = index.get(dep_id) else {
            continue;
        };

        // Preserve the stage's original duration; fall back to the
        // estimate when it was never scheduled.
        let duration = stage
            .start_date
            .zip(stage.end_date)
            .map(|(start, end)| (end - start).num_days() + 1)
            .or_else(|| stage.estimated_duration.map(i64::from))
            .unwrap_or(1)
            .max(1);

        let new_start = parent_end + Duration::days(1);
        let new_end = new_start + Duration::days(duration - 1);
        let shift_days = stage
            .start_date
            .map(|old| (new_start - old).num_days())
            .unwrap_or(0);

        shifts.push(DateShift {
            stage_id: stage.id.clone(),
            old_start: stage.start_date,
            old_end: stage.end_date,
            new_start,
            new_end,
            shift_days,
        });

        shift_dependents(&stage.id, new_end, index, visited, shifts);
    }
}
