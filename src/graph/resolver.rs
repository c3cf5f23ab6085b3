//! Derived-status resolution and dependent traversal.

use std::collections::{HashSet, VecDeque};

use crate::models::stage::{Stage, StageStatus};

use super::DependencyIndex;

/// Computed readiness of a stage, distinct from its stored status.
///
/// Derivation only applies to `not_started` stages; a stage that is
/// actually in progress, completed, or blocked reports that status
/// verbatim regardless of its dependency state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedStatus {
    /// Not started and every dependency is completed (or none exist).
    Ready,
    /// A dependency is unmet, or the stage is actually blocked.
    Blocked,
    InProgress,
    Completed,
}

/// Compute a stage's effective status from its actual status and its
/// dependency set.
///
/// A dependency referencing a missing stage counts as unmet; the
/// integrity issue itself is reported by [`super::validate`], not fixed
/// here.
pub fn derived_status(stage: &Stage, index: &DependencyIndex<'_>) -> DerivedStatus {
    match stage.status {
        StageStatus::InProgress => return DerivedStatus::InProgress,
        StageStatus::Completed => return DerivedStatus::Completed,
        StageStatus::Blocked => return DerivedStatus::Blocked,
        StageStatus::NotStarted => {}
    }

    if dependencies_met(stage, index) {
        DerivedStatus::Ready
    } else {
        DerivedStatus::Blocked
    }
}

/// Raw dependency completeness, ignoring the stage's own stored status.
///
/// This is what unblocking decisions consult: a stored-`blocked` stage
/// reports `blocked` from [`derived_status`] verbatim, but it is ready
/// to be unblocked exactly when this returns true.
pub fn dependencies_met(stage: &Stage, index: &DependencyIndex<'_>) -> bool {
    stage.dependencies.iter().all(|dep| {
        index
            .get(dep)
            .is_some_and(|d| d.status == StageStatus::Completed)
    })
}

/// Collect the stages that depend on `stage_id`, breadth-first over the
/// reverse edges with a visited set to guard re-entry on diamonds.
///
/// When `transitive` is false only direct dependents are returned.
pub fn dependents<'a>(
    stage_id: &str,
    index: &DependencyIndex<'a>,
    transitive: bool,
) -> Vec<&'a Stage> {
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(stage_id);

    let mut queue: VecDeque<&str> = index.direct_dependents(stage_id).iter().copied().collect();
    let mut found = Vec::new();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        if let Some(stage) = index.get(id) {
            found.push(stage);
            if transitive {
                queue.extend(index.direct_dependents(id).iter().copied());
            }
        }
    }

    found
}
