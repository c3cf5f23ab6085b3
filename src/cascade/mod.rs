//! Cascade impact evaluation: simulate the consequences of a status
//! change on dependent stages before it is committed.

#[cfg(test)]
mod tests;

use crate::graph::{dependents, DependencyIndex};
use crate::models::stage::{Stage, StageStatus};

/// How serious a simulated consequence is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The data would become inconsistent if committed.
    High,
    /// In-flight work context would be lost.
    Medium,
}

/// One problematic dependent surfaced by the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactItem {
    pub stage_id: String,
    pub stage_name: String,
    pub severity: Severity,
    pub message: String,
}

/// What the cascade would do to a dependent, without confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeAction {
    Block,
    Unblock,
}

/// A dependent the cascade would adjust automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectEffect {
    pub stage_id: String,
    pub action: CascadeAction,
}

/// Structured preview of what a proposed status change would do to
/// dependent stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Impact {
    pub conflicts: Vec<ImpactItem>,
    pub warnings: Vec<ImpactItem>,
    pub directly_affected: Vec<DirectEffect>,
    pub requires_confirmation: bool,
}

/// Result of checking a single transition, renderable to a user without
/// unwinding an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCheck {
    pub allowed: bool,
    pub reason: Option<String>,
    pub warnings: Vec<String>,
}

impl TransitionCheck {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            warnings: Vec::new(),
        }
    }

    fn refused(reason: String) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            warnings: Vec::new(),
        }
    }
}

/// Simulate the consequences of moving `stage` to `proposed` across its
/// transitive dependents.
///
/// A reset of a further-along stage walks dependents looking for work
/// that would be stranded: completed dependents are conflicts (a
/// completed item would depend on an un-completed one), in-progress
/// dependents are warnings (they will be force-blocked), and the rest
/// are auto-blocked without confirmation. A completion walks dependents
/// for unblock effects instead.
pub fn evaluate_impact(
    stage: &Stage,
    proposed: StageStatus,
    index: &DependencyIndex<'_>,
) -> Impact {
    let mut impact = Impact::default();

    let is_reset = proposed == StageStatus::NotStarted
        && matches!(
            stage.status,
            StageStatus::InProgress | StageStatus::Completed
        );

    if is_reset {
        for dependent in dependents(&stage.id, index, true) {
            match dependent.status {
                StageStatus::Completed => impact.conflicts.push(ImpactItem {
                    stage_id: dependent.id.clone(),
                    stage_name: dependent.name.clone(),
                    severity: Severity::High,
                    message: format!(
                        "'{}' is already completed but depends on '{}'; \
                         resetting leaves the data inconsistent",
                        dependent.name, stage.name
                    ),
                }),
                StageStatus::InProgress => impact.warnings.push(ImpactItem {
                    stage_id: dependent.id.clone(),
                    stage_name: dependent.name.clone(),
                    severity: Severity::Medium,
                    message: format!(
                        "'{}' is in progress and will be blocked, losing in-flight work",
                        dependent.name
                    ),
                }),
                StageStatus::NotStarted | StageStatus::Blocked => {
                    impact.directly_affected.push(DirectEffect {
                        stage_id: dependent.id.clone(),
                        action: CascadeAction::Block,
                    })
                }
            }
        }
    } else if proposed == StageStatus::Completed {
        for dependent in dependents(&stage.id, index, true) {
            if !matches!(
                dependent.status,
                StageStatus::NotStarted | StageStatus::Blocked
            ) {
                continue;
            }
            // Ready once this completion lands: every *other* dependency
            // is already completed.
            let others_completed = dependent
                .dependencies
                .iter()
                .filter(|dep| dep.as_str() != stage.id)
                .all(|dep| {
                    index
                        .get(dep)
                        .is_some_and(|d| d.status == StageStatus::Completed)
                });
            if dependent.dependencies.contains(&stage.id) && others_completed {
                impact.directly_affected.push(DirectEffect {
                    stage_id: dependent.id.clone(),
                    action: CascadeAction::Unblock,
                });
            }
        }
    }

    impact.requires_confirmation =
        !impact.conflicts.is_empty() || !impact.warnings.is_empty();
    impact
}

/// Check whether `stage` may transition to `new_status`.
///
/// Moving into `in_progress` is refused while any dependency is
/// incomplete; the reason states how many are unmet. Moving away from
/// `completed` is allowed but carries a warning counting the dependents
/// it touches - the orchestrator separately applies the evaluator's
/// confirmation gate before committing.
pub fn can_transition(
    stage: &Stage,
    new_status: StageStatus,
    index: &DependencyIndex<'_>,
) -> TransitionCheck {
    if !stage.status.can_transition_to(&new_status) {
        return TransitionCheck::refused(format!(
            "invalid transition {} -> {}",
            stage.status, new_status
        ));
    }

    if new_status == StageStatus::InProgress {
        let unmet = stage
            .dependencies
            .iter()
            .filter(|dep| {
                !index
                    .get(dep)
                    .is_some_and(|d| d.status == StageStatus::Completed)
            })
            .count();
        if unmet > 0 {
            return TransitionCheck::refused(format!(
                "{unmet} unmet {} must be completed first",
                if unmet == 1 { "dependency" } else { "dependencies" }
            ));
        }
    }

    let mut check = TransitionCheck::allowed();
    if stage.status == StageStatus::Completed && new_status != StageStatus::Completed {
        let affected = dependents(&stage.id, index, true).len();
        if affected > 0 {
            check.warnings.push(format!(
                "{affected} dependent {} will be affected",
                if affected == 1 { "stage" } else { "stages" }
            ));
        }
    }
    check
}
