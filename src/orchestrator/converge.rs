//! Convergence pass keeping stored blocked/not_started statuses
//! consistent with raw dependency completeness.

use anyhow::Result;

use crate::models::stage::{Stage, StageStatus};
use crate::store::StagePatch;

use super::events::StageEvent;
use super::StageOrchestrator;

/// A corrective status write applied by a convergence pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convergence {
    pub stage_id: String,
    pub from: StageStatus,
    pub to: StageStatus,
}

impl StageOrchestrator {
    /// For every stage that is not in progress or completed, recompute
    /// whether it should be `blocked` or `not_started` from dependency
    /// completeness, writing only where the stored state differs.
    ///
    /// Passes are iterated until one changes nothing, bounded by the
    /// stage count, so multi-hop cascades settle within the call that
    /// triggered them; the watcher's sweep remains the safety net for
    /// out-of-band edits.
    pub fn auto_converge(&self, project_id: &str) -> Result<Vec<Convergence>> {
        let mut stages = self.stages.list(project_id)?;
        let mut applied = Vec::new();

        for _ in 0..=stages.len() {
            let changes = self.converge_pass(&mut stages)?;
            if changes.is_empty() {
                break;
            }
            applied.extend(changes);
        }

        Ok(applied)
    }

    /// One pass over the stage set; mutates the local copy in step with
    /// the store so a follow-up pass sees the new state.
    fn converge_pass(&self, stages: &mut [Stage]) -> Result<Vec<Convergence>> {
        let pending: Vec<(usize, StageStatus)> = stages
            .iter()
            .enumerate()
            .filter_map(|(i, stage)| {
                if matches!(
                    stage.status,
                    StageStatus::InProgress | StageStatus::Completed
                ) {
                    return None;
                }
                let deps_met = stage.dependencies.iter().all(|dep| {
                    stages
                        .iter()
                        .find(|s| &s.id == dep)
                        .is_some_and(|d| d.status == StageStatus::Completed)
                });
                let expected = if deps_met {
                    StageStatus::NotStarted
                } else {
                    StageStatus::Blocked
                };
                (stage.status != expected).then_some((i, expected))
            })
            .collect();

        let mut changes = Vec::new();
        for (i, expected) in pending {
            let from = stages[i].status;
            let updated = self
                .stages
                .update(&stages[i].id, StagePatch::status(expected))?;

            self.sync_deliverable(&updated, from, expected);
            self.publish(match expected {
                StageStatus::Blocked => StageEvent::Blocked {
                    project_id: updated.project_id.clone(),
                    stage_id: updated.id.clone(),
                },
                _ => StageEvent::Unblocked {
                    project_id: updated.project_id.clone(),
                    stage_id: updated.id.clone(),
                },
            });

            changes.push(Convergence {
                stage_id: updated.id.clone(),
                from,
                to: expected,
            });
            stages[i].status = expected;
        }

        Ok(changes)
    }
}
