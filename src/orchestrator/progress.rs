//! Aggregate project progress, weighted by blocking priority.

use std::collections::HashSet;

use anyhow::Result;
use tracing::warn;

use crate::models::constants::MASTER_UNLOCK_MULTIPLIER;
use crate::models::project::ProjectPatch;
use crate::models::stage::{Stage, StageStatus};

use super::core::StageOrchestrator;

/// Weighted completion percentage across a stage set.
///
/// Each stage weighs its blocking priority (critical=4 down to low=1),
/// doubled for configured master-unlock stages. Completed stages
/// contribute their full weight, in-progress stages half, everything
/// else nothing. Clamped to `[0, 100]`; an empty set is 0.
pub(super) fn weighted_progress(stages: &[Stage], master_unlocks: &HashSet<String>) -> u8 {
    if stages.is_empty() {
        return 0;
    }

    let mut total = 0.0_f64;
    let mut earned = 0.0_f64;

    for stage in stages {
        let mut weight = f64::from(stage.blocking_priority.weight());
        if master_unlocks.contains(&stage.id) {
            weight *= f64::from(MASTER_UNLOCK_MULTIPLIER);
        }

        total += weight;
        match stage.status {
            StageStatus::Completed => earned += weight,
            StageStatus::InProgress => earned += weight * 0.5,
            StageStatus::NotStarted | StageStatus::Blocked => {}
        }
    }

    if total <= 0.0 {
        return 0;
    }

    (100.0 * earned / total).round().clamp(0.0, 100.0) as u8
}

impl StageOrchestrator {
    /// Recompute a project's aggregate progress and push it to the
    /// project collaborator.
    ///
    /// The rollup write is best-effort: the stage statuses are the
    /// primary invariant, so a failed project write is logged and the
    /// computed value still returned.
    pub fn calculate_progress(&self, project_id: &str) -> Result<u8> {
        let stages = self.stages.list(project_id)?;
        let progress = weighted_progress(&stages, &self.config.master_unlock_stages);

        if let Err(e) = self
            .projects
            .update(project_id, ProjectPatch::progress(progress))
        {
            warn!(project_id, error = %e, "failed to write project progress rollup");
        }

        Ok(progress)
    }
}
