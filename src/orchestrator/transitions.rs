//! Transition operations: start, complete, reset, and the generic
//! confirmation-gated status change.

use anyhow::Result;
use chrono::Utc;

use crate::cascade::{can_transition, evaluate_impact, Impact, TransitionCheck};
use crate::error::EngineError;
use crate::graph::{
    dependencies_met, dependents, derived_status, DependencyIndex, DerivedStatus,
};
use crate::models::stage::{Stage, StageStatus};
use crate::store::StagePatch;

use super::events::StageEvent;
use super::StageOrchestrator;

/// Options for the generic [`StageOrchestrator::change_status`] entry
/// point.
#[derive(Debug, Clone, Default)]
pub struct ChangeOptions {
    /// Skip the `can_transition` validation.
    pub skip_validation: bool,
    /// Skip the cascade and convergence pass after the change.
    pub skip_cascade: bool,
    /// Commit even when the impact evaluation would ask for
    /// confirmation; also bypasses validation.
    pub force_change: bool,
    /// Human-readable reason recorded in the audit trail.
    pub reason: Option<String>,
    /// Recorded as the audit actor; defaults to "system".
    pub actor: Option<String>,
}

/// Outcome of a confirmation-gated change. Refusals and confirmation
/// round-trips are normal control flow here, not errors, so callers can
/// render them directly.
#[derive(Debug)]
pub enum ChangeOutcome {
    /// Refused by transition validation; the reason is renderable as-is.
    NotAllowed(TransitionCheck),
    /// Nothing was mutated; the caller must confirm the impact and
    /// re-invoke with `force_change`.
    ConfirmationRequired(Impact),
    Applied(AppliedChange),
}

/// A committed change and its cascade results.
#[derive(Debug)]
pub struct AppliedChange {
    pub stage: Stage,
    /// Dependents whose block was lifted by this change.
    pub unblocked: Vec<String>,
    /// Dependents force-blocked by this change.
    pub blocked: Vec<String>,
    /// Aggregate project progress after the change.
    pub progress: u8,
}

impl StageOrchestrator {
    /// Start a stage: requires a `not_started` stage whose dependencies
    /// are all completed. Records today as the actual start date.
    pub fn start_stage(&self, stage_id: &str, actor: &str) -> Result<Stage> {
        let stage = self.get_stage(stage_id)?;
        let all = self.stages.list(&stage.project_id)?;

        if stage.status != StageStatus::NotStarted {
            return Err(EngineError::PreconditionFailed {
                stage_id: stage_id.to_string(),
                reason: format!(
                    "stage is {}, only a not_started stage can be started",
                    stage.status
                ),
            }
            .into());
        }

        {
            let index = DependencyIndex::build(&all);
            if derived_status(&stage, &index) != DerivedStatus::Ready {
                return Err(EngineError::PreconditionFailed {
                    stage_id: stage_id.to_string(),
                    reason: unmet_reason(&stage, &index),
                }
                .into());
            }
        }

        self.apply_start(&stage, actor)
    }

    /// Complete a stage and lift the block on any direct dependent whose
    /// dependencies are now all met. The aggregate progress write is
    /// best-effort; the unblocks are not.
    pub fn complete_stage(&self, stage_id: &str, actor: &str) -> Result<AppliedChange> {
        let stage = self.get_stage(stage_id)?;
        let all = self.stages.list(&stage.project_id)?;

        if stage.status == StageStatus::Completed {
            return Err(EngineError::PreconditionFailed {
                stage_id: stage_id.to_string(),
                reason: "stage is already completed".to_string(),
            }
            .into());
        }
        if stage.status == StageStatus::Blocked {
            return Err(EngineError::PreconditionFailed {
                stage_id: stage_id.to_string(),
                reason: "a blocked stage cannot be completed".to_string(),
            }
            .into());
        }

        {
            let index = DependencyIndex::build(&all);
            if derived_status(&stage, &index) == DerivedStatus::Blocked {
                return Err(EngineError::PreconditionFailed {
                    stage_id: stage_id.to_string(),
                    reason: unmet_reason(&stage, &index),
                }
                .into());
            }
        }

        self.apply_complete(stage, all, actor)
    }

    /// Reset a stage back to `not_started`.
    ///
    /// Two-phase: when the impact evaluation finds completed or
    /// in-progress dependents, the impact is returned instead of
    /// committing and the caller re-invokes after confirmation. Passing
    /// `skip_cascade` commits without the gate and without blocking
    /// dependents.
    pub fn reset_stage(
        &self,
        stage_id: &str,
        reason: Option<String>,
        actor: &str,
        skip_cascade: bool,
    ) -> Result<ChangeOutcome> {
        let stage = self.get_stage(stage_id)?;
        let all = self.stages.list(&stage.project_id)?;

        let impact = {
            let index = DependencyIndex::build(&all);
            evaluate_impact(&stage, StageStatus::NotStarted, &index)
        };
        if impact.requires_confirmation && !skip_cascade {
            return Ok(ChangeOutcome::ConfirmationRequired(impact));
        }

        let applied = self.apply_reset(stage, all, reason, actor, skip_cascade)?;
        Ok(ChangeOutcome::Applied(applied))
    }

    /// Generic confirmation-gated entry point dispatching to the
    /// specific handlers.
    ///
    /// Validates via `can_transition` unless forced, previews the
    /// cascade impact, and finishes with a convergence pass (unless
    /// `skip_cascade`) plus a progress recompute.
    pub fn change_status(
        &self,
        stage_id: &str,
        new_status: StageStatus,
        opts: ChangeOptions,
    ) -> Result<ChangeOutcome> {
        let stage = self.get_stage(stage_id)?;
        let all = self.stages.list(&stage.project_id)?;
        let actor = opts.actor.clone().unwrap_or_else(|| "system".to_string());

        if !opts.skip_validation && !opts.force_change {
            let check = {
                let index = DependencyIndex::build(&all);
                can_transition(&stage, new_status, &index)
            };
            if !check.allowed {
                return Ok(ChangeOutcome::NotAllowed(check));
            }
        }

        let impact = {
            let index = DependencyIndex::build(&all);
            evaluate_impact(&stage, new_status, &index)
        };
        if impact.requires_confirmation && !opts.force_change {
            return Ok(ChangeOutcome::ConfirmationRequired(impact));
        }

        let project_id = stage.project_id.clone();
        let mut applied = match new_status {
            StageStatus::Completed => self.apply_complete(stage, all, &actor)?,
            StageStatus::InProgress => {
                let stored = self.apply_start(&stage, &actor)?;
                AppliedChange {
                    stage: stored,
                    unblocked: Vec::new(),
                    blocked: Vec::new(),
                    progress: 0,
                }
            }
            // Lifting a block is not a reset: no dependents to cascade,
            // no dates to clear.
            StageStatus::NotStarted if stage.status == StageStatus::Blocked => {
                self.apply_unblock(&stage, opts.reason.clone(), &actor)?
            }
            StageStatus::NotStarted => {
                self.apply_reset(stage, all, opts.reason.clone(), &actor, opts.skip_cascade)?
            }
            StageStatus::Blocked => self.apply_block(&stage, opts.reason.clone(), &actor)?,
        };

        if !opts.skip_cascade {
            self.auto_converge(&project_id)?;
        }
        applied.progress = self.calculate_progress(&project_id)?;

        Ok(ChangeOutcome::Applied(applied))
    }

    fn apply_start(&self, stage: &Stage, actor: &str) -> Result<Stage> {
        let old = stage.status;
        let stored = self.stages.update(
            &stage.id,
            StagePatch::status(StageStatus::InProgress)
                .with_start_date(Some(Utc::now().date_naive())),
        )?;

        self.record_audit(&stored, format!("Started stage '{}'", stored.name), actor);
        self.sync_deliverable(&stored, old, StageStatus::InProgress);
        self.publish(StageEvent::Started {
            project_id: stored.project_id.clone(),
            stage_id: stored.id.clone(),
        });

        Ok(stored)
    }

    fn apply_complete(
        &self,
        stage: Stage,
        mut all: Vec<Stage>,
        actor: &str,
    ) -> Result<AppliedChange> {
        let old = stage.status;
        let stored = self
            .stages
            .update(&stage.id, StagePatch::status(StageStatus::Completed))?;

        self.record_audit(&stored, format!("Completed stage '{}'", stored.name), actor);
        self.sync_deliverable(&stored, old, StageStatus::Completed);

        // Re-derive direct dependents against the updated stage set.
        if let Some(s) = all.iter_mut().find(|s| s.id == stage.id) {
            s.status = StageStatus::Completed;
        }

        let mut unblocked = Vec::new();
        {
            let index = DependencyIndex::build(&all);
            for dependent in dependents(&stage.id, &index, false) {
                if dependent.status == StageStatus::Blocked && dependencies_met(dependent, &index)
                {
                    let lifted = self
                        .stages
                        .update(&dependent.id, StagePatch::status(StageStatus::NotStarted))?;
                    self.record_audit(
                        &lifted,
                        format!("Unblocked by completion of '{}'", stored.name),
                        actor,
                    );
                    self.sync_deliverable(&lifted, StageStatus::Blocked, StageStatus::NotStarted);
                    self.publish(StageEvent::Unblocked {
                        project_id: lifted.project_id.clone(),
                        stage_id: lifted.id.clone(),
                    });
                    unblocked.push(lifted.id);
                }
            }
        }

        let progress = self.calculate_progress(&stored.project_id)?;
        self.publish(StageEvent::Completed {
            project_id: stored.project_id.clone(),
            stage_id: stored.id.clone(),
            unblocked: unblocked.clone(),
            progress,
        });

        Ok(AppliedChange {
            stage: stored,
            unblocked,
            blocked: Vec::new(),
            progress,
        })
    }

    fn apply_reset(
        &self,
        stage: Stage,
        mut all: Vec<Stage>,
        reason: Option<String>,
        actor: &str,
        skip_cascade: bool,
    ) -> Result<AppliedChange> {
        let old = stage.status;
        let stored = self.stages.update(
            &stage.id,
            StagePatch::status(StageStatus::NotStarted).with_start_date(None),
        )?;

        let text = match &reason {
            Some(r) => format!("Reset stage '{}': {r}", stored.name),
            None => format!("Reset stage '{}'", stored.name),
        };
        self.record_audit(&stored, text, actor);
        self.sync_deliverable(&stored, old, StageStatus::NotStarted);

        let mut blocked = Vec::new();
        if !skip_cascade {
            if let Some(s) = all.iter_mut().find(|s| s.id == stage.id) {
                s.status = StageStatus::NotStarted;
                s.start_date = None;
            }

            let index = DependencyIndex::build(&all);
            for dependent in dependents(&stage.id, &index, true) {
                if matches!(
                    dependent.status,
                    StageStatus::NotStarted | StageStatus::InProgress
                ) {
                    let from = dependent.status;
                    let b = self
                        .stages
                        .update(&dependent.id, StagePatch::status(StageStatus::Blocked))?;
                    self.record_audit(
                        &b,
                        format!("Blocked by reset of '{}'", stored.name),
                        actor,
                    );
                    self.sync_deliverable(&b, from, StageStatus::Blocked);
                    self.publish(StageEvent::Blocked {
                        project_id: b.project_id.clone(),
                        stage_id: b.id.clone(),
                    });
                    blocked.push(b.id);
                }
            }
        }

        let progress = self.calculate_progress(&stored.project_id)?;
        self.publish(StageEvent::Reset {
            project_id: stored.project_id.clone(),
            stage_id: stored.id.clone(),
            reason,
        });

        Ok(AppliedChange {
            stage: stored,
            unblocked: Vec::new(),
            blocked,
            progress,
        })
    }

    fn apply_unblock(
        &self,
        stage: &Stage,
        reason: Option<String>,
        actor: &str,
    ) -> Result<AppliedChange> {
        let stored = self
            .stages
            .update(&stage.id, StagePatch::status(StageStatus::NotStarted))?;

        let text = match &reason {
            Some(r) => format!("Unblocked stage '{}': {r}", stored.name),
            None => format!("Unblocked stage '{}'", stored.name),
        };
        self.record_audit(&stored, text, actor);
        self.sync_deliverable(&stored, StageStatus::Blocked, StageStatus::NotStarted);
        self.publish(StageEvent::Unblocked {
            project_id: stored.project_id.clone(),
            stage_id: stored.id.clone(),
        });

        Ok(AppliedChange {
            stage: stored,
            unblocked: Vec::new(),
            blocked: Vec::new(),
            progress: 0,
        })
    }

    /// Direct field write for the `blocked` overlay, used by the generic
    /// entry point; dependents are handled by the convergence pass.
    fn apply_block(
        &self,
        stage: &Stage,
        reason: Option<String>,
        actor: &str,
    ) -> Result<AppliedChange> {
        let old = stage.status;
        let stored = self
            .stages
            .update(&stage.id, StagePatch::status(StageStatus::Blocked))?;

        let text = match &reason {
            Some(r) => format!("Blocked stage '{}': {r}", stored.name),
            None => format!("Blocked stage '{}'", stored.name),
        };
        self.record_audit(&stored, text, actor);
        self.sync_deliverable(&stored, old, StageStatus::Blocked);
        self.publish(StageEvent::StatusChanged {
            project_id: stored.project_id.clone(),
            stage_id: stored.id.clone(),
            from: old,
            to: StageStatus::Blocked,
        });

        Ok(AppliedChange {
            stage: stored,
            unblocked: Vec::new(),
            blocked: Vec::new(),
            progress: 0,
        })
    }
}

fn unmet_reason(stage: &Stage, index: &DependencyIndex<'_>) -> String {
    let unmet = stage
        .dependencies
        .iter()
        .filter(|dep| {
            !index
                .get(dep)
                .is_some_and(|d| d.status == StageStatus::Completed)
        })
        .count();
    format!(
        "{unmet} unmet {} must be completed first",
        if unmet == 1 {
            "dependency"
        } else {
            "dependencies"
        }
    )
}
