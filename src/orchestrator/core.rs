//! Core orchestrator service object and its shared helpers.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::warn;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::graph::{validate, DependencyIndex, GraphIssue};
use crate::models::audit::AuditEntry;
use crate::models::stage::{Stage, StageStatus};
use crate::schedule::Scheduler;
use crate::store::{AuditStore, DeliverableHook, ProjectStore, StageStore};

use super::events::{EventBus, StageEvent};

/// Orchestrates all stage mutations for a project.
///
/// Constructed with injected store dependencies; there is no
/// module-level instance, so tests and applications can run any number
/// of orchestrators side by side and tear them down cleanly.
pub struct StageOrchestrator {
    pub(super) stages: Arc<dyn StageStore>,
    pub(super) audit: Arc<dyn AuditStore>,
    pub(super) projects: Arc<dyn ProjectStore>,
    pub(super) deliverables: Arc<dyn DeliverableHook>,
    pub(super) config: EngineConfig,
    pub(super) events: EventBus,
}

impl StageOrchestrator {
    pub fn new(
        stages: Arc<dyn StageStore>,
        audit: Arc<dyn AuditStore>,
        projects: Arc<dyn ProjectStore>,
        deliverables: Arc<dyn DeliverableHook>,
        config: EngineConfig,
    ) -> Self {
        Self {
            stages,
            audit,
            projects,
            deliverables,
            config,
            events: EventBus::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribe to change events. See [`EventBus`] for the (lack of)
    /// delivery guarantees.
    pub fn subscribe(&self) -> Receiver<StageEvent> {
        self.events.subscribe()
    }

    /// All stages of a project, straight from the store.
    pub fn list_stages(&self, project_id: &str) -> Result<Vec<Stage>> {
        self.stages.list(project_id)
    }

    /// A single stage; missing ids are a hard failure.
    pub fn get_stage(&self, stage_id: &str) -> Result<Stage> {
        self.stages
            .get(stage_id)?
            .ok_or_else(|| EngineError::StageNotFound(stage_id.to_string()).into())
    }

    /// Report dependency-graph integrity issues for a project.
    pub fn validate_project(&self, project_id: &str) -> Result<Vec<GraphIssue>> {
        let stages = self.stages.list(project_id)?;
        let index = DependencyIndex::build(&stages);
        Ok(validate(&index))
    }

    /// Project-setup entry point: schedule the template stages from the
    /// project start date, bulk-create them, and announce deliverables
    /// to the automation hook.
    pub fn create_stages(
        &self,
        template: Vec<Stage>,
        project_start: NaiveDate,
    ) -> Result<Vec<Stage>> {
        let scheduler = Scheduler::new(self.config.schedule.clone());
        let scheduled = scheduler.schedule(template, project_start)?;

        self.stages.bulk_create(scheduled.clone())?;

        for stage in &scheduled {
            if stage.is_deliverable {
                self.deliverables.stage_created(stage);
            }
        }

        Ok(scheduled)
    }

    /// Append a change-history entry. Best-effort: a failed write is
    /// logged and never aborts the transition that produced it.
    pub(super) fn record_audit(&self, stage: &Stage, text: String, actor: &str) {
        let entry = AuditEntry::new(&stage.id, &stage.project_id, text, actor);
        if let Err(e) = self.audit.create(entry) {
            warn!(stage_id = %stage.id, error = %e, "failed to append audit entry");
        }
    }

    /// Notify the deliverable automation hook of a status change.
    pub(super) fn sync_deliverable(&self, stage: &Stage, old: StageStatus, new: StageStatus) {
        if stage.is_deliverable && old != new {
            self.deliverables.status_synced(stage, old, new);
        }
    }

    /// Publish an event to every subscriber. The watcher uses this for
    /// its reconciliation notifications so UI subscribers see one
    /// stream.
    pub fn publish(&self, event: StageEvent) {
        self.events.publish(event);
    }
}
