//! Collaborator contracts the engine is constructed with: stage records,
//! append-only audit history, project rollups, and the deliverable
//! automation hook.
//!
//! The engine assumes the backing store provides per-record atomic
//! read-modify-write; multi-stage cascades are not transactional and the
//! watcher converges any partial cascade on its next pass.

pub mod fs;
pub mod memory;

use anyhow::Result;
use chrono::{NaiveDate, Utc};

use crate::models::audit::AuditEntry;
use crate::models::project::ProjectPatch;
use crate::models::stage::{Stage, StageStatus};

/// Partial update applied to a single stage record.
///
/// Outer `Option` = "change this field"; the inner `Option` on nullable
/// fields distinguishes clearing from leaving untouched.
#[derive(Debug, Clone, Default)]
pub struct StagePatch {
    pub status: Option<StageStatus>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub assigned_to: Option<Option<String>>,
    pub dependencies: Option<Vec<String>>,
}

impl StagePatch {
    pub fn status(status: StageStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_start_date(mut self, start_date: Option<NaiveDate>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Apply the patch to a stage, stamping `updated_at`.
    pub fn apply(&self, stage: &mut Stage) {
        if let Some(status) = self.status {
            stage.status = status;
        }
        if let Some(start_date) = self.start_date {
            stage.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            stage.end_date = end_date;
        }
        if let Some(assigned_to) = &self.assigned_to {
            stage.assigned_to = assigned_to.clone();
        }
        if let Some(dependencies) = &self.dependencies {
            stage.dependencies = dependencies.clone();
        }
        stage.updated_at = Utc::now();
    }
}

/// Stage record store.
pub trait StageStore: Send + Sync {
    /// All stages belonging to a project.
    fn list(&self, project_id: &str) -> Result<Vec<Stage>>;

    /// A single stage by id, `None` when absent.
    fn get(&self, stage_id: &str) -> Result<Option<Stage>>;

    /// Apply a partial update, returning the updated record.
    fn update(&self, stage_id: &str, patch: StagePatch) -> Result<Stage>;

    /// Insert a batch of stages during project setup.
    fn bulk_create(&self, stages: Vec<Stage>) -> Result<()>;
}

/// Append-only change-history store.
pub trait AuditStore: Send + Sync {
    fn create(&self, entry: AuditEntry) -> Result<()>;
}

/// Aggregate rollup target. Engine-side failures writing here are
/// logged and swallowed.
pub trait ProjectStore: Send + Sync {
    fn update(&self, project_id: &str, patch: ProjectPatch) -> Result<()>;
}

/// Hook into the deliverable-document lifecycle, invoked for stages
/// flagged `is_deliverable` at creation and on status changes.
/// Implementations must be best-effort; the engine ignores their
/// outcome.
pub trait DeliverableHook: Send + Sync {
    fn stage_created(&self, stage: &Stage);
    fn status_synced(&self, stage: &Stage, old: StageStatus, new: StageStatus);
}
