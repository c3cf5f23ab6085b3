//! Mutex-guarded in-memory collaborator implementations for tests and
//! embedding applications.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use crate::error::EngineError;
use crate::models::audit::AuditEntry;
use crate::models::project::ProjectPatch;
use crate::models::stage::{Stage, StageStatus};

use super::{AuditStore, DeliverableHook, ProjectStore, StagePatch, StageStore};

/// In-memory stage store preserving creation order.
#[derive(Default)]
pub struct InMemoryStageStore {
    stages: Mutex<Vec<Stage>>,
}

impl InMemoryStageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stages(stages: Vec<Stage>) -> Self {
        Self {
            stages: Mutex::new(stages),
        }
    }
}

impl StageStore for InMemoryStageStore {
    fn list(&self, project_id: &str) -> Result<Vec<Stage>> {
        let stages = self
            .stages
            .lock()
            .map_err(|_| anyhow!("stage store lock poisoned"))?;
        Ok(stages
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect())
    }

    fn get(&self, stage_id: &str) -> Result<Option<Stage>> {
        let stages = self
            .stages
            .lock()
            .map_err(|_| anyhow!("stage store lock poisoned"))?;
        Ok(stages.iter().find(|s| s.id == stage_id).cloned())
    }

    fn update(&self, stage_id: &str, patch: StagePatch) -> Result<Stage> {
        let mut stages = self
            .stages
            .lock()
            .map_err(|_| anyhow!("stage store lock poisoned"))?;
        let stage = stages
            .iter_mut()
            .find(|s| s.id == stage_id)
            .ok_or_else(|| EngineError::StageNotFound(stage_id.to_string()))?;
        patch.apply(stage);
        Ok(stage.clone())
    }

    fn bulk_create(&self, new_stages: Vec<Stage>) -> Result<()> {
        let mut stages = self
            .stages
            .lock()
            .map_err(|_| anyhow!("stage store lock poisoned"))?;
        stages.extend(new_stages);
        Ok(())
    }
}

/// In-memory append-only audit store.
#[derive(Default)]
pub struct InMemoryAuditStore {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn create(&self, entry: AuditEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("audit store lock poisoned"))?
            .push(entry);
        Ok(())
    }
}

/// In-memory project rollup store keeping the latest patch per project.
#[derive(Default)]
pub struct InMemoryProjectStore {
    updates: Mutex<HashMap<String, ProjectPatch>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self, project_id: &str) -> Option<u8> {
        self.updates
            .lock()
            .ok()
            .and_then(|u| u.get(project_id).map(|p| p.progress_percentage))
    }
}

impl ProjectStore for InMemoryProjectStore {
    fn update(&self, project_id: &str, patch: ProjectPatch) -> Result<()> {
        self.updates
            .lock()
            .map_err(|_| anyhow!("project store lock poisoned"))?
            .insert(project_id.to_string(), patch);
        Ok(())
    }
}

/// Deliverable hook that ignores every notification.
#[derive(Default)]
pub struct NullDeliverableHook;

impl DeliverableHook for NullDeliverableHook {
    fn stage_created(&self, _stage: &Stage) {}
    fn status_synced(&self, _stage: &Stage, _old: StageStatus, _new: StageStatus) {}
}

/// Deliverable hook that records every notification, for assertions.
#[derive(Default)]
pub struct RecordingDeliverableHook {
    created: Mutex<Vec<String>>,
    synced: Mutex<Vec<(String, StageStatus, StageStatus)>>,
}

impl RecordingDeliverableHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn synced(&self) -> Vec<(String, StageStatus, StageStatus)> {
        self.synced.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl DeliverableHook for RecordingDeliverableHook {
    fn stage_created(&self, stage: &Stage) {
        if let Ok(mut created) = self.created.lock() {
            created.push(stage.id.clone());
        }
    }

    fn status_synced(&self, stage: &Stage, old: StageStatus, new: StageStatus) {
        if let Ok(mut synced) = self.synced.lock() {
            synced.push((stage.id.clone(), old, new));
        }
    }
}
