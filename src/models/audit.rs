//! Append-only audit entries forming the human-readable change history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One human-readable change-history record for a stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    pub id: String,
    pub stage_id: String,
    pub project_id: String,
    pub text: String,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(stage_id: &str, project_id: &str, text: String, actor: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            stage_id: stage_id.to_string(),
            project_id: project_id.to_string(),
            text,
            actor: actor.to_string(),
            created_at: Utc::now(),
        }
    }
}
