use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A node in the workflow graph representing one unit of work.
///
/// Stages are bulk-created at project setup with dependencies resolved
/// from the workflow template, and from then on are mutated only through
/// the orchestrator's transition operations. Direct field writes to
/// `status`, `dependencies`, or the dates bypass the engine's invariants
/// and are considered unsafe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub project_id: String,
    /// Sequence position within the workflow template. Used for ordering
    /// heuristics only, never for correctness.
    pub number_index: u32,
    pub name: String,
    /// Phase tag, e.g. "onboarding", "strategy", "production".
    pub category: String,
    pub blocking_priority: BlockingPriority,
    #[serde(default)]
    pub is_deliverable: bool,
    /// Source of truth for the stage's state. Readiness of a
    /// `not_started` stage is always derived, never stored here.
    pub status: StageStatus,
    /// Ids of stages this stage depends on, within the same project.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Stages that may run concurrently with this one. Informational;
    /// the resolver does not enforce it.
    #[serde(default)]
    pub parallel_tracks: Vec<String>,
    /// Owner reference. May be set while the stage is still blocked
    /// ("pre-assignment") for planning purposes.
    pub assigned_to: Option<String>,
    /// Estimated working duration in days.
    pub estimated_duration: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status of a stage in the workflow lifecycle.
///
/// State machine transitions:
/// - `NotStarted` -> `InProgress` (start, requires dependencies met)
/// - `InProgress` -> `Completed`
/// - `NotStarted` <-> `Blocked` (overlay state, applied and lifted by
///   cascades and the watcher)
/// - `Completed` -> `NotStarted` (reset, confirmation-gated when
///   dependents would be stranded)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StageStatus {
    /// Stage has not been started. Whether it is ready or blocked is
    /// derived from its dependency set.
    #[serde(rename = "not_started", alias = "not_ready")]
    NotStarted,

    /// Stage is actively being worked on.
    #[serde(rename = "in_progress")]
    InProgress,

    /// Stage work is done. Satisfies dependents' dependency checks.
    #[serde(rename = "completed")]
    Completed,

    /// Stage cannot proceed because a dependency is unmet. Returns to
    /// `NotStarted` once dependencies complete.
    #[serde(rename = "blocked")]
    Blocked,
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::NotStarted => write!(f, "not_started"),
            StageStatus::InProgress => write!(f, "in_progress"),
            StageStatus::Completed => write!(f, "completed"),
            StageStatus::Blocked => write!(f, "blocked"),
        }
    }
}

/// How heavily a stage gates the rest of the workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BlockingPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for BlockingPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockingPriority::Critical => write!(f, "critical"),
            BlockingPriority::High => write!(f, "high"),
            BlockingPriority::Medium => write!(f, "medium"),
            BlockingPriority::Low => write!(f, "low"),
        }
    }
}
