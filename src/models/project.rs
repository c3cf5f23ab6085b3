//! Aggregate rollup written to the project collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Partial project update carrying the recomputed aggregate progress.
///
/// Writes of this patch are best-effort: a failure is logged and never
/// aborts the stage transition that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectPatch {
    pub progress_percentage: u8,
    pub updated_at: DateTime<Utc>,
}

impl ProjectPatch {
    pub fn progress(progress_percentage: u8) -> Self {
        Self {
            progress_percentage,
            updated_at: Utc::now(),
        }
    }
}
