use anyhow::{bail, Result};

use super::types::StageStatus;

impl StageStatus {
    /// Check if transitioning from the current status to the new status
    /// is valid.
    ///
    /// Valid transitions:
    /// - `NotStarted` -> `InProgress` | `Blocked` | `Completed`
    /// - `InProgress` -> `Completed` | `NotStarted` | `Blocked` (cascade
    ///   force-block when an upstream stage is reset)
    /// - `Completed` -> `NotStarted` (reset)
    /// - `Blocked` -> `NotStarted` (unblock)
    ///
    /// # Arguments
    /// * `new_status` - The target status to transition to
    ///
    /// # Returns
    /// `true` if the transition is valid, `false` otherwise
    pub fn can_transition_to(&self, new_status: &StageStatus) -> bool {
        // Same status is always valid (no-op)
        if self == new_status {
            return true;
        }

        match self {
            StageStatus::NotStarted => matches!(
                new_status,
                StageStatus::InProgress | StageStatus::Blocked | StageStatus::Completed
            ),
            StageStatus::InProgress => matches!(
                new_status,
                StageStatus::Completed | StageStatus::NotStarted | StageStatus::Blocked
            ),
            StageStatus::Completed => matches!(new_status, StageStatus::NotStarted),
            StageStatus::Blocked => matches!(new_status, StageStatus::NotStarted),
        }
    }

    /// Attempt to transition to a new status, returning an error if
    /// invalid.
    pub fn try_transition(&self, new_status: StageStatus) -> Result<StageStatus> {
        if self.can_transition_to(&new_status) {
            Ok(new_status)
        } else {
            bail!("Invalid stage status transition: {self} -> {new_status}")
        }
    }

    /// Returns the list of valid statuses this status can transition to.
    pub fn valid_transitions(&self) -> Vec<StageStatus> {
        match self {
            StageStatus::NotStarted => vec![
                StageStatus::InProgress,
                StageStatus::Blocked,
                StageStatus::Completed,
            ],
            StageStatus::InProgress => vec![
                StageStatus::Completed,
                StageStatus::NotStarted,
                StageStatus::Blocked,
            ],
            StageStatus::Completed => vec![StageStatus::NotStarted],
            StageStatus::Blocked => vec![StageStatus::NotStarted],
        }
    }
}
