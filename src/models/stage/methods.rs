use anyhow::Result;
use chrono::Utc;

use crate::models::constants;

use super::types::{BlockingPriority, Stage, StageStatus};

impl Stage {
    pub fn new(project_id: String, name: String, category: String) -> Self {
        let now = Utc::now();
        let id = Self::generate_id(&name);

        Self {
            id,
            project_id,
            number_index: 0,
            name,
            category,
            blocking_priority: BlockingPriority::Medium,
            is_deliverable: false,
            status: StageStatus::NotStarted,
            dependencies: Vec::new(),
            parallel_tracks: Vec::new(),
            assigned_to: None,
            estimated_duration: None,
            start_date: None,
            end_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn generate_id(name: &str) -> String {
        let timestamp = Utc::now().timestamp();
        format!(
            "stage-{}-{}",
            name.to_lowercase().replace(' ', "-"),
            timestamp
        )
    }

    pub fn add_dependency(&mut self, stage_id: String) {
        if !self.dependencies.contains(&stage_id) {
            self.dependencies.push(stage_id);
            self.updated_at = Utc::now();
        }
    }

    /// Assign an owner. Allowed in any status: assigning while blocked is
    /// the "pre-assignment" planning pattern.
    pub fn assign_to(&mut self, owner: Option<String>) {
        self.assigned_to = owner;
        self.updated_at = Utc::now();
    }

    /// Attempt to transition the stage to a new status with validation.
    ///
    /// This is the primary method for changing stage status. It validates
    /// that the transition is allowed before applying it.
    pub fn try_transition(&mut self, new_status: StageStatus) -> Result<()> {
        let validated_status = self.status.try_transition(new_status)?;
        self.status = validated_status;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Start the stage with validation, recording today as the actual
    /// start date.
    pub fn try_start(&mut self) -> Result<()> {
        self.try_transition(StageStatus::InProgress)?;
        if self.start_date.is_none() {
            self.start_date = Some(Utc::now().date_naive());
        }
        Ok(())
    }

    /// Complete the stage with validation.
    pub fn try_complete(&mut self) -> Result<()> {
        self.try_transition(StageStatus::Completed)
    }

    /// Reset the stage back to `NotStarted`, clearing the recorded start
    /// date so a future start stamps a fresh one.
    pub fn try_reset(&mut self) -> Result<()> {
        self.try_transition(StageStatus::NotStarted)?;
        self.start_date = None;
        Ok(())
    }

    /// Mark the stage as blocked with validation.
    pub fn try_mark_blocked(&mut self) -> Result<()> {
        self.try_transition(StageStatus::Blocked)
    }

    /// Lift a block, returning the stage to `NotStarted`.
    pub fn try_unblock(&mut self) -> Result<()> {
        self.try_transition(StageStatus::NotStarted)
    }
}

impl BlockingPriority {
    /// Progress weight of this priority in the aggregate rollup.
    pub fn weight(&self) -> u32 {
        match self {
            BlockingPriority::Critical => constants::WEIGHT_CRITICAL,
            BlockingPriority::High => constants::WEIGHT_HIGH,
            BlockingPriority::Medium => constants::WEIGHT_MEDIUM,
            BlockingPriority::Low => constants::WEIGHT_LOW,
        }
    }
}
