//! Topological-sort based date scheduler: computes start/end dates from
//! durations and dependency edges, with incremental re-scheduling for
//! downstream stages when one stage's dates move.

mod recalc;


pub use recalc::{recalculate_downstream, DateShift};

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate, Utc};

use crate::error::CycleError;
use crate::graph::{topological_sort, DependencyIndex};
use crate::models::constants::schedule as defaults;
use crate::models::stage::{BlockingPriority, Stage};

/// Heuristics the scheduler applies where the template does not say.
///
/// Offsets and category sets mirror the standard workflow template;
/// applications supply their own when the template differs.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Offset in days from project start for dependency-free stages,
    /// keyed by phase category. Unlisted categories start at the
    /// project start.
    pub phase_offsets: HashMap<String, u32>,
    /// Category whose earliest stages are staggered per `number_index`
    /// so they do not all land on the same day.
    pub onboarding_category: String,
    /// Phase categories involving external parties; their stages get
    /// extra buffer.
    pub external_categories: HashSet<String>,
    /// Categories whose deliverables default to the longest duration.
    pub strategy_categories: HashSet<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        let phase_offsets = [
            ("onboarding".to_string(), 0),
            ("strategy".to_string(), 5),
            ("design".to_string(), 12),
            ("production".to_string(), 20),
            ("delivery".to_string(), 30),
        ]
        .into_iter()
        .collect();

        Self {
            phase_offsets,
            onboarding_category: "onboarding".to_string(),
            external_categories: ["delivery".to_string(), "client_review".to_string()]
                .into_iter()
                .collect(),
            strategy_categories: ["strategy".to_string(), "brand".to_string()]
                .into_iter()
                .collect(),
        }
    }
}

/// Date calculator over a project's dependency graph.
pub struct Scheduler {
    config: ScheduleConfig,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(ScheduleConfig::default())
    }
}

impl Scheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    /// Compute start/end dates for every stage from durations and
    /// dependency edges. Used once at initial project setup.
    ///
    /// Stages are processed in topological order, so every dependency
    /// has its dates before any dependent needs them. Dependents start
    /// after the latest dependency end with buffer days in between:
    /// `start = max(dep.end) + 1 + buffer`. A cyclic graph is a hard
    /// failure.
    pub fn schedule(
        &self,
        mut stages: Vec<Stage>,
        project_start: NaiveDate,
    ) -> Result<Vec<Stage>, CycleError> {
        let order = {
            let index = DependencyIndex::build(&stages);
            topological_sort(&index)?
        };

        let idx_by_id: HashMap<String, usize> = stages
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        let mut prev_category: Option<String> = None;

        for id in &order {
            let Some(&i) = idx_by_id.get(id) else {
                continue;
            };

            let (start, end) = {
                let stage = &stages[i];
                let duration = i64::from(self.duration_days(stage)).max(1);

                let start = if stage.dependencies.is_empty() {
                    project_start + Duration::days(i64::from(self.start_offset(stage)))
                } else {
                    let latest_dep_end = stage
                        .dependencies
                        .iter()
                        .filter_map(|dep| idx_by_id.get(dep))
                        .filter_map(|&j| stages[j].end_date)
                        .max();

                    match latest_dep_end {
                        Some(dep_end) => {
                            let buffer = self.buffer_days(stage, prev_category.as_deref());
                            dep_end + Duration::days(1 + i64::from(buffer))
                        }
                        // Dangling dependencies; graph validation reports
                        // them, here the stage anchors to project start.
                        None => project_start,
                    }
                };

                (start, start + Duration::days(duration - 1))
            };

            prev_category = Some(stages[i].category.clone());
            stages[i].start_date = Some(start);
            stages[i].end_date = Some(end);
            stages[i].updated_at = Utc::now();
        }

        Ok(stages)
    }

    /// Estimated duration, or the default-duration heuristic when the
    /// template leaves it unset: deliverables run longer than internal
    /// tasks, strategy/brand deliverables longest.
    fn duration_days(&self, stage: &Stage) -> u32 {
        if let Some(duration) = stage.estimated_duration.filter(|d| *d > 0) {
            return duration;
        }
        if stage.is_deliverable {
            if self.config.strategy_categories.contains(&stage.category) {
                defaults::DEFAULT_STRATEGY_DURATION
            } else {
                defaults::DEFAULT_DELIVERABLE_DURATION
            }
        } else {
            defaults::DEFAULT_INTERNAL_DURATION
        }
    }

    /// Phase offset for a dependency-free stage, plus the per-index
    /// stagger for very early onboarding stages.
    fn start_offset(&self, stage: &Stage) -> u32 {
        let mut offset = self
            .config
            .phase_offsets
            .get(&stage.category)
            .copied()
            .unwrap_or(0);

        if stage.category == self.config.onboarding_category
            && stage.number_index < defaults::ONBOARDING_STAGGER_CUTOFF
        {
            offset += stage.number_index * defaults::ONBOARDING_STAGGER;
        }

        offset
    }

    /// Buffer days between the latest dependency end and this stage's
    /// start.
    fn buffer_days(&self, stage: &Stage, prev_category: Option<&str>) -> u32 {
        if stage.is_deliverable {
            // Approval time
            defaults::BUFFER_DELIVERABLE
        } else if prev_category.is_some_and(|c| c != stage.category) {
            defaults::BUFFER_CATEGORY_CHANGE
        } else if self.config.external_categories.contains(&stage.category) {
            defaults::BUFFER_EXTERNAL
        } else if stage.blocking_priority == BlockingPriority::Critical {
            defaults::BUFFER_CRITICAL
        } else {
            defaults::BUFFER_DEFAULT
        }
    }
}
