//! Polling reconciliation loop that keeps dependent stages' stored
//! statuses consistent as the graph evolves, self-healing drift from
//! out-of-band edits.
//!
//! Every pass re-derives the expectation for idle stages and applies
//! corrections through the orchestrator's generic entry point, so
//! reconciliation shares the validation and audit path of user-driven
//! changes.

mod config;


pub use config::WatcherConfig;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use anyhow::Result;
use tracing::{debug, warn};

use crate::graph::{dependencies_met, DependencyIndex};
use crate::models::stage::StageStatus;
use crate::orchestrator::{ChangeOptions, StageEvent, StageOrchestrator};

/// A corrective transition applied by a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub stage_id: String,
    pub from: StageStatus,
    pub to: StageStatus,
}

/// State shared between the watcher handle and its timer thread.
struct WatcherState {
    orchestrator: Arc<StageOrchestrator>,
    /// Last known status per stage, updated after each pass so the next
    /// tick does not re-notify for states it already saw.
    snapshot: Mutex<HashMap<String, StageStatus>>,
    shutdown: AtomicBool,
}

/// Reconciliation loop for one project at a time.
pub struct DependencyWatcher {
    state: Arc<WatcherState>,
    config: WatcherConfig,
    handle: Option<JoinHandle<()>>,
}

impl DependencyWatcher {
    pub fn new(orchestrator: Arc<StageOrchestrator>, config: WatcherConfig) -> Self {
        Self {
            state: Arc::new(WatcherState {
                orchestrator,
                snapshot: Mutex::new(HashMap::new()),
                shutdown: AtomicBool::new(false),
            }),
            config,
            handle: None,
        }
    }

    /// Begin polling the project on the configured interval. A no-op if
    /// the watcher is already running.
    pub fn start_watching(&mut self, project_id: &str) {
        if self.handle.is_some() {
            return;
        }

        self.state.shutdown.store(false, Ordering::Relaxed);
        let state = Arc::clone(&self.state);
        let interval = self.config.poll_interval;
        let project_id = project_id.to_string();

        self.handle = Some(thread::spawn(move || {
            while !state.shutdown.load(Ordering::Relaxed) {
                match tick_state(&state, &project_id) {
                    Ok(corrections) if !corrections.is_empty() => {
                        debug!(
                            project_id = %project_id,
                            count = corrections.len(),
                            "applied reconciliation corrections"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(project_id = %project_id, error = %e, "reconciliation pass failed");
                    }
                }
                thread::sleep(interval);
            }
        }));
    }

    /// Cancel the interval thread and clear the snapshot so a future
    /// `start_watching` begins cold.
    pub fn stop_watching(&mut self) {
        self.state.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        if let Ok(mut snapshot) = self.state.snapshot.lock() {
            snapshot.clear();
        }
    }

    /// One synchronous reconciliation pass. The timer thread runs this
    /// on its interval; tests and callers can drive it directly.
    pub fn tick(&self, project_id: &str) -> Result<Vec<Correction>> {
        tick_state(&self.state, project_id)
    }
}

impl Drop for DependencyWatcher {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

fn tick_state(state: &WatcherState, project_id: &str) -> Result<Vec<Correction>> {
    let orchestrator = &state.orchestrator;
    let stages = orchestrator.list_stages(project_id)?;

    let previous: HashMap<String, StageStatus> = state
        .snapshot
        .lock()
        .map(|s| s.clone())
        .unwrap_or_default();

    // Queue corrections where an idle stage's stored status disagrees
    // with the derived expectation, then a separate scan of blocked
    // stages that are ready to be lifted.
    let mut drifted = Vec::new();
    let mut ready_blocked = Vec::new();
    {
        let index = DependencyIndex::build(&stages);
        for stage in &stages {
            match stage.status {
                StageStatus::NotStarted if !dependencies_met(stage, &index) => {
                    drifted.push(stage.clone());
                }
                StageStatus::Blocked if dependencies_met(stage, &index) => {
                    ready_blocked.push(stage.clone());
                }
                _ => {}
            }
        }
    }

    let opts = ChangeOptions {
        skip_validation: true,
        skip_cascade: true,
        force_change: true,
        reason: Some("dependency reconciliation".to_string()),
        actor: Some("watcher".to_string()),
    };

    let mut applied = Vec::new();

    for stage in drifted {
        orchestrator.change_status(&stage.id, StageStatus::Blocked, opts.clone())?;
        applied.push(Correction {
            stage_id: stage.id,
            from: StageStatus::NotStarted,
            to: StageStatus::Blocked,
        });
    }

    for stage in ready_blocked {
        orchestrator.change_status(&stage.id, StageStatus::NotStarted, opts.clone())?;

        // Pre-assigned owner: someone is waiting on this stage, notify
        // loudly - unless the last pass already saw it unblocked.
        if let Some(owner) = &stage.assigned_to {
            if previous.get(&stage.id) != Some(&StageStatus::NotStarted) {
                orchestrator.publish(StageEvent::ReadyForOwner {
                    project_id: stage.project_id.clone(),
                    stage_id: stage.id.clone(),
                    assigned_to: owner.clone(),
                });
            }
        }

        applied.push(Correction {
            stage_id: stage.id,
            from: StageStatus::Blocked,
            to: StageStatus::NotStarted,
        });
    }

    // Remember post-correction statuses so the next tick only reacts to
    // fresh drift.
    let refreshed = orchestrator.list_stages(project_id)?;
    if let Ok(mut snapshot) = state.snapshot.lock() {
        snapshot.clear();
        for stage in &refreshed {
            snapshot.insert(stage.id.clone(), stage.status);
        }
    }

    Ok(applied)
}
