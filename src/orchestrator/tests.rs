use std::sync::Arc;

use super::*;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::stage::{Stage, StageStatus};
use crate::store::memory::{
    InMemoryAuditStore, InMemoryProjectStore, InMemoryStageStore, RecordingDeliverableHook,
};
use crate::store::StageStore;

fn stage(id: &str, deps: &[&str], status: StageStatus) -> Stage {
    let mut s = Stage::new(
        "project-1".to_string(),
        id.to_string(),
        "production".to_string(),
    );
    s.id = id.to_string();
    s.status = status;
    for dep in deps {
        s.add_dependency(dep.to_string());
    }
    s
}

struct Harness {
    orchestrator: StageOrchestrator,
    stages: Arc<InMemoryStageStore>,
    audit: Arc<InMemoryAuditStore>,
    projects: Arc<InMemoryProjectStore>,
    hook: Arc<RecordingDeliverableHook>,
}

fn harness(stages: Vec<Stage>) -> Harness {
    harness_with_config(stages, EngineConfig::default())
}

fn harness_with_config(stages: Vec<Stage>, config: EngineConfig) -> Harness {
    let stage_store = Arc::new(InMemoryStageStore::with_stages(stages));
    let audit = Arc::new(InMemoryAuditStore::new());
    let projects = Arc::new(InMemoryProjectStore::new());
    let hook = Arc::new(RecordingDeliverableHook::new());
    let orchestrator = StageOrchestrator::new(
        stage_store.clone(),
        audit.clone(),
        projects.clone(),
        hook.clone(),
        config,
    );
    Harness {
        orchestrator,
        stages: stage_store,
        audit,
        projects,
        hook,
    }
}

fn status_of(h: &Harness, id: &str) -> StageStatus {
    h.orchestrator.get_stage(id).unwrap().status
}

#[test]
fn test_start_stage_marks_in_progress_with_start_date() {
    let h = harness(vec![stage("a", &[], StageStatus::NotStarted)]);
    let rx = h.orchestrator.subscribe();

    let started = h.orchestrator.start_stage("a", "ana").expect("Should start");
    assert_eq!(started.status, StageStatus::InProgress);
    assert!(started.start_date.is_some());

    assert!(h
        .audit
        .entries()
        .iter()
        .any(|e| e.stage_id == "a" && e.actor == "ana" && e.text.contains("Started")));
    assert!(matches!(
        rx.try_recv().expect("Should emit event"),
        StageEvent::Started { ref stage_id, .. } if stage_id == "a"
    ));
}

#[test]
fn test_start_stage_with_unmet_deps_fails_without_mutation() {
    let h = harness(vec![
        stage("a", &[], StageStatus::NotStarted),
        stage("b", &["a"], StageStatus::NotStarted),
    ]);

    let err = h
        .orchestrator
        .start_stage("b", "ana")
        .expect_err("Should refuse blocked stage");
    let engine_err = err
        .downcast_ref::<EngineError>()
        .expect("Should carry a typed error");
    assert!(matches!(
        engine_err,
        EngineError::PreconditionFailed { reason, .. } if reason.contains("1 unmet dependency")
    ));

    assert_eq!(status_of(&h, "b"), StageStatus::NotStarted);
    assert!(h.audit.entries().is_empty());
}

#[test]
fn test_start_stage_missing_id_is_not_found() {
    let h = harness(vec![]);

    let err = h.orchestrator.start_stage("ghost", "ana").expect_err("Should fail");
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::StageNotFound(id)) if id == "ghost"
    ));
}

#[test]
fn test_start_stage_twice_is_precondition_failure() {
    let h = harness(vec![stage("a", &[], StageStatus::NotStarted)]);

    h.orchestrator.start_stage("a", "ana").expect("Should start");
    let err = h
        .orchestrator
        .start_stage("a", "ana")
        .expect_err("Should refuse restart");
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::PreconditionFailed { .. })
    ));
}

#[test]
fn test_complete_stage_unblocks_ready_dependent() {
    let h = harness(vec![
        stage("a", &[], StageStatus::InProgress),
        stage("b", &["a"], StageStatus::Blocked),
    ]);
    let rx = h.orchestrator.subscribe();

    let applied = h
        .orchestrator
        .complete_stage("a", "ana")
        .expect("Should complete");

    assert_eq!(applied.stage.status, StageStatus::Completed);
    assert_eq!(applied.unblocked, vec!["b".to_string()]);
    assert_eq!(status_of(&h, "b"), StageStatus::NotStarted);

    assert!(h
        .audit
        .entries()
        .iter()
        .any(|e| e.stage_id == "b" && e.text.contains("Unblocked by completion")));

    let events: Vec<StageEvent> = rx.try_iter().collect();
    assert!(events.iter().any(|e| matches!(
        e,
        StageEvent::Completed { unblocked, .. } if unblocked == &vec!["b".to_string()]
    )));
}

#[test]
fn test_complete_stage_writes_progress_rollup() {
    let h = harness(vec![stage("a", &[], StageStatus::InProgress)]);

    let applied = h
        .orchestrator
        .complete_stage("a", "ana")
        .expect("Should complete");
    assert_eq!(applied.progress, 100);
    assert_eq!(h.projects.progress("project-1"), Some(100));
}

#[test]
fn test_complete_stage_leaves_dependent_with_other_unmet_deps() {
    let h = harness(vec![
        stage("a", &[], StageStatus::InProgress),
        stage("b", &[], StageStatus::NotStarted),
        stage("c", &["a", "b"], StageStatus::Blocked),
    ]);

    let applied = h
        .orchestrator
        .complete_stage("a", "ana")
        .expect("Should complete");
    assert!(applied.unblocked.is_empty());
    assert_eq!(status_of(&h, "c"), StageStatus::Blocked);
}

#[test]
fn test_complete_blocked_stage_is_refused() {
    let h = harness(vec![stage("a", &[], StageStatus::Blocked)]);

    let err = h
        .orchestrator
        .complete_stage("a", "ana")
        .expect_err("Should refuse");
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::PreconditionFailed { .. })
    ));
    assert_eq!(status_of(&h, "a"), StageStatus::Blocked);
}

#[test]
fn test_reset_stage_requires_confirmation_for_completed_dependent() {
    let h = harness(vec![
        stage("a", &[], StageStatus::Completed),
        stage("b", &["a"], StageStatus::Completed),
    ]);

    let outcome = h
        .orchestrator
        .reset_stage("a", None, "ana", false)
        .expect("Should evaluate");

    let ChangeOutcome::ConfirmationRequired(impact) = outcome else {
        panic!("expected confirmation requirement");
    };
    assert_eq!(impact.conflicts.len(), 1);

    // Nothing committed until the caller confirms.
    assert_eq!(status_of(&h, "a"), StageStatus::Completed);

    // Forced re-invocation through the generic entry point commits.
    let outcome = h
        .orchestrator
        .change_status(
            "a",
            StageStatus::NotStarted,
            ChangeOptions {
                force_change: true,
                ..ChangeOptions::default()
            },
        )
        .expect("Should force reset");
    assert!(matches!(outcome, ChangeOutcome::Applied(_)));
    assert_eq!(status_of(&h, "a"), StageStatus::NotStarted);
}

#[test]
fn test_reset_stage_blocks_idle_dependents() {
    let h = harness(vec![
        stage("a", &[], StageStatus::Completed),
        stage("b", &["a"], StageStatus::NotStarted),
        stage("c", &["b"], StageStatus::NotStarted),
    ]);

    let outcome = h
        .orchestrator
        .reset_stage("a", Some("client pivot".to_string()), "ana", false)
        .expect("Should reset");

    let ChangeOutcome::Applied(applied) = outcome else {
        panic!("expected applied reset");
    };
    assert_eq!(applied.stage.status, StageStatus::NotStarted);
    assert!(applied.stage.start_date.is_none());
    assert_eq!(applied.blocked.len(), 2);
    assert_eq!(status_of(&h, "b"), StageStatus::Blocked);
    assert_eq!(status_of(&h, "c"), StageStatus::Blocked);

    let entries = h.audit.entries();
    assert!(entries
        .iter()
        .any(|e| e.stage_id == "a" && e.text.contains("client pivot")));
    assert_eq!(
        entries
            .iter()
            .filter(|e| e.text.contains("Blocked by reset"))
            .count(),
        2
    );
}

#[test]
fn test_reset_stage_skip_cascade_leaves_dependents() {
    let h = harness(vec![
        stage("a", &[], StageStatus::Completed),
        stage("b", &["a"], StageStatus::Completed),
    ]);

    let outcome = h
        .orchestrator
        .reset_stage("a", None, "ana", true)
        .expect("Should reset");
    assert!(matches!(outcome, ChangeOutcome::Applied(_)));
    assert_eq!(status_of(&h, "a"), StageStatus::NotStarted);
    assert_eq!(status_of(&h, "b"), StageStatus::Completed);
}

#[test]
fn test_change_status_refuses_invalid_transition() {
    let h = harness(vec![
        stage("a", &[], StageStatus::NotStarted),
        stage("b", &["a"], StageStatus::NotStarted),
    ]);

    let outcome = h
        .orchestrator
        .change_status("b", StageStatus::InProgress, ChangeOptions::default())
        .expect("Should check");

    let ChangeOutcome::NotAllowed(check) = outcome else {
        panic!("expected refusal");
    };
    assert!(check
        .reason
        .as_deref()
        .is_some_and(|r| r.contains("unmet dependency")));
    assert_eq!(status_of(&h, "b"), StageStatus::NotStarted);
}

#[test]
fn test_change_status_to_blocked_is_direct_write() {
    let h = harness(vec![stage("a", &[], StageStatus::NotStarted)]);
    let rx = h.orchestrator.subscribe();

    let outcome = h
        .orchestrator
        .change_status(
            "a",
            StageStatus::Blocked,
            ChangeOptions {
                // The convergence pass would immediately lift a block on
                // a dependency-free stage.
                skip_cascade: true,
                ..ChangeOptions::default()
            },
        )
        .expect("Should block");
    assert!(matches!(outcome, ChangeOutcome::Applied(_)));
    assert_eq!(status_of(&h, "a"), StageStatus::Blocked);

    let events: Vec<StageEvent> = rx.try_iter().collect();
    assert!(events.iter().any(|e| matches!(
        e,
        StageEvent::StatusChanged { to: StageStatus::Blocked, .. }
    )));
}

#[test]
fn test_change_status_runs_convergence_pass() {
    // Completing `a` through the generic entry point must also mark the
    // downstream chain consistent: b becomes not_started, c stays
    // blocked behind b.
    let h = harness(vec![
        stage("a", &[], StageStatus::InProgress),
        stage("b", &["a"], StageStatus::NotStarted),
        stage("c", &["b"], StageStatus::NotStarted),
    ]);

    h.orchestrator
        .change_status("a", StageStatus::Completed, ChangeOptions::default())
        .expect("Should complete");

    assert_eq!(status_of(&h, "b"), StageStatus::NotStarted);
    assert_eq!(status_of(&h, "c"), StageStatus::Blocked);
}

#[test]
fn test_auto_converge_settles_multi_hop_chain() {
    let h = harness(vec![
        stage("a", &[], StageStatus::NotStarted),
        stage("b", &["a"], StageStatus::NotStarted),
        stage("c", &["b"], StageStatus::NotStarted),
    ]);

    let corrections = h
        .orchestrator
        .auto_converge("project-1")
        .expect("Should converge");

    assert_eq!(corrections.len(), 2);
    assert_eq!(status_of(&h, "a"), StageStatus::NotStarted);
    assert_eq!(status_of(&h, "b"), StageStatus::Blocked);
    assert_eq!(status_of(&h, "c"), StageStatus::Blocked);

    // A second call finds nothing to fix.
    let corrections = h
        .orchestrator
        .auto_converge("project-1")
        .expect("Should converge");
    assert!(corrections.is_empty());
}

#[test]
fn test_auto_converge_unblocks_satisfied_stage() {
    let h = harness(vec![
        stage("a", &[], StageStatus::Completed),
        stage("b", &["a"], StageStatus::Blocked),
    ]);

    let corrections = h
        .orchestrator
        .auto_converge("project-1")
        .expect("Should converge");

    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].to, StageStatus::NotStarted);
    assert_eq!(status_of(&h, "b"), StageStatus::NotStarted);
}

#[test]
fn test_deliverable_hook_sees_status_changes() {
    let mut deliverable = stage("logo", &[], StageStatus::NotStarted);
    deliverable.is_deliverable = true;
    let h = harness(vec![deliverable]);

    h.orchestrator
        .start_stage("logo", "ana")
        .expect("Should start");
    h.orchestrator
        .complete_stage("logo", "ana")
        .expect("Should complete");

    let synced = h.hook.synced();
    assert_eq!(
        synced,
        vec![
            (
                "logo".to_string(),
                StageStatus::NotStarted,
                StageStatus::InProgress
            ),
            (
                "logo".to_string(),
                StageStatus::InProgress,
                StageStatus::Completed
            ),
        ]
    );
}

#[test]
fn test_create_stages_schedules_and_announces_deliverables() {
    let mut template = vec![
        stage("brief", &[], StageStatus::NotStarted),
        stage("logo", &["brief"], StageStatus::NotStarted),
    ];
    template[1].is_deliverable = true;

    let h = harness(vec![]);
    let created = h
        .orchestrator
        .create_stages(
            template,
            chrono::NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        )
        .expect("Should create stages");

    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|s| s.start_date.is_some()));
    assert!(created.iter().all(|s| s.status == StageStatus::NotStarted));

    // Persisted and visible through the store.
    assert_eq!(h.stages.list("project-1").unwrap().len(), 2);
    assert_eq!(h.hook.created(), vec!["logo".to_string()]);
}

#[test]
fn test_master_unlock_weighting_flows_through_progress() {
    let h = harness_with_config(
        vec![
            stage("gate", &[], StageStatus::Completed),
            stage("other", &[], StageStatus::NotStarted),
        ],
        EngineConfig::with_master_unlocks(["gate".to_string()]),
    );

    // gate weighs 2*2=4 of 6 total (both medium priority).
    let progress = h
        .orchestrator
        .calculate_progress("project-1")
        .expect("Should compute");
    assert_eq!(progress, 67);
    assert_eq!(h.projects.progress("project-1"), Some(67));
}
