use super::*;
use crate::graph::DependencyIndex;
use crate::models::stage::{Stage, StageStatus};

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

#[test]
fn test_reset_with_completed_dependent_is_conflict() {
    let stages = vec![
        stage("a", &[], StageStatus::Completed),
        stage("b", &["a"], StageStatus::Completed),
    ];
    let index = DependencyIndex::build(&stages);

    let impact = evaluate_impact(&stages[0], StageStatus::NotStarted, &index);
    assert_eq!(impact.conflicts.len(), 1);
    assert_eq!(impact.conflicts[0].stage_id, "b");
    assert_eq!(impact.conflicts[0].severity, Severity::High);
    assert!(impact.requires_confirmation);
}

#[test]
fn test_reset_with_in_progress_dependent_is_warning() {
    let stages = vec![
        stage("a", &[], StageStatus::Completed),
        stage("b", &["a"], StageStatus::InProgress),
    ];
    let index = DependencyIndex::build(&stages);

    let impact = evaluate_impact(&stages[0], StageStatus::NotStarted, &index);
    assert!(impact.conflicts.is_empty());
    assert_eq!(impact.warnings.len(), 1);
    assert_eq!(impact.warnings[0].severity, Severity::Medium);
    assert!(impact.requires_confirmation);
}

#[test]
fn test_reset_with_idle_dependents_auto_blocks() {
    let stages = vec![
        stage("a", &[], StageStatus::Completed),
        stage("b", &["a"], StageStatus::NotStarted),
        stage("c", &["b"], StageStatus::Blocked),
    ];
    let index = DependencyIndex::build(&stages);

    let impact = evaluate_impact(&stages[0], StageStatus::NotStarted, &index);
    assert!(impact.conflicts.is_empty());
    assert!(impact.warnings.is_empty());
    assert!(!impact.requires_confirmation);
    assert_eq!(impact.directly_affected.len(), 2);
    assert!(impact
        .directly_affected
        .iter()
        .all(|e| e.action == CascadeAction::Block));
}

#[test]
fn test_reset_walks_transitive_dependents() {
    let stages = vec![
        stage("a", &[], StageStatus::Completed),
        stage("b", &["a"], StageStatus::Completed),
        stage("c", &["b"], StageStatus::Completed),
    ];
    let index = DependencyIndex::build(&stages);

    let impact = evaluate_impact(&stages[0], StageStatus::NotStarted, &index);
    assert_eq!(impact.conflicts.len(), 2);
}

#[test]
fn test_completion_marks_ready_dependents_for_unblock() {
    let stages = vec![
        stage("a", &[], StageStatus::InProgress),
        stage("b", &[], StageStatus::Completed),
        stage("c", &["a", "b"], StageStatus::Blocked),
    ];
    let index = DependencyIndex::build(&stages);

    let impact = evaluate_impact(&stages[0], StageStatus::Completed, &index);
    assert_eq!(impact.directly_affected.len(), 1);
    assert_eq!(impact.directly_affected[0].stage_id, "c");
    assert_eq!(impact.directly_affected[0].action, CascadeAction::Unblock);
    assert!(!impact.requires_confirmation);
}

#[test]
fn test_completion_skips_dependents_with_other_unmet_deps() {
    let stages = vec![
        stage("a", &[], StageStatus::InProgress),
        stage("b", &[], StageStatus::NotStarted),
        stage("c", &["a", "b"], StageStatus::Blocked),
    ];
    let index = DependencyIndex::build(&stages);

    let impact = evaluate_impact(&stages[0], StageStatus::Completed, &index);
    assert!(impact.directly_affected.is_empty());
}

#[test]
fn test_can_transition_counts_unmet_dependencies() {
    let stages = vec![
        stage("a", &[], StageStatus::NotStarted),
        stage("b", &[], StageStatus::Completed),
        stage("c", &["a", "b"], StageStatus::NotStarted),
    ];
    let index = DependencyIndex::build(&stages);

    let check = can_transition(&stages[2], StageStatus::InProgress, &index);
    assert!(!check.allowed);
    assert!(check
        .reason
        .as_deref()
        .is_some_and(|r| r.contains("1 unmet dependency")));
}

#[test]
fn test_can_transition_allows_start_when_deps_completed() {
    let stages = vec![
        stage("a", &[], StageStatus::Completed),
        stage("b", &["a"], StageStatus::NotStarted),
    ];
    let index = DependencyIndex::build(&stages);

    let check = can_transition(&stages[1], StageStatus::InProgress, &index);
    assert!(check.allowed);
    assert!(check.warnings.is_empty());
}

#[test]
fn test_can_transition_away_from_completed_warns_but_allows() {
    let stages = vec![
        stage("a", &[], StageStatus::Completed),
        stage("b", &["a"], StageStatus::NotStarted),
        stage("c", &["b"], StageStatus::NotStarted),
    ];
    let index = DependencyIndex::build(&stages);

    let check = can_transition(&stages[0], StageStatus::NotStarted, &index);
    assert!(check.allowed);
    assert_eq!(check.warnings.len(), 1);
    assert!(check.warnings[0].contains("2 dependent stages"));
}

#[test]
fn test_can_transition_rejects_invalid_state_machine_move() {
    let stages = vec![stage("a", &[], StageStatus::Blocked)];
    let index = DependencyIndex::build(&stages);

    let check = can_transition(&stages[0], StageStatus::Completed, &index);
    assert!(!check.allowed);
    assert!(check
        .reason
        .as_deref()
        .is_some_and(|r| r.contains("invalid transition")));
}
