// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn record(from: WorkflowState, to: WorkflowState) -> TransitionRecord {
    TransitionRecord {
        from_state: from,
        to_state: to,
        at: Utc::now(),
        success: true,
        error: None,
    }
}

#[test]
fn record_transition_creates_and_updates_context() {
    let tracker = CorrelationTracker::new();
    tracker.record_transition(
        "corr-1",
        Some("action-1"),
        None,
        record(WorkflowState::Inbox, WorkflowState::NeedsAction),
    );
    tracker.record_transition(
        "corr-1",
        None,
        Some("plan-1"),
        record(WorkflowState::NeedsAction, WorkflowState::ActionProcessing),
    );

    let ctx = tracker.get("corr-1").unwrap();
    assert_eq!(ctx.action_id.as_deref(), Some("action-1"));
    assert_eq!(ctx.plan_id.as_deref(), Some("plan-1"));
    assert_eq!(ctx.state_history.len(), 2);
    assert_eq!(ctx.current_state(), Some(WorkflowState::ActionProcessing));
}

#[test]
fn open_contexts_excludes_terminal_states() {
    let tracker = CorrelationTracker::new();
    tracker.record_transition(
        "corr-open",
        Some("a1"),
        None,
        record(WorkflowState::Inbox, WorkflowState::NeedsAction),
    );
    tracker.record_transition(
        "corr-done",
        Some("a2"),
        None,
        record(WorkflowState::Executed, WorkflowState::Done),
    );

    let open = tracker.open_contexts();
    assert_eq!(open.len(), 1);
    assert!(open.contains_key("corr-open"));
}

#[test]
fn save_and_load_round_trip_open_contexts_only() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("open_contexts.json");

    let tracker = CorrelationTracker::new();
    tracker.record_transition(
        "corr-open",
        Some("a1"),
        None,
        record(WorkflowState::Inbox, WorkflowState::NeedsAction),
    );
    tracker.record_transition(
        "corr-done",
        Some("a2"),
        None,
        record(WorkflowState::Executed, WorkflowState::Done),
    );
    tracker.save(&path).unwrap();

    let reloaded = CorrelationTracker::load(&path).unwrap();
    assert_eq!(reloaded.len(), 1);
    assert!(reloaded.get("corr-open").is_some());
    assert!(reloaded.get("corr-done").is_none());
}

#[test]
fn load_missing_snapshot_returns_empty_tracker() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.json");

    let tracker = CorrelationTracker::load(&path).unwrap();
    assert!(tracker.is_empty());
}
