// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeMap;
use vaultflow_core::{ActionId, ActionType, Priority};

fn sample_action() -> Action {
    Action {
        id: ActionId::new("a1"),
        action_type: ActionType::EmailResponse,
        priority: Priority::Low,
        context: BTreeMap::new(),
        created_at: Utc::now(),
        source: "imap".to_string(),
        estimated_duration_min: Some(15),
    }
}

#[tokio::test]
async fn generate_returns_minimal_plan_by_default_and_records_the_call() {
    let adapter = FakePlanGeneratorAdapter::new();
    let action = sample_action();

    let plan = adapter.generate(&action).await.unwrap();
    assert_eq!(plan.action_id, action.id);
    assert!(plan.requires_approval);
    assert_eq!(adapter.calls().len(), 1);
}

#[tokio::test]
async fn queued_plan_is_returned_once() {
    let adapter = FakePlanGeneratorAdapter::new();
    let action = sample_action();

    let mut queued = adapter.generate(&action).await.unwrap();
    queued.status = PlanStatus::Planned;
    adapter.queue_plan(queued.clone());

    let first = adapter.generate(&action).await.unwrap();
    assert_eq!(first.status, PlanStatus::Planned);

    let second = adapter.generate(&action).await.unwrap();
    assert_eq!(second.status, PlanStatus::Draft);
}

#[tokio::test]
async fn fail_next_returns_the_scripted_error() {
    let adapter = FakePlanGeneratorAdapter::new();
    adapter.fail_next("model unavailable");

    let err = adapter.generate(&sample_action()).await.unwrap_err();
    assert!(matches!(err, PlanGeneratorError::Failed(m) if m == "model unavailable"));
}
