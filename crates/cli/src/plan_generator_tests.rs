// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeMap;
use vaultflow_core::{ActionId, Priority};

fn action(action_type: ActionType) -> Action {
    Action {
        id: ActionId::new("a1"),
        action_type,
        priority: Priority::Low,
        context: BTreeMap::new(),
        created_at: Utc::now(),
        source: "inbox/raw.txt".to_string(),
        estimated_duration_min: Some(10),
    }
}

#[tokio::test]
async fn email_response_produces_a_single_email_step() {
    let plan = HeuristicPlanGenerator.generate(&action(ActionType::EmailResponse)).await.unwrap();
    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.steps[0].kind, StepKind::Email);
    assert_eq!(plan.id.as_str(), "a1");
}

#[tokio::test]
async fn unclassified_action_falls_back_to_a_script_step() {
    let plan = HeuristicPlanGenerator.generate(&action(ActionType::Other)).await.unwrap();
    assert_eq!(plan.steps[0].kind, StepKind::Script);
}
