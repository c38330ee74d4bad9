// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeMap;
use tempfile::tempdir;
use vaultflow_adapters::FakePlanGeneratorAdapter;
use vaultflow_core::config::{BusConfig, LockConfig, RetryConfig};
use vaultflow_core::vault::action_file_name;
use vaultflow_core::{ActionId, ActionType, Priority};
use vaultflow_engine::EventBus;
use vaultflow_storage::{AuditLog, CorrelationTracker};

fn layout(root: &std::path::Path) -> VaultLayout {
    let layout = VaultLayout::new(root.to_path_buf());
    for dir in layout.all_dirs() {
        std::fs::create_dir_all(dir).unwrap();
    }
    layout
}

fn transition_engine(layout: &VaultLayout) -> Arc<TransitionEngine> {
    let audit = Arc::new(AuditLog::open(layout.audit_dir().join("immutable_audit.jsonl")).unwrap());
    let correlation = Arc::new(CorrelationTracker::new());
    let bus = Arc::new(EventBus::new("test", &BusConfig::default()));
    Arc::new(TransitionEngine::new(
        layout.clone(),
        LockConfig::default(),
        RetryConfig::default(),
        audit,
        correlation,
        bus,
    ))
}

fn action(stem: &str, action_type: ActionType, priority: Priority, duration_min: Option<u32>) -> Action {
    Action {
        id: ActionId::new(stem.to_string()),
        action_type,
        priority,
        context: BTreeMap::new(),
        created_at: Utc::now(),
        source: "inbox/raw.txt".to_string(),
        estimated_duration_min: duration_min,
    }
}

fn minimal_plan(stem: &str, duration_min: u32) -> vaultflow_core::Plan {
    let now = Utc::now();
    vaultflow_core::Plan {
        action_id: ActionId::new(stem.to_string()),
        id: PlanId::new(stem.to_string()),
        status: vaultflow_core::PlanStatus::Draft,
        created_at: now,
        updated_at: now,
        estimated_duration_min: duration_min,
        steps: Vec::new(),
        requires_approval: false,
        correlation_id: stem.to_string(),
    }
}

#[tokio::test]
async fn quick_email_is_auto_approved_straight_to_execution_pending() {
    let dir = tempdir().unwrap();
    let layout = layout(dir.path());
    let transitions = transition_engine(&layout);
    let generator = Arc::new(FakePlanGeneratorAdapter::new());
    generator.queue_plan(minimal_plan("stem-1", 5));

    let action = action("stem-1", ActionType::EmailResponse, Priority::Low, Some(5));
    let action_path = layout.folder(VaultFolder::NeedsAction).join(action_file_name("stem-1"));
    std::fs::write(&action_path, serde_yaml::to_string(&action).unwrap()).unwrap();

    let watcher = PlanningWatcherService::new(
        layout.clone(),
        generator.clone(),
        transitions,
        Arc::new(ApprovalRuleSet::default()),
        Duration::from_millis(20),
    );
    watcher.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    watcher.stop().await.unwrap();

    assert!(std::fs::read_dir(layout.folder(VaultFolder::NeedsAction)).unwrap().next().is_none());
    let plans: Vec<_> = std::fs::read_dir(layout.folder(VaultFolder::Plans)).unwrap().collect();
    assert_eq!(plans.len(), 2, "both the action and plan files should land in Plans");
    assert_eq!(generator.calls().len(), 1);
}

#[tokio::test]
async fn analytical_action_requires_approval() {
    let dir = tempdir().unwrap();
    let layout = layout(dir.path());
    let transitions = transition_engine(&layout);
    let generator = Arc::new(FakePlanGeneratorAdapter::new());
    generator.queue_plan(minimal_plan("stem-2", 30));

    let action = action("stem-2", ActionType::DataAnalysis, Priority::Medium, Some(30));
    let action_path = layout.folder(VaultFolder::NeedsAction).join(action_file_name("stem-2"));
    std::fs::write(&action_path, serde_yaml::to_string(&action).unwrap()).unwrap();

    let watcher = PlanningWatcherService::new(
        layout.clone(),
        generator,
        transitions,
        Arc::new(ApprovalRuleSet::default()),
        Duration::from_millis(20),
    );
    watcher.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    watcher.stop().await.unwrap();

    let pending: Vec<_> = std::fs::read_dir(layout.folder(VaultFolder::PendingApproval)).unwrap().collect();
    assert_eq!(pending.len(), 2, "the action and a fresh approval record should land in Pending_Approval");
    let plans: Vec<_> = std::fs::read_dir(layout.folder(VaultFolder::Plans)).unwrap().collect();
    assert_eq!(plans.len(), 1, "only the plan file stays behind in Plans");
}
