// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeMap;
use tempfile::tempdir;
use vaultflow_adapters::{FakeStepAdapter, StepAdapterRegistry};
use vaultflow_core::config::ExecutionMode;
use vaultflow_core::{ActionId, PlanId, PlanStatus, StepKind};

fn plan(steps: Vec<Step>) -> Plan {
    let now = Utc::now();
    Plan {
        action_id: ActionId::new("action-1"),
        id: PlanId::new("plan-1"),
        status: PlanStatus::Approved,
        created_at: now,
        updated_at: now,
        estimated_duration_min: 0,
        steps,
        requires_approval: false,
        correlation_id: "corr-1".to_string(),
    }
}

fn step(index: u32, kind: StepKind, reversible: bool) -> Step {
    Step { index, kind, params: BTreeMap::new(), reversible, rollback_params: None }
}

fn engine_with(registry: StepAdapterRegistry, mode: ExecutionMode, strategy: RollbackStrategy) -> (ExecutionEngine, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let audit = Arc::new(AuditLog::open(dir.path().join("audit.jsonl")).unwrap());
    let config = ExecutionConfig { mode, rollback_strategy: strategy, step_timeout_ms: 5_000 };
    (ExecutionEngine::new(registry, config, audit), dir)
}

#[tokio::test]
async fn dry_run_never_touches_adapters() {
    let fake = Arc::new(FakeStepAdapter::new());
    let mut registry = StepAdapterRegistry::new();
    registry.register(StepKind::Email, fake.clone());
    let (engine, _dir) = engine_with(registry, ExecutionMode::DryRun, RollbackStrategy::Automatic);

    let outcome = engine.execute_plan(&plan(vec![step(0, StepKind::Email, false)]), "corr-1").await;
    assert!(matches!(outcome, ExecutionOutcome::Done { .. }));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn real_mode_runs_every_step_in_order() {
    let fake = Arc::new(FakeStepAdapter::new());
    let mut registry = StepAdapterRegistry::new();
    registry.register(StepKind::Email, fake.clone());
    let (engine, _dir) = engine_with(registry, ExecutionMode::Real, RollbackStrategy::Automatic);

    let outcome = engine
        .execute_plan(&plan(vec![step(0, StepKind::Email, false), step(1, StepKind::Email, false)]), "corr-1")
        .await;

    match outcome {
        ExecutionOutcome::Done { results } => {
            assert_eq!(results.len(), 2);
            assert!(results.iter().all(|r| r.status == StepStatus::Succeeded));
        }
        other => panic!("expected Done, got {other:?}"),
    }
    assert_eq!(fake.calls().len(), 2);
}

#[tokio::test]
async fn automatic_rollback_compensates_reversible_steps_in_reverse() {
    let fake_ok = Arc::new(FakeStepAdapter::new());
    let fake_fail = Arc::new(FakeStepAdapter::new());
    fake_fail.fail_next("boom");
    let mut registry = StepAdapterRegistry::new();
    registry.register(StepKind::Email, fake_ok);
    registry.register(StepKind::Calendar, fake_fail);
    let (engine, _dir) = engine_with(registry, ExecutionMode::Real, RollbackStrategy::Automatic);

    let outcome = engine
        .execute_plan(&plan(vec![step(0, StepKind::Email, true), step(1, StepKind::Calendar, true)]), "corr-1")
        .await;

    match outcome {
        ExecutionOutcome::Failed { results, compensated } => {
            assert!(compensated);
            assert_eq!(results[0].status, StepStatus::RolledBack);
            assert_eq!(results[1].status, StepStatus::Failed);
        }
        other => panic!("expected Failed{{compensated:true}}, got {other:?}"),
    }
}

#[tokio::test]
async fn rollback_of_non_reversible_step_does_not_block_other_compensations() {
    let fake_ok = Arc::new(FakeStepAdapter::new());
    let fake_fail = Arc::new(FakeStepAdapter::new());
    fake_fail.fail_next("boom");
    let mut registry = StepAdapterRegistry::new();
    registry.register(StepKind::Email, fake_ok.clone());
    registry.register(StepKind::Calendar, fake_fail.clone());
    let (engine, _dir) = engine_with(registry, ExecutionMode::Real, RollbackStrategy::Automatic);

    // step 0 is not reversible, so its compensation reports not_supported
    // but the run can still be considered compensated overall.
    let outcome = engine
        .execute_plan(&plan(vec![step(0, StepKind::Email, false), step(1, StepKind::Calendar, true)]), "corr-1")
        .await;

    match outcome {
        ExecutionOutcome::Failed { results, compensated } => {
            assert!(compensated);
            assert_eq!(results[0].status, StepStatus::Succeeded);
        }
        other => panic!("expected Failed{{compensated:true}}, got {other:?}"),
    }
}

#[tokio::test]
async fn no_rollback_strategy_leaves_the_run_uncompensated() {
    let fake_fail = Arc::new(FakeStepAdapter::new());
    fake_fail.fail_next("boom");
    let mut registry = StepAdapterRegistry::new();
    registry.register(StepKind::Email, fake_fail);
    let (engine, _dir) = engine_with(registry, ExecutionMode::Real, RollbackStrategy::None);

    let outcome = engine.execute_plan(&plan(vec![step(0, StepKind::Email, true)]), "corr-1").await;
    match outcome {
        ExecutionOutcome::Failed { compensated, .. } => assert!(!compensated),
        other => panic!("expected Failed{{compensated:false}}, got {other:?}"),
    }
}

#[tokio::test]
async fn simulated_mode_sleeps_and_reports_success() {
    let registry = StepAdapterRegistry::new();
    let (engine, _dir) = engine_with(registry, ExecutionMode::Simulated, RollbackStrategy::Automatic);

    let mut params = BTreeMap::new();
    params.insert("simulated_ms".to_string(), serde_json::Value::from(1));
    let mut s = step(0, StepKind::Api, false);
    s.params = params;

    let outcome = engine.execute_plan(&plan(vec![s]), "corr-1").await;
    assert!(matches!(outcome, ExecutionOutcome::Done { .. }));
}
