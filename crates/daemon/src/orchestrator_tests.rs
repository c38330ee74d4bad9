// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tempfile::tempdir;
use vaultflow_core::config::BusConfig;

struct RecordingService {
    name: String,
    started: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    fail_start: bool,
    order: Arc<SyncMutex<Vec<String>>>,
    healthy: Arc<AtomicBool>,
}

#[async_trait]
impl Service for RecordingService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<(), crate::service::ServiceError> {
        if self.fail_start {
            return Err(crate::service::ServiceError::StartFailed {
                service: self.name.clone(),
                cause: "boom".to_string(),
            });
        }
        self.started.store(true, AtomicOrdering::SeqCst);
        self.order.lock().push(format!("start:{}", self.name));
        Ok(())
    }

    async fn stop(&self) -> Result<(), crate::service::ServiceError> {
        self.stopped.store(true, AtomicOrdering::SeqCst);
        self.order.lock().push(format!("stop:{}", self.name));
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        if self.healthy.load(AtomicOrdering::SeqCst) {
            HealthStatus::healthy()
        } else {
            HealthStatus::unhealthy("forced unhealthy")
        }
    }
}

fn layout(root: &std::path::Path) -> VaultLayout {
    let layout = VaultLayout::new(root.to_path_buf());
    for dir in layout.all_dirs() {
        std::fs::create_dir_all(dir).unwrap();
    }
    layout
}

#[tokio::test]
async fn start_all_runs_services_in_order_and_stop_all_reverses_it() {
    let dir = tempdir().unwrap();
    let layout = layout(dir.path());
    let order = Arc::new(SyncMutex::new(Vec::new()));
    let bus = Arc::new(EventBus::new("test", &BusConfig::default()));

    let a = Arc::new(RecordingService {
        name: "a".to_string(),
        started: Arc::new(AtomicBool::new(false)),
        stopped: Arc::new(AtomicBool::new(false)),
        fail_start: false,
        order: order.clone(),
        healthy: Arc::new(AtomicBool::new(true)),
    });
    let b = Arc::new(RecordingService {
        name: "b".to_string(),
        started: Arc::new(AtomicBool::new(false)),
        stopped: Arc::new(AtomicBool::new(false)),
        fail_start: false,
        order: order.clone(),
        healthy: Arc::new(AtomicBool::new(true)),
    });

    let states: ServiceStates = Arc::new(SyncMutex::new(Vec::new()));
    let services: Vec<(String, Arc<dyn Service>)> = vec![("a".to_string(), a), ("b".to_string(), b)];
    let orch = Orchestrator::new(
        layout,
        services,
        states,
        Arc::new(ApprovalRuleSet::default()),
        bus,
        Duration::from_secs(30),
        Duration::from_secs(5),
    );

    orch.start_all().await.unwrap();
    orch.stop_all().await;

    let recorded = order.lock().clone();
    assert_eq!(recorded, vec!["start:a", "start:b", "stop:b", "stop:a"]);
}

#[tokio::test]
async fn a_failing_service_unwinds_already_started_services() {
    let dir = tempdir().unwrap();
    let layout = layout(dir.path());
    let order = Arc::new(SyncMutex::new(Vec::new()));
    let bus = Arc::new(EventBus::new("test", &BusConfig::default()));

    let a = Arc::new(RecordingService {
        name: "a".to_string(),
        started: Arc::new(AtomicBool::new(false)),
        stopped: Arc::new(AtomicBool::new(false)),
        fail_start: false,
        order: order.clone(),
        healthy: Arc::new(AtomicBool::new(true)),
    });
    let b = Arc::new(RecordingService {
        name: "b".to_string(),
        started: Arc::new(AtomicBool::new(false)),
        stopped: Arc::new(AtomicBool::new(false)),
        fail_start: true,
        order: order.clone(),
        healthy: Arc::new(AtomicBool::new(true)),
    });

    let states: ServiceStates = Arc::new(SyncMutex::new(Vec::new()));
    let services: Vec<(String, Arc<dyn Service>)> = vec![("a".to_string(), a), ("b".to_string(), b)];
    let orch = Orchestrator::new(
        layout,
        services,
        states,
        Arc::new(ApprovalRuleSet::default()),
        bus,
        Duration::from_secs(30),
        Duration::from_secs(5),
    );

    let result = orch.start_all().await;
    assert!(result.is_err());

    let recorded = order.lock().clone();
    assert_eq!(recorded, vec!["start:a", "stop:a"]);
}

#[tokio::test]
async fn second_instance_cannot_acquire_the_lock() {
    let dir = tempdir().unwrap();
    let layout = layout(dir.path());
    let bus = Arc::new(EventBus::new("test", &BusConfig::default()));

    let states: ServiceStates = Arc::new(SyncMutex::new(Vec::new()));
    let orch = Orchestrator::new(
        layout.clone(),
        Vec::new(),
        states,
        Arc::new(ApprovalRuleSet::default()),
        bus.clone(),
        Duration::from_secs(30),
        Duration::from_secs(5),
    );
    orch.start_all().await.unwrap();

    let states2: ServiceStates = Arc::new(SyncMutex::new(Vec::new()));
    let orch2 = Orchestrator::new(layout, Vec::new(), states2, Arc::new(ApprovalRuleSet::default()), bus, Duration::from_secs(30), Duration::from_secs(5));
    let result = orch2.start_all().await;
    assert!(matches!(result, Err(OrchestratorError::AlreadyRunning { .. })));

    orch.stop_all().await;
}

#[tokio::test]
async fn three_consecutive_unhealthy_checks_escalate_the_state() {
    let dir = tempdir().unwrap();
    let layout = layout(dir.path());
    let bus = Arc::new(EventBus::new("test", &BusConfig::default()));
    let healthy = Arc::new(AtomicBool::new(false));

    let a = Arc::new(RecordingService {
        name: "a".to_string(),
        started: Arc::new(AtomicBool::new(false)),
        stopped: Arc::new(AtomicBool::new(false)),
        fail_start: false,
        order: Arc::new(SyncMutex::new(Vec::new())),
        healthy: healthy.clone(),
    });

    let states: ServiceStates = Arc::new(SyncMutex::new(Vec::new()));
    let services: Vec<(String, Arc<dyn Service>)> = vec![("a".to_string(), a)];
    let orch = Orchestrator::new(
        layout,
        services,
        states.clone(),
        Arc::new(ApprovalRuleSet::default()),
        bus,
        Duration::from_secs(30),
        Duration::from_secs(5),
    );

    let mut consecutive = std::collections::HashMap::new();
    orch.health_pass(&mut consecutive).await;
    orch.health_pass(&mut consecutive).await;
    orch.health_pass(&mut consecutive).await;

    let snapshot = states.lock().clone();
    assert_eq!(snapshot, vec![("a".to_string(), ServiceState::Unhealthy)]);
}
