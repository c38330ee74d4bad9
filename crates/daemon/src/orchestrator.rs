// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires every watcher service together, drives the dependency-ordered
//! startup/shutdown sequence, the periodic health-check loop, and the
//! single-instance vault lock. This replaces the Unix-socket daemon
//! process entirely: `vaultflow start` calls [`run_until_shutdown`]
//! in-process and blocks until a shutdown signal arrives.

use fs2::FileExt;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use vaultflow_adapters::{FileStepAdapter, PlanGeneratorAdapter, ScriptStepAdapter, StepAdapterRegistry};
use vaultflow_core::config::Config;
use vaultflow_core::{Event, EventType, StepKind, UuidIdGen, VaultLayout};
use vaultflow_engine::{ApprovalRule, ApprovalRuleSet, EventBus, ExecutionEngine, IngestionEngine, TransitionEngine};
use vaultflow_storage::{AuditLog, CorrelationTracker};

use crate::dashboard::DashboardService;
use crate::execution_watcher::ExecutionWatcherService;
use crate::ingestion_watcher::IngestionWatcherService;
use crate::planning_watcher::PlanningWatcherService;
use crate::service::{HealthStatus, Service, ServiceState};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("another orchestrator instance already holds the vault lock at {path}")]
    AlreadyRunning { path: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("service {service} failed to start: {cause}")]
    StartFailed { service: String, cause: String },
}

pub type ServiceStates = Arc<SyncMutex<Vec<(String, ServiceState)>>>;

pub struct Orchestrator {
    layout: VaultLayout,
    services: Vec<(String, Arc<dyn Service>)>,
    states: ServiceStates,
    rules: Arc<ApprovalRuleSet>,
    bus: Arc<EventBus>,
    health_interval: Duration,
    health_timeout: Duration,
    health_task: SyncMutex<Option<JoinHandle<()>>>,
    lock_file: SyncMutex<Option<File>>,
}

impl Orchestrator {
    pub fn new(
        layout: VaultLayout,
        services: Vec<(String, Arc<dyn Service>)>,
        states: ServiceStates,
        rules: Arc<ApprovalRuleSet>,
        bus: Arc<EventBus>,
        health_interval: Duration,
        health_timeout: Duration,
    ) -> Self {
        {
            let mut snapshot = states.lock();
            for (name, _) in &services {
                if !snapshot.iter().any(|(n, _)| n == name) {
                    snapshot.push((name.clone(), ServiceState::Stopped));
                }
            }
        }
        Self {
            layout,
            services,
            states,
            rules,
            bus,
            health_interval,
            health_timeout,
            health_task: SyncMutex::new(None),
            lock_file: SyncMutex::new(None),
        }
    }

    pub fn states(&self) -> ServiceStates {
        self.states.clone()
    }

    fn set_state(&self, name: &str, state: ServiceState) {
        let mut states = self.states.lock();
        if let Some(entry) = states.iter_mut().find(|(n, _)| n == name) {
            entry.1 = state;
        }
    }

    /// Acquire the exclusive per-vault lock and record this process's PID,
    /// so `stop`/`restart` know which process to signal.
    fn acquire_pid_lock(&self) -> Result<(), OrchestratorError> {
        let lock_path = self.layout.orchestrator_pid_lock_path();
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&lock_path)?;
        file.try_lock_exclusive()
            .map_err(|_| OrchestratorError::AlreadyRunning { path: lock_path.display().to_string() })?;
        std::fs::write(self.layout.orchestrator_pid_path(), std::process::id().to_string())?;
        *self.lock_file.lock() = Some(file);
        Ok(())
    }

    fn release_pid_lock(&self) {
        if let Some(file) = self.lock_file.lock().take() {
            let _ = file.unlock();
        }
        let _ = std::fs::remove_file(self.layout.orchestrator_pid_path());
    }

    /// Start every registered service in order, rewinding already-started
    /// services in reverse order on the first failure.
    pub async fn start_all(&self) -> Result<(), OrchestratorError> {
        self.acquire_pid_lock()?;
        for (idx, (name, service)) in self.services.iter().enumerate() {
            self.set_state(name, ServiceState::Starting);
            if let Err(e) = service.start().await {
                self.set_state(name, ServiceState::Error);
                for (prev_name, prev_service) in self.services[..idx].iter().rev() {
                    let _ = prev_service.stop().await;
                    self.set_state(prev_name, ServiceState::Stopped);
                }
                self.release_pid_lock();
                return Err(OrchestratorError::StartFailed { service: name.clone(), cause: e.to_string() });
            }
            self.set_state(name, ServiceState::Running);
            info!(service = name.as_str(), "service started");
        }
        Ok(())
    }

    /// Stop every service in reverse start order and release the lock.
    pub async fn stop_all(&self) {
        for (name, service) in self.services.iter().rev() {
            self.set_state(name, ServiceState::Stopping);
            if let Err(e) = service.stop().await {
                warn!(service = name.as_str(), error = %e, "service failed to stop cleanly");
            }
            self.set_state(name, ServiceState::Stopped);
        }
        self.release_pid_lock();
    }

    /// One health-check pass over every service, escalating to
    /// `UNHEALTHY` and publishing `service.error` after three consecutive
    /// failed checks. No auto-restart; recovery is an operator action.
    async fn health_pass(&self, consecutive: &mut HashMap<String, u32>) {
        for (name, service) in &self.services {
            let status = tokio::time::timeout(self.health_timeout, service.health_check())
                .await
                .unwrap_or_else(|_| HealthStatus::unhealthy("health check timed out"));
            let count = consecutive.entry(name.clone()).or_insert(0);
            if status.healthy {
                *count = 0;
                continue;
            }
            *count += 1;
            if *count >= 3 {
                self.set_state(name, ServiceState::Unhealthy);
                error!(service = name.as_str(), details = ?status.details, "service unhealthy");
                self.bus.publish(Event::new(EventType::ServiceError, name.as_str()));
            }
        }
    }

    pub fn spawn_health_loop(self: &Arc<Self>) {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.health_interval);
            let mut consecutive = HashMap::new();
            loop {
                ticker.tick().await;
                this.health_pass(&mut consecutive).await;
            }
        });
        *self.health_task.lock() = Some(handle);
    }

    pub fn stop_health_loop(&self) {
        if let Some(handle) = self.health_task.lock().take() {
            handle.abort();
        }
    }

    /// Reload the approval rule set from `path` (a JSON array of rules),
    /// or the built-in defaults if `path` is `None`. Called on SIGHUP.
    pub fn reload_rules(&self, path: Option<&Path>) -> std::io::Result<()> {
        let rules = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)?;
                serde_json::from_str::<Vec<ApprovalRule>>(&text)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?
            }
            None => vaultflow_engine::default_rules(),
        };
        self.rules.reload(rules);
        Ok(())
    }

    /// Start every service, wait for SIGINT/SIGTERM, then shut everything
    /// down: stop services in reverse order, drain the event bus, release
    /// the lock.
    pub async fn run_until_shutdown(self: Arc<Self>) -> Result<(), OrchestratorError> {
        self.start_all().await?;
        self.spawn_health_loop();

        wait_for_shutdown_signal().await;

        info!("shutdown signal received, stopping services");
        self.stop_health_loop();
        self.stop_all().await;
        let report = self.bus.shutdown(Duration::from_secs(10)).await;
        info!(drained = report.drained, cancelled = report.cancelled, "event bus drained");
        Ok(())
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Build the full service set from configuration and a concrete planning
/// adapter, ready to hand to [`Orchestrator::run_until_shutdown`]. The
/// planning adapter is left generic because the real model-backed
/// implementation is an external collaborator the CLI supplies.
pub fn build<P: PlanGeneratorAdapter + 'static>(
    config: &Config,
    plan_generator: Arc<P>,
) -> Result<Arc<Orchestrator>, OrchestratorError> {
    let layout = VaultLayout::new(config.vault_path.clone());
    for dir in layout.all_dirs() {
        std::fs::create_dir_all(&dir)?;
    }

    let audit_log = Arc::new(AuditLog::open(layout.root().join(&config.audit_path))?);
    let correlation = Arc::new(CorrelationTracker::new());
    let bus = Arc::new(EventBus::new("orchestrator", &config.bus));

    let rules = Arc::new(match &config.approval.rules_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let parsed: Vec<ApprovalRule> = serde_json::from_str(&text)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            ApprovalRuleSet::new(parsed)
        }
        None => ApprovalRuleSet::default(),
    });

    let transitions = Arc::new(TransitionEngine::new(
        layout.clone(),
        config.lock.clone(),
        config.retry.clone(),
        audit_log.clone(),
        correlation,
        bus.clone(),
    ));

    let mut registry = StepAdapterRegistry::new();
    registry.register(StepKind::File, Arc::new(FileStepAdapter));
    registry.register(StepKind::Script, Arc::new(ScriptStepAdapter));
    let execution = Arc::new(ExecutionEngine::new(registry, config.execution.clone(), audit_log.clone()));

    let ingestion = IngestionEngine::new(layout.clone(), UuidIdGen, bus.clone(), config.archive.clone());

    let poll_interval = Duration::from_secs(1);
    let states: ServiceStates = Arc::new(SyncMutex::new(Vec::new()));

    let services: Vec<(String, Arc<dyn Service>)> = vec![
        (
            "ingestion-watcher".to_string(),
            Arc::new(IngestionWatcherService::new(layout.clone(), ingestion, poll_interval)),
        ),
        (
            "planning-watcher".to_string(),
            Arc::new(PlanningWatcherService::new(
                layout.clone(),
                plan_generator,
                transitions.clone(),
                rules.clone(),
                poll_interval,
            )),
        ),
        (
            "execution-watcher".to_string(),
            Arc::new(ExecutionWatcherService::new(layout.clone(), execution, transitions, poll_interval)),
        ),
        (
            "dashboard".to_string(),
            Arc::new(DashboardService::new(
                layout.clone(),
                audit_log,
                states.clone(),
                Duration::from_millis(config.dashboard_interval_ms),
            )),
        ),
    ];

    Ok(Arc::new(Orchestrator::new(
        layout,
        services,
        states,
        rules,
        bus,
        Duration::from_millis(config.health.interval_ms),
        Duration::from_millis(config.health.timeout_ms),
    )))
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
