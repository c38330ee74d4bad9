// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Dashboard.md` writer: a snapshot of folder counts, the recent audit
//! tail, and watcher states, written with the same atomic temp-then-rename
//! primitive every other vault writer uses.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use vaultflow_core::VaultFolder;
use vaultflow_storage::{AuditLog, AuditQuery};

use crate::service::{HealthStatus, Service, ServiceError, ServiceState};

fn state_str(s: ServiceState) -> &'static str {
    match s {
        ServiceState::Stopped => "stopped",
        ServiceState::Starting => "starting",
        ServiceState::Running => "running",
        ServiceState::Stopping => "stopping",
        ServiceState::Error => "error",
        ServiceState::Unhealthy => "unhealthy",
    }
}

fn folder_count(layout: &vaultflow_core::VaultLayout, folder: VaultFolder) -> usize {
    std::fs::read_dir(layout.folder(folder))
        .map(|entries| entries.filter_map(Result::ok).filter(|e| e.path().is_file()).count())
        .unwrap_or(0)
}

/// Render the dashboard body. Split out from the I/O for easy testing.
pub fn render(
    layout: &vaultflow_core::VaultLayout,
    audit_log: &AuditLog,
    services: &[(String, ServiceState)],
) -> String {
    let mut out = String::new();
    out.push_str("# Vaultflow Dashboard\n\n");
    out.push_str(&format!("_generated {}_\n\n", chrono::Utc::now().to_rfc3339()));

    out.push_str("## Folder counts\n\n");
    for folder in VaultFolder::ALL {
        out.push_str(&format!("- {}: {}\n", folder.dir_name(), folder_count(layout, folder)));
    }

    out.push_str("\n## Services\n\n");
    for (name, state) in services {
        out.push_str(&format!("- {}: {}\n", name, state_str(*state)));
    }

    out.push_str("\n## Recent audit activity\n\n");
    match audit_log.query(&AuditQuery::default(), 20) {
        Ok(entries) if !entries.is_empty() => {
            for entry in entries {
                out.push_str(&format!(
                    "- `{}` {} {} {}/{}\n",
                    entry.timestamp.to_rfc3339(),
                    entry.event_type,
                    entry.actor,
                    entry.resource,
                    entry.resource_id
                ));
            }
        }
        _ => out.push_str("_no audit activity yet_\n"),
    }

    out
}

/// Render and atomically write the dashboard to `<vault>/Dashboard.md`.
pub async fn write_dashboard(
    layout: &vaultflow_core::VaultLayout,
    audit_log: &AuditLog,
    services: &[(String, ServiceState)],
) -> std::io::Result<()> {
    let body = render(layout, audit_log, services);
    write_atomic(&layout.dashboard_path(), &body).await
}

async fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    let tmp = path.with_file_name(name);
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::File::open(&tmp).await?.sync_all().await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Orchestrator-registered service wrapping [`write_dashboard`] in a
/// periodic poll, reading the live service-state snapshot the
/// orchestrator's health loop keeps up to date.
pub struct DashboardService {
    layout: vaultflow_core::VaultLayout,
    audit_log: Arc<AuditLog>,
    states: Arc<Mutex<Vec<(String, ServiceState)>>>,
    poll_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl DashboardService {
    pub fn new(
        layout: vaultflow_core::VaultLayout,
        audit_log: Arc<AuditLog>,
        states: Arc<Mutex<Vec<(String, ServiceState)>>>,
        poll_interval: Duration,
    ) -> Self {
        Self { layout, audit_log, states, poll_interval, task: Mutex::new(None), last_error: Arc::new(Mutex::new(None)) }
    }
}

#[async_trait]
impl Service for DashboardService {
    fn name(&self) -> &str {
        "dashboard"
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let layout = self.layout.clone();
        let audit_log = self.audit_log.clone();
        let states = self.states.clone();
        let interval = self.poll_interval;
        let last_error = self.last_error.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let snapshot = states.lock().clone();
                if let Err(e) = write_dashboard(&layout, &audit_log, &snapshot).await {
                    *last_error.lock() = Some(e.to_string());
                } else {
                    *last_error.lock() = None;
                }
            }
        });

        *self.task.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.last_error.lock().clone() {
            Some(err) => HealthStatus::unhealthy(err),
            None => HealthStatus::healthy(),
        }
    }
}

#[cfg(test)]
#[path = "dashboard_tests.rs"]
mod tests;
