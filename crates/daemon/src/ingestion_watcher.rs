// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator service that polls `Inbox` and hands each arrival to the
//! ingestion engine. Polling (rather than a filesystem-notification
//! library) mirrors the same 1-second `tokio::time::interval` idiom the
//! rest of this codebase uses for its timer-driven loops.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;
use vaultflow_core::{IdGen, UuidIdGen, VaultFolder, VaultLayout};
use vaultflow_engine::IngestionEngine;

use crate::service::{HealthStatus, Service, ServiceError};

pub struct IngestionWatcherService<G: IdGen + 'static = UuidIdGen> {
    layout: VaultLayout,
    engine: Arc<IngestionEngine<G>>,
    poll_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
    last_poll_ms: Arc<AtomicI64>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl<G: IdGen + 'static> IngestionWatcherService<G> {
    pub fn new(layout: VaultLayout, engine: IngestionEngine<G>, poll_interval: Duration) -> Self {
        Self {
            layout,
            engine: Arc::new(engine),
            poll_interval,
            task: Mutex::new(None),
            last_poll_ms: Arc::new(AtomicI64::new(0)),
            last_error: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl<G: IdGen + 'static> Service for IngestionWatcherService<G> {
    fn name(&self) -> &str {
        "ingestion-watcher"
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let layout = self.layout.clone();
        let engine = self.engine.clone();
        let interval = self.poll_interval;
        let last_poll_ms = self.last_poll_ms.clone();
        let last_error = self.last_error.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let inbox = layout.folder(VaultFolder::Inbox);
                let entries = match std::fs::read_dir(&inbox) {
                    Ok(e) => e,
                    Err(e) => {
                        *last_error.lock() = Some(e.to_string());
                        continue;
                    }
                };
                for entry in entries.filter_map(Result::ok) {
                    let path = entry.path();
                    if !path.is_file() || path.extension().is_some_and(|e| e == "tmp") {
                        continue;
                    }
                    if let Err(e) = engine.ingest(&path).await {
                        warn!(path = %path.display(), error = %e, "ingestion failed");
                        *last_error.lock() = Some(e.to_string());
                    }
                }
                last_poll_ms.store(chrono::Utc::now().timestamp_millis(), Ordering::SeqCst);
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
        if let Some(err) = self.last_error.lock().clone() {
            return HealthStatus::unhealthy(err);
        }
        let last = self.last_poll_ms.load(Ordering::SeqCst);
        if last == 0 {
            return HealthStatus::healthy();
        }
        let age_ms = chrono::Utc::now().timestamp_millis() - last;
        if age_ms > (self.poll_interval.as_millis() as i64) * 3 {
            return HealthStatus::unhealthy(format!("no poll in {age_ms}ms"));
        }
        HealthStatus::healthy()
    }
}

#[cfg(test)]
#[path = "ingestion_watcher_tests.rs"]
mod tests;
