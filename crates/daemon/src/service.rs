// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Service` trait every orchestrator-registered component
//! (adapter, engine, watcher) implements, plus the state machine the
//! orchestrator drives it through.

use async_trait::async_trait;
use thiserror::Error;

/// `STOPPED -> STARTING -> RUNNING -> STOPPING -> STOPPED`, with the
/// alternate edges `STARTING -> ERROR` and `RUNNING -> UNHEALTHY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
    Unhealthy,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service}: failed to start: {cause}")]
    StartFailed { service: String, cause: String },
    #[error("{service}: failed to stop: {cause}")]
    StopFailed { service: String, cause: String },
}

/// Result of one `health_check` call.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency_ms: u64,
    pub details: Option<String>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self { healthy: true, latency_ms: 0, details: None }
    }

    pub fn unhealthy(details: impl Into<String>) -> Self {
        Self { healthy: false, latency_ms: 0, details: Some(details.into()) }
    }
}

/// A named, independently startable/stoppable/health-checkable unit the
/// orchestrator registers in dependency order.
#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &str;
    async fn start(&self) -> Result<(), ServiceError>;
    async fn stop(&self) -> Result<(), ServiceError>;
    async fn health_check(&self) -> HealthStatus;
}
