// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vaultflow-daemon: the orchestrator that drives a vault's files through
//! the workflow lifecycle. Each stage (ingest, plan, execute, report) is
//! a polling [`Service`] registered with an [`Orchestrator`]; there is no
//! socket and no wire protocol, since the pipeline is file-driven.

pub mod dashboard;
pub mod execution_watcher;
pub mod ingestion_watcher;
pub mod orchestrator;
pub mod planning_watcher;
pub mod service;

pub use dashboard::DashboardService;
pub use execution_watcher::ExecutionWatcherService;
pub use ingestion_watcher::IngestionWatcherService;
pub use orchestrator::{build, Orchestrator, OrchestratorError, ServiceStates};
pub use planning_watcher::PlanningWatcherService;
pub use service::{HealthStatus, Service, ServiceError, ServiceState};
