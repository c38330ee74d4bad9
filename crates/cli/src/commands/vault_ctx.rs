// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared setup every command needs: load configuration, resolve the
//! vault layout, and (for the approval commands) stand up a bare
//! [`TransitionEngine`] without the rest of the orchestrator's services.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use vaultflow_core::config::Config;
use vaultflow_core::VaultLayout;
use vaultflow_engine::{EventBus, TransitionEngine};
use vaultflow_storage::{AuditLog, CorrelationTracker};

/// Load config (layered file + env) and resolve the vault layout from it.
pub fn load(config_path: Option<&Path>) -> Result<(Config, VaultLayout)> {
    let config = Config::load(config_path).context("failed to load configuration")?;
    let layout = VaultLayout::new(config.vault_path.clone());
    Ok((config, layout))
}

/// Stand up a [`TransitionEngine`] against an existing vault, for commands
/// that need to move a file between folders without running the full
/// orchestrator (e.g. `approval approve`/`approval reject`).
pub fn open_transitions(config: &Config, layout: &VaultLayout) -> Result<Arc<TransitionEngine>> {
    let audit_log = Arc::new(AuditLog::open(layout.root().join(&config.audit_path)).context("failed to open audit log")?);
    let correlation = Arc::new(CorrelationTracker::new());
    let bus = Arc::new(EventBus::new("cli", &config.bus));
    Ok(Arc::new(TransitionEngine::new(
        layout.clone(),
        config.lock.clone(),
        config.retry.clone(),
        audit_log,
        correlation,
        bus,
    )))
}

/// Open the audit log read-only for query/export commands.
pub fn open_audit_log(config: &Config, layout: &VaultLayout) -> Result<AuditLog> {
    AuditLog::open(layout.root().join(&config.audit_path)).context("failed to open audit log")
}
