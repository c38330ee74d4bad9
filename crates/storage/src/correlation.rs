// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory index of open workflow contexts, keyed by correlation id.
//!
//! The workflow engine rebuilds this at startup by scanning non-terminal
//! vault folders (it owns that scan; this module only holds the map and
//! its on-disk snapshot) and persists it to `open_contexts.json` on
//! shutdown so a restart doesn't lose state-history for in-flight work.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use vaultflow_core::WorkflowState;

use crate::snapshot::{load_json, save_json, SnapshotError};

/// One recorded transition attempt, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransitionRecord {
    pub from_state: WorkflowState,
    pub to_state: WorkflowState,
    pub at: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
}

/// Everything known about one correlation id's journey through the
/// pipeline so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowContext {
    pub action_id: Option<String>,
    pub plan_id: Option<String>,
    pub state_history: Vec<TransitionRecord>,
}

impl WorkflowContext {
    pub fn current_state(&self) -> Option<WorkflowState> {
        self.state_history.last().map(|r| r.to_state)
    }
}

/// Thread-safe `correlation_id -> WorkflowContext` index.
#[derive(Default)]
pub struct CorrelationTracker {
    contexts: RwLock<HashMap<String, WorkflowContext>>,
}

impl CorrelationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transition (successful or not) against `correlation_id`,
    /// creating the context if this is the first time it's seen.
    pub fn record_transition(
        &self,
        correlation_id: &str,
        action_id: Option<&str>,
        plan_id: Option<&str>,
        record: TransitionRecord,
    ) {
        let mut contexts = self.contexts.write();
        let ctx = contexts.entry(correlation_id.to_string()).or_default();
        if let Some(action_id) = action_id {
            ctx.action_id = Some(action_id.to_string());
        }
        if let Some(plan_id) = plan_id {
            ctx.plan_id = Some(plan_id.to_string());
        }
        ctx.state_history.push(record);
    }

    /// Contexts whose most recent state is not terminal.
    pub fn open_contexts(&self) -> HashMap<String, WorkflowContext> {
        self.contexts
            .read()
            .iter()
            .filter(|(_, ctx)| !ctx.current_state().is_some_and(|s| s.is_terminal()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn get(&self, correlation_id: &str) -> Option<WorkflowContext> {
        self.contexts.read().get(correlation_id).cloned()
    }

    pub fn insert(&self, correlation_id: String, context: WorkflowContext) {
        self.contexts.write().insert(correlation_id, context);
    }

    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot all open contexts to `path` (atomic write).
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let open = self.open_contexts();
        save_json(path, &open)
    }

    /// Load a tracker from a previously saved snapshot, or an empty one
    /// if no snapshot exists or it was corrupt.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let loaded: Option<HashMap<String, WorkflowContext>> = load_json(path)?;
        Ok(Self {
            contexts: RwLock::new(loaded.unwrap_or_default()),
        })
    }
}

#[cfg(test)]
#[path = "correlation_tests.rs"]
mod tests;
