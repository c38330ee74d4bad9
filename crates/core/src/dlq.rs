// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `DLQEntry` metadata sidecar written next to a quarantined file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::state::WorkflowState;

/// Metadata recorded alongside a file copied into `Dead_Letter/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEntry {
    pub dlq_id: String,
    pub original_path: String,
    pub source_state: WorkflowState,
    pub error: String,
    pub attempts: u32,
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
    pub quarantined_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "dlq_tests.rs"]
mod tests;
