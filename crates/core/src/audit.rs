// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `AuditEntry` shape shared between the workflow engine (producer)
//! and `vaultflow-storage` (the append-only hash-chained log itself).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One line of the immutable audit log.
///
/// `entry_hash` and `chain_hash` are computed by the audit log writer at
/// append time; a freshly-constructed entry (via [`AuditEntry::new`]) has
/// both set to the empty string until appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub seq: u64,
    pub entry_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
    pub entry_hash: String,
    pub chain_hash: String,
}

/// The fields that participate in `entry_hash`'s canonical JSON — i.e.
/// everything except the two hash fields themselves, which cannot depend
/// on their own value.
#[derive(Debug, Serialize)]
pub struct AuditEntryContent<'a> {
    pub seq: u64,
    pub entry_id: &'a str,
    pub timestamp: DateTime<Utc>,
    pub event_type: &'a str,
    pub actor: &'a str,
    pub action: &'a str,
    pub resource: &'a str,
    pub resource_id: &'a str,
    pub correlation_id: Option<&'a str>,
    pub details: &'a BTreeMap<String, serde_json::Value>,
}

impl AuditEntry {
    pub fn content(&self) -> AuditEntryContent<'_> {
        AuditEntryContent {
            seq: self.seq,
            entry_id: &self.entry_id,
            timestamp: self.timestamp,
            event_type: &self.event_type,
            actor: &self.actor,
            action: &self.action,
            resource: &self.resource,
            resource_id: &self.resource_id,
            correlation_id: self.correlation_id.as_deref(),
            details: &self.details,
        }
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
