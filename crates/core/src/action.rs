// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Action` entity: one unit of externally-originated work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::define_id;

define_id! {
    /// Unique identifier for an Action (a UUID v4 string).
    pub struct ActionId;
}

/// The kind of work an Action represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    EmailResponse,
    MeetingRequest,
    DocumentCreation,
    DataAnalysis,
    ReportGeneration,
    FollowUp,
    Other,
}

impl Default for ActionType {
    fn default() -> Self {
        ActionType::Other
    }
}

/// Urgency of an Action, used by the approval rule engine's risk scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// A single externally-observed unit of work, materialized as
/// `<stem>.action.yaml` in `Needs_Action`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub priority: Priority,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration_min: Option<u32>,
}

impl Action {
    pub fn stem(&self) -> &str {
        self.id.as_str()
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
