// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus payload types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The closed set of event types a subscriber may register against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    FileCreated,
    FileModified,
    FileMoved,
    FileDeleted,
    ActionGenerated,
    ActionProcessed,
    ActionApproved,
    ActionExecuted,
    ActionFailed,
    PlanCreated,
    PlanApproved,
    PlanExecutionCompleted,
    EmailReceived,
    ApprovalRequired,
    ApprovalGranted,
    ApprovalDenied,
    ServiceStarted,
    ServiceStopped,
    ServiceError,
    HealthCheck,
    HealthStatus,
    SystemShutdown,
    SystemRestart,
    BusOverflow,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::FileCreated => "file.created",
            EventType::FileModified => "file.modified",
            EventType::FileMoved => "file.moved",
            EventType::FileDeleted => "file.deleted",
            EventType::ActionGenerated => "action.generated",
            EventType::ActionProcessed => "action.processed",
            EventType::ActionApproved => "action.approved",
            EventType::ActionExecuted => "action.executed",
            EventType::ActionFailed => "action.failed",
            EventType::PlanCreated => "plan.created",
            EventType::PlanApproved => "plan.approved",
            EventType::PlanExecutionCompleted => "plan.execution_completed",
            EventType::EmailReceived => "email.received",
            EventType::ApprovalRequired => "approval.required",
            EventType::ApprovalGranted => "approval.granted",
            EventType::ApprovalDenied => "approval.denied",
            EventType::ServiceStarted => "service.started",
            EventType::ServiceStopped => "service.stopped",
            EventType::ServiceError => "service.error",
            EventType::HealthCheck => "health.check",
            EventType::HealthStatus => "health.status",
            EventType::SystemShutdown => "system.shutdown",
            EventType::SystemRestart => "system.restart",
            EventType::BusOverflow => "bus.overflow",
        }
    }
}

/// A message published on the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub event_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub payload: BTreeMap<String, serde_json::Value>,
}

impl Event {
    pub fn new(event_type: EventType, source: impl Into<String>) -> Self {
        Self {
            event_type,
            event_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            source: source.into(),
            correlation_id: None,
            payload: BTreeMap::new(),
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
