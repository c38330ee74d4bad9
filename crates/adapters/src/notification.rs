// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator-facing notification transport (e.g. the channel an
//! `approval.required` escalation alerts through). The real transport
//! is an external collaborator; this crate carries the trait plus a
//! silent no-op and a recording fake.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

#[async_trait]
pub trait NotificationAdapter: Send + Sync {
    async fn notify(&self, subject: &str, message: &str) -> Result<(), NotificationError>;
}

/// Discards every notification. Used when no transport is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpNotificationAdapter;

#[async_trait]
impl NotificationAdapter for NoOpNotificationAdapter {
    async fn notify(&self, _subject: &str, _message: &str) -> Result<(), NotificationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationCall {
    pub subject: String,
    pub message: String,
}

/// Records every notification for test assertions.
#[derive(Clone, Default)]
pub struct FakeNotificationAdapter {
    calls: Arc<Mutex<Vec<NotificationCall>>>,
}

impl FakeNotificationAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<NotificationCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl NotificationAdapter for FakeNotificationAdapter {
    async fn notify(&self, subject: &str, message: &str) -> Result<(), NotificationError> {
        self.calls.lock().push(NotificationCall {
            subject: subject.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
