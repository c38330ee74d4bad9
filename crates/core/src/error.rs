// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed error taxonomy shared across the workflow, approval, and
//! execution engines, the audit log, and the orchestrator. Every fault
//! that crosses a component boundary is translated into one of these
//! kinds before it escapes; raw OS errors never propagate past a
//! transition.

use thiserror::Error;

/// A kind from the closed taxonomy, independent of any particular
/// engine's error enum — used for audit `details.kind` and bus payloads
/// so the kind survives serialization even though the concrete error
/// type does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    InvalidTransition,
    FileNotFound,
    TargetExists,
    LockTimeout,
    LockStale,
    MoveFailed,
    SchemaInvalid,
    StepTimeout,
    StepFailed,
    RollbackFailed,
    BusOverflow,
    HealthTimeout,
    IntegrityBroken,
    CredentialMissing,
}

impl ErrorKind {
    /// Whether a fault of this kind should be retried automatically.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::LockTimeout | ErrorKind::MoveFailed)
    }
}

/// The engine-wide error type. Individual crates may wrap this (e.g. the
/// storage crate's audit log adds its own I/O variants) but the kinds
/// here are what crosses the transition boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: crate::state::WorkflowState,
        to: crate::state::WorkflowState,
    },
    #[error("source file not found for stem {stem}")]
    FileNotFound { stem: String },
    #[error("target already exists for stem {stem}")]
    TargetExists { stem: String },
    #[error("timed out acquiring lock for stem {stem} after {timeout_ms}ms")]
    LockTimeout { stem: String, timeout_ms: u64 },
    #[error("claimed stale lock for stem {stem}")]
    LockStale { stem: String },
    #[error("atomic move failed for stem {stem}: {cause}")]
    MoveFailed { stem: String, cause: String },
    #[error("schema invalid for {path}: {cause}")]
    SchemaInvalid { path: String, cause: String },
    #[error("step {index} timed out after {timeout_ms}ms")]
    StepTimeout { index: u32, timeout_ms: u64 },
    #[error("step {index} failed: {cause}")]
    StepFailed { index: u32, cause: String },
    #[error("rollback failed at step {index}: {cause}")]
    RollbackFailed { index: u32, cause: String },
    #[error("subscriber queue overflowed for {subscriber}")]
    BusOverflow { subscriber: String },
    #[error("health check for {service} exceeded {timeout_ms}ms")]
    HealthTimeout { service: String, timeout_ms: u64 },
    #[error("audit chain integrity broken at seq {first_invalid_seq}")]
    IntegrityBroken { first_invalid_seq: u64 },
    #[error("credential {name} is missing")]
    CredentialMissing { name: String },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            EngineError::FileNotFound { .. } => ErrorKind::FileNotFound,
            EngineError::TargetExists { .. } => ErrorKind::TargetExists,
            EngineError::LockTimeout { .. } => ErrorKind::LockTimeout,
            EngineError::LockStale { .. } => ErrorKind::LockStale,
            EngineError::MoveFailed { .. } => ErrorKind::MoveFailed,
            EngineError::SchemaInvalid { .. } => ErrorKind::SchemaInvalid,
            EngineError::StepTimeout { .. } => ErrorKind::StepTimeout,
            EngineError::StepFailed { .. } => ErrorKind::StepFailed,
            EngineError::RollbackFailed { .. } => ErrorKind::RollbackFailed,
            EngineError::BusOverflow { .. } => ErrorKind::BusOverflow,
            EngineError::HealthTimeout { .. } => ErrorKind::HealthTimeout,
            EngineError::IntegrityBroken { .. } => ErrorKind::IntegrityBroken,
            EngineError::CredentialMissing { .. } => ErrorKind::CredentialMissing,
        }
    }

    /// Whether a transition/step that failed with this error should be
    /// retried rather than surfaced immediately.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
