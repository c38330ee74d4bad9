// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Persistence layer: the hash-chained audit log, the correlation
//! tracker's on-disk snapshot, dead-letter-queue storage, and the
//! generic atomic-JSON primitive they're all built on.

pub mod audit_log;
pub mod correlation;
pub mod dlq_store;
pub mod snapshot;

pub use audit_log::{import, AuditExport, AuditLog, AuditLogError, AuditQuery, ChainVerification};
pub use correlation::{CorrelationTracker, TransitionRecord, WorkflowContext};
pub use dlq_store::{DlqError, DlqStore};
pub use snapshot::{load_json, save_json, SnapshotError};
