// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vaultflow-engine: the workflow transition engine, the approval rule
//! evaluator, the step-execution engine, and inbox ingestion — everything
//! that moves a file through the vault and decides what happens to it
//! along the way.

pub mod approval_rules;
pub mod bus;
pub mod execution;
pub mod ingestion;
pub mod lock;
pub mod retry;
pub mod transition;

pub use approval_rules::{default_rules, ApprovalEvaluation, ApprovalRule, ApprovalRuleSet, RiskContext};
pub use bus::{DispatchMode, EventBus, EventHandler, HistoryEntry, ShutdownReport};
pub use execution::{ExecutionEngine, ExecutionOutcome, StepResult};
pub use ingestion::{IngestionEngine, IngestionOutcome};
pub use lock::{Acquired, LockError, LockTable, StemGuard};
pub use retry::{backoff_delay, is_retry_exhausted};
pub use transition::{FileKind, TransitionEngine, TransitionOutcome, TransitionRequest};
