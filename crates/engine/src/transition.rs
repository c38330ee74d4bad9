// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workflow transition engine: validates edges against the state
//! matrix, performs the atomic copy-fsync-rename-unlink move, audits and
//! publishes the result, records it against the correlation tracker, and
//! drives retry-with-backoff into the dead-letter queue on exhaustion.

use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;
use vaultflow_core::config::{LockConfig, RetryConfig};
use vaultflow_core::vault::{action_file_name, approval_file_name, plan_file_name, source_file_name};
use vaultflow_core::{Event, EventType, VaultFolder, VaultLayout, WorkflowState};
use vaultflow_core::{EngineError, ErrorKind};
use vaultflow_storage::{AuditLog, CorrelationTracker, DlqStore, TransitionRecord};

use crate::bus::EventBus;
use crate::lock::{LockError, LockTable};
use crate::retry::{backoff_delay, is_retry_exhausted};

/// Which on-disk entity a transition is moving. The suffix is a property
/// of the entity, not of the workflow state, so it travels alongside the
/// request rather than being derived from `to_state`/`from_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Action,
    Plan,
    Approval,
    Source,
}

impl FileKind {
    fn file_name(self, stem: &str) -> String {
        match self {
            FileKind::Action => action_file_name(stem),
            FileKind::Plan => plan_file_name(stem),
            FileKind::Approval => approval_file_name(stem),
            FileKind::Source => source_file_name(stem),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            FileKind::Action => "action",
            FileKind::Plan => "plan",
            FileKind::Approval => "approval",
            FileKind::Source => "source",
        }
    }
}

/// A request to move `stem` from `from_state` to `to_state`. `from_state`
/// is always the *logical* source state the edge is validated against —
/// for a transition resumed out of `RETRY`, callers pass the original
/// source state here, not `WorkflowState::Retry` (see the note on
/// [`WorkflowState::valid_targets`]). `current_folder` is where the file
/// physically sits right now, which may differ from `from_state.folder()`
/// when `from_state` is an in-flight sub-state with no folder of its own.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub stem: String,
    pub kind: FileKind,
    pub current_folder: VaultFolder,
    pub from_state: WorkflowState,
    pub to_state: WorkflowState,
    pub correlation_id: String,
    pub action_id: Option<String>,
    pub plan_id: Option<String>,
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub success: bool,
    pub new_path: Option<PathBuf>,
    pub error: Option<String>,
    pub retryable: bool,
}

fn error_code(e: &EngineError) -> &'static str {
    match e.kind() {
        ErrorKind::InvalidTransition => "INVALID_TRANSITION",
        ErrorKind::FileNotFound => "FILE_NOT_FOUND",
        ErrorKind::TargetExists => "TARGET_EXISTS",
        ErrorKind::LockTimeout => "LOCK_TIMEOUT",
        ErrorKind::MoveFailed => "MOVE_FAILED",
        _ => "TRANSITION_FAILED",
    }
}

/// Folder-transition → event-type mapping from the external interfaces
/// contract. Returns `None` for transitions into in-flight sub-states,
/// which publish no event of their own.
fn event_for_target(to_state: WorkflowState) -> Option<EventType> {
    match to_state {
        WorkflowState::NeedsAction => Some(EventType::ActionGenerated),
        WorkflowState::Plans => Some(EventType::PlanCreated),
        WorkflowState::PendingApproval => Some(EventType::ApprovalRequired),
        WorkflowState::Approved => Some(EventType::ActionApproved),
        WorkflowState::Done => Some(EventType::PlanExecutionCompleted),
        WorkflowState::Failed => Some(EventType::ActionFailed),
        WorkflowState::DeadLetter => Some(EventType::ActionFailed),
        _ => None,
    }
}

fn tmp_path_for(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    target.with_file_name(name)
}

/// Copy `source` to `target + .tmp`, fsync the temp file, rename it into
/// place, then unlink `source`. Removes the temp file on any failure.
fn move_atomic(source: &Path, target: &Path) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path_for(target);
    let result = (|| -> std::io::Result<()> {
        std::fs::copy(source, &tmp)?;
        std::fs::File::open(&tmp)?.sync_all()?;
        std::fs::rename(&tmp, target)?;
        std::fs::remove_file(source)?;
        Ok(())
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

pub struct TransitionEngine {
    layout: VaultLayout,
    locks: LockTable,
    retry: RetryConfig,
    audit_log: Arc<AuditLog>,
    correlation: Arc<CorrelationTracker>,
    dlq: DlqStore,
    bus: Arc<EventBus>,
}

impl TransitionEngine {
    pub fn new(
        layout: VaultLayout,
        lock_config: LockConfig,
        retry: RetryConfig,
        audit_log: Arc<AuditLog>,
        correlation: Arc<CorrelationTracker>,
        bus: Arc<EventBus>,
    ) -> Self {
        let dlq = DlqStore::new(layout.clone());
        Self {
            locks: LockTable::new(layout.clone(), lock_config),
            layout,
            retry,
            audit_log,
            correlation,
            dlq,
            bus,
        }
    }

    fn source_path(&self, req: &TransitionRequest) -> PathBuf {
        self.layout.folder(req.current_folder).join(req.kind.file_name(&req.stem))
    }

    async fn try_transition(&self, req: &TransitionRequest) -> Result<PathBuf, EngineError> {
        if !req.from_state.can_transition_to(req.to_state) {
            return Err(EngineError::InvalidTransition {
                from: req.from_state,
                to: req.to_state,
            });
        }

        let source_path = self.source_path(req);

        let target_folder = match req.to_state.folder() {
            None => {
                if !source_path.exists() {
                    return Err(EngineError::FileNotFound { stem: req.stem.clone() });
                }
                return Ok(source_path);
            }
            Some(folder) => folder,
        };

        let target_path = self.layout.folder(target_folder).join(req.kind.file_name(&req.stem));

        if target_path == source_path {
            if !source_path.exists() {
                return Err(EngineError::FileNotFound { stem: req.stem.clone() });
            }
            return Ok(source_path);
        }

        if !source_path.exists() {
            return Err(EngineError::FileNotFound { stem: req.stem.clone() });
        }
        if target_path.exists() {
            return Err(EngineError::TargetExists { stem: req.stem.clone() });
        }

        let stem = req.stem.clone();
        let src = source_path.clone();
        let tgt = target_path.clone();
        tokio::task::spawn_blocking(move || move_atomic(&src, &tgt))
            .await
            .map_err(|e| EngineError::MoveFailed {
                stem: stem.clone(),
                cause: e.to_string(),
            })?
            .map_err(|e| EngineError::MoveFailed { stem, cause: e.to_string() })?;

        Ok(target_path)
    }

    fn audit(
        &self,
        req: &TransitionRequest,
        event_type: &str,
        actor: &str,
        action: &str,
        details: BTreeMap<String, Value>,
    ) {
        if let Err(e) = self.audit_log.append(
            Utc::now(),
            event_type,
            actor,
            action,
            req.kind.as_str(),
            req.stem.clone(),
            Some(req.correlation_id.clone()),
            details,
        ) {
            error!("failed to append audit entry: {e}");
        }
    }

    fn record(&self, req: &TransitionRequest, success: bool, error: Option<String>) {
        self.correlation.record_transition(
            &req.correlation_id,
            req.action_id.as_deref(),
            req.plan_id.as_deref(),
            TransitionRecord {
                from_state: req.from_state,
                to_state: req.to_state,
                at: Utc::now(),
                success,
                error,
            },
        );
    }

    /// Run the full algorithm once: acquire the stem lock, validate,
    /// move, audit, publish, record, release. Does not retry.
    pub async fn transition(&self, req: TransitionRequest) -> TransitionOutcome {
        let acquired = match self.locks.acquire(&req.stem).await {
            Ok(a) => a,
            Err(LockError::Timeout { timeout_ms, .. }) => {
                let mut details = BTreeMap::new();
                details.insert("timeout_ms".to_string(), Value::from(timeout_ms));
                self.audit(&req, "transition.failed", "workflow-engine", "lock", details);
                self.record(&req, false, Some("LOCK_TIMEOUT".to_string()));
                return TransitionOutcome {
                    success: false,
                    new_path: None,
                    error: Some("LOCK_TIMEOUT".to_string()),
                    retryable: true,
                };
            }
            Err(LockError::Io(e)) => {
                self.record(&req, false, Some(e.to_string()));
                return TransitionOutcome {
                    success: false,
                    new_path: None,
                    error: Some(e.to_string()),
                    retryable: false,
                };
            }
        };

        if acquired.claimed_stale {
            self.audit(&req, "lock.stale", "lock-table", "claim-stale-lock", BTreeMap::new());
        }

        let result = self.try_transition(&req).await;
        drop(acquired.guard);

        match result {
            Ok(path) => {
                let mut details = BTreeMap::new();
                details.insert("from_state".to_string(), Value::String(req.from_state.to_string()));
                details.insert("to_state".to_string(), Value::String(req.to_state.to_string()));
                self.audit(&req, "transition.completed", "workflow-engine", "transition", details);

                if let Some(event_type) = event_for_target(req.to_state) {
                    let mut event = Event::new(event_type, "workflow-engine")
                        .with_correlation_id(req.correlation_id.clone());
                    if req.to_state == WorkflowState::DeadLetter {
                        event = event.with_payload("terminal", Value::Bool(true));
                    }
                    self.bus.publish(event);
                }

                self.record(&req, true, None);
                TransitionOutcome {
                    success: true,
                    new_path: Some(path),
                    error: None,
                    retryable: false,
                }
            }
            Err(e) => {
                let code = error_code(&e);
                let event_type = if matches!(e, EngineError::InvalidTransition { .. }) {
                    "transition.invalid"
                } else {
                    "transition.failed"
                };
                let mut details = BTreeMap::new();
                details.insert("error".to_string(), Value::String(code.to_string()));
                self.audit(&req, event_type, "workflow-engine", "transition", details);
                self.record(&req, false, Some(code.to_string()));
                TransitionOutcome {
                    success: false,
                    new_path: None,
                    error: Some(code.to_string()),
                    retryable: e.is_retryable(),
                }
            }
        }
    }

    /// Like [`Self::transition`], but a no-op when `req.kind`'s file
    /// doesn't exist yet at `req.current_folder`. Plan and Approval
    /// sidecars are only created partway through a stem's lifecycle, so
    /// callers that move every file kind in lockstep with the action use
    /// this to skip a sidecar that hasn't been written yet.
    pub async fn transition_if_present(&self, req: TransitionRequest) -> Option<TransitionOutcome> {
        let path = self.source_path(&req);
        if !path.exists() {
            return None;
        }
        Some(self.transition(req).await)
    }

    /// Run [`Self::transition`], and on a retryable failure, sleep the
    /// backoff delay and try again (validating the original edge each
    /// time) until it succeeds, a non-retryable failure surfaces, or
    /// attempts are exhausted and the entry is admitted to the DLQ.
    pub async fn transition_with_retry(&self, req: TransitionRequest) -> TransitionOutcome {
        let mut attempts = 0u32;
        loop {
            let outcome = self.transition(req.clone()).await;
            if outcome.success || !outcome.retryable {
                return outcome;
            }

            attempts += 1;
            if is_retry_exhausted(attempts, &self.retry) {
                self.admit_dead_letter(&req, attempts, outcome.error.clone().unwrap_or_default())
                    .await;
                return TransitionOutcome {
                    success: false,
                    new_path: None,
                    error: Some("DEAD_LETTER".to_string()),
                    retryable: false,
                };
            }

            tokio::time::sleep(backoff_delay(attempts - 1, &self.retry)).await;
        }
    }

    async fn admit_dead_letter(&self, req: &TransitionRequest, attempts: u32, last_error: String) {
        let source_path = self.source_path(req);
        let now = Utc::now();
        match self.dlq.admit(
            &source_path,
            &req.stem,
            req.from_state,
            last_error.clone(),
            attempts,
            req.metadata.clone(),
            now,
        ) {
            Ok(_entry) => {
                let mut details = BTreeMap::new();
                details.insert("error".to_string(), Value::String(last_error));
                details.insert("attempts".to_string(), Value::from(attempts));
                self.audit(req, "dead_letter.admitted", "workflow-engine", "admit", details);

                let event = Event::new(EventType::ActionFailed, "workflow-engine")
                    .with_correlation_id(req.correlation_id.clone())
                    .with_payload("terminal", Value::Bool(true));
                self.bus.publish(event);

                self.record(req, false, Some("DEAD_LETTER".to_string()));
            }
            Err(e) => error!("failed to admit {} to dead letter queue: {e}", req.stem),
        }
    }

    pub fn correlation(&self) -> &CorrelationTracker {
        &self.correlation
    }

    pub fn dlq(&self) -> &DlqStore {
        &self.dlq
    }
}

#[cfg(test)]
#[path = "transition_tests.rs"]
mod tests;
