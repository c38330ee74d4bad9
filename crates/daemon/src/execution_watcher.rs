// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator service that polls `Approved` (human-approved plans) and
//! `Plans` (auto-approved plans sitting in the `EXECUTION_PENDING`
//! sub-state) and drives each one through the execution engine to
//! `Done`, `Failed`, or `Dead_Letter`.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;
use vaultflow_core::vault::plan_file_name;
use vaultflow_core::{Plan, VaultFolder, VaultLayout, WorkflowState};
use vaultflow_engine::{ExecutionEngine, ExecutionOutcome, FileKind, TransitionEngine, TransitionRequest};

use crate::service::{HealthStatus, Service, ServiceError};

pub struct ExecutionWatcherService {
    layout: VaultLayout,
    execution: Arc<ExecutionEngine>,
    transitions: Arc<TransitionEngine>,
    poll_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
    last_poll_ms: Arc<AtomicI64>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl ExecutionWatcherService {
    pub fn new(
        layout: VaultLayout,
        execution: Arc<ExecutionEngine>,
        transitions: Arc<TransitionEngine>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            layout,
            execution,
            transitions,
            poll_interval,
            task: Mutex::new(None),
            last_poll_ms: Arc::new(AtomicI64::new(0)),
            last_error: Arc::new(Mutex::new(None)),
        }
    }
}

fn action_stem(path: &std::path::Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(".action.yaml").map(str::to_string)
}

fn load_plan(layout: &VaultLayout, folder: VaultFolder, stem: &str) -> Result<Plan, String> {
    let path = layout.folder(folder).join(plan_file_name(stem));
    let content = std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
    Plan::from_markdown(&content).map_err(|e| e.to_string())
}

/// Move the `.plan.md`/`.approval.md` sidecars along the same edge the
/// action file just took. The approval sidecar only exists for the
/// human-approved path, so [`TransitionEngine::transition_if_present`]
/// is a no-op when it's absent (the auto-approved path never wrote one).
async fn move_sidecars(
    transitions: &TransitionEngine,
    stem: &str,
    folder: &mut VaultFolder,
    from_state: WorkflowState,
    to_state: WorkflowState,
    correlation_id: &str,
) -> Result<(), String> {
    for kind in [FileKind::Plan, FileKind::Approval] {
        let outcome = transitions
            .transition_if_present(TransitionRequest {
                stem: stem.to_string(),
                kind,
                current_folder: *folder,
                from_state,
                to_state,
                correlation_id: correlation_id.to_string(),
                action_id: Some(stem.to_string()),
                plan_id: Some(stem.to_string()),
                metadata: Default::default(),
            })
            .await;
        if let Some(outcome) = outcome {
            if !outcome.success {
                return Err(outcome.error.unwrap_or_else(|| "sidecar move failed".to_string()));
            }
        }
    }
    if let Some(new_folder) = to_state.folder() {
        *folder = new_folder;
    }
    Ok(())
}

async fn process_one(
    layout: &VaultLayout,
    execution: &ExecutionEngine,
    transitions: &TransitionEngine,
    current_folder: VaultFolder,
    from_state: WorkflowState,
    stem: &str,
) -> Result<(), String> {
    let correlation_id = stem.to_string();
    let mut folder = current_folder;

    let to_executing = transitions
        .transition(TransitionRequest {
            stem: stem.to_string(),
            kind: FileKind::Action,
            current_folder,
            from_state,
            to_state: WorkflowState::Executing,
            correlation_id: correlation_id.clone(),
            action_id: Some(stem.to_string()),
            plan_id: Some(stem.to_string()),
            metadata: Default::default(),
        })
        .await;
    if !to_executing.success {
        return Err(to_executing.error.unwrap_or_else(|| "claim failed".to_string()));
    }
    move_sidecars(transitions, stem, &mut folder, from_state, WorkflowState::Executing, &correlation_id).await?;

    let plan = load_plan(layout, folder, stem)?;
    let outcome = execution.execute_plan(&plan, &correlation_id).await;

    match outcome {
        ExecutionOutcome::Done { .. } => {
            let to_executed = transitions
                .transition(TransitionRequest {
                    stem: stem.to_string(),
                    kind: FileKind::Action,
                    current_folder: folder,
                    from_state: WorkflowState::Executing,
                    to_state: WorkflowState::Executed,
                    correlation_id: correlation_id.clone(),
                    action_id: Some(stem.to_string()),
                    plan_id: Some(stem.to_string()),
                    metadata: Default::default(),
                })
                .await;
            if !to_executed.success {
                return Err(to_executed.error.unwrap_or_else(|| "executed move failed".to_string()));
            }
            move_sidecars(transitions, stem, &mut folder, WorkflowState::Executing, WorkflowState::Executed, &correlation_id).await?;

            let to_done = transitions
                .transition(TransitionRequest {
                    stem: stem.to_string(),
                    kind: FileKind::Action,
                    current_folder: folder,
                    from_state: WorkflowState::Executed,
                    to_state: WorkflowState::Done,
                    correlation_id: correlation_id.clone(),
                    action_id: Some(stem.to_string()),
                    plan_id: Some(stem.to_string()),
                    metadata: Default::default(),
                })
                .await;
            if !to_done.success {
                return Err(to_done.error.unwrap_or_else(|| "done move failed".to_string()));
            }
            move_sidecars(transitions, stem, &mut folder, WorkflowState::Executed, WorkflowState::Done, &correlation_id).await?;
            Ok(())
        }
        ExecutionOutcome::Failed { .. } | ExecutionOutcome::DeadLettered { .. } => {
            let to_failed = transitions
                .transition(TransitionRequest {
                    stem: stem.to_string(),
                    kind: FileKind::Action,
                    current_folder: folder,
                    from_state: WorkflowState::Executing,
                    to_state: WorkflowState::Failed,
                    correlation_id: correlation_id.clone(),
                    action_id: Some(stem.to_string()),
                    plan_id: Some(stem.to_string()),
                    metadata: Default::default(),
                })
                .await;
            if !to_failed.success {
                return Err(to_failed.error.unwrap_or_else(|| "failed move failed".to_string()));
            }
            move_sidecars(transitions, stem, &mut folder, WorkflowState::Executing, WorkflowState::Failed, &correlation_id).await?;

            if matches!(outcome, ExecutionOutcome::DeadLettered { .. }) {
                let to_dlq = transitions
                    .transition(TransitionRequest {
                        stem: stem.to_string(),
                        kind: FileKind::Action,
                        current_folder: folder,
                        from_state: WorkflowState::Failed,
                        to_state: WorkflowState::DeadLetter,
                        correlation_id: correlation_id.clone(),
                        action_id: Some(stem.to_string()),
                        plan_id: Some(stem.to_string()),
                        metadata: Default::default(),
                    })
                    .await;
                if !to_dlq.success {
                    return Err(to_dlq.error.unwrap_or_else(|| "dead-letter move failed".to_string()));
                }
                move_sidecars(transitions, stem, &mut folder, WorkflowState::Failed, WorkflowState::DeadLetter, &correlation_id).await?;
            }
            Ok(())
        }
    }
}

async fn sweep_folder(
    layout: &VaultLayout,
    execution: &ExecutionEngine,
    transitions: &TransitionEngine,
    folder: VaultFolder,
    from_state: WorkflowState,
    last_error: &Mutex<Option<String>>,
) {
    let dir = layout.folder(folder);
    let entries = match std::fs::read_dir(&dir) {
        Ok(e) => e,
        Err(e) => {
            *last_error.lock() = Some(e.to_string());
            return;
        }
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let Some(stem) = action_stem(&path) else { continue };
        if let Err(e) = process_one(layout, execution, transitions, folder, from_state, &stem).await {
            warn!(stem = %stem, error = %e, "execution failed");
            *last_error.lock() = Some(e);
        }
    }
}

#[async_trait]
impl Service for ExecutionWatcherService {
    fn name(&self) -> &str {
        "execution-watcher"
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let layout = self.layout.clone();
        let execution = self.execution.clone();
        let transitions = self.transitions.clone();
        let interval = self.poll_interval;
        let last_poll_ms = self.last_poll_ms.clone();
        let last_error = self.last_error.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                sweep_folder(
                    &layout,
                    execution.as_ref(),
                    transitions.as_ref(),
                    VaultFolder::Approved,
                    WorkflowState::Approved,
                    &last_error,
                )
                .await;
                sweep_folder(
                    &layout,
                    execution.as_ref(),
                    transitions.as_ref(),
                    VaultFolder::Plans,
                    WorkflowState::ExecutionPending,
                    &last_error,
                )
                .await;
                last_poll_ms.store(Utc::now().timestamp_millis(), Ordering::SeqCst);
            }
        });

        *self.task.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        if let Some(err) = self.last_error.lock().clone() {
            return HealthStatus::unhealthy(err);
        }
        let last = self.last_poll_ms.load(Ordering::SeqCst);
        if last == 0 {
            return HealthStatus::healthy();
        }
        let age_ms = Utc::now().timestamp_millis() - last;
        if age_ms > (self.poll_interval.as_millis() as i64) * 3 {
            return HealthStatus::unhealthy(format!("no poll in {age_ms}ms"));
        }
        HealthStatus::healthy()
    }
}

#[cfg(test)]
#[path = "execution_watcher_tests.rs"]
mod tests;
