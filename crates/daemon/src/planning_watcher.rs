// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator service that polls `Needs_Action`, turns each action into
//! a plan via the planning adapter, routes the result through the
//! approval rule set, and drives the corresponding workflow transition.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;
use vaultflow_adapters::PlanGeneratorAdapter;
use vaultflow_core::vault::{approval_file_name, plan_file_name};
use vaultflow_core::{
    Action, Approval, ApprovalDecision, ApprovalId, PlanId, VaultFolder, VaultLayout, WorkflowState,
};
use vaultflow_engine::{ApprovalRuleSet, FileKind, RiskContext, TransitionEngine, TransitionRequest};

use crate::service::{HealthStatus, Service, ServiceError};

pub struct PlanningWatcherService<P: PlanGeneratorAdapter + 'static> {
    layout: VaultLayout,
    generator: Arc<P>,
    transitions: Arc<TransitionEngine>,
    rules: Arc<ApprovalRuleSet>,
    poll_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
    last_poll_ms: Arc<AtomicI64>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl<P: PlanGeneratorAdapter + 'static> PlanningWatcherService<P> {
    pub fn new(
        layout: VaultLayout,
        generator: Arc<P>,
        transitions: Arc<TransitionEngine>,
        rules: Arc<ApprovalRuleSet>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            layout,
            generator,
            transitions,
            rules,
            poll_interval,
            task: Mutex::new(None),
            last_poll_ms: Arc::new(AtomicI64::new(0)),
            last_error: Arc::new(Mutex::new(None)),
        }
    }
}

/// Turn one action file into a plan, route it past the approval rules,
/// and drive every resulting transition. Errors are logged by the caller;
/// this only returns one so the poll loop can record it for health.
async fn process_one<P: PlanGeneratorAdapter>(
    layout: &VaultLayout,
    generator: &P,
    transitions: &TransitionEngine,
    rules: &ApprovalRuleSet,
    action_path: &std::path::Path,
) -> Result<(), String> {
    let raw = tokio::fs::read_to_string(action_path).await.map_err(|e| e.to_string())?;
    let action: Action = serde_yaml::from_str(&raw).map_err(|e| e.to_string())?;
    let stem = action.stem().to_string();
    let correlation_id = stem.clone();

    let to_processing = transitions
        .transition(TransitionRequest {
            stem: stem.clone(),
            kind: FileKind::Action,
            current_folder: VaultFolder::NeedsAction,
            from_state: WorkflowState::NeedsAction,
            to_state: WorkflowState::ActionProcessing,
            correlation_id: correlation_id.clone(),
            action_id: Some(stem.clone()),
            plan_id: None,
            metadata: Default::default(),
        })
        .await;
    if !to_processing.success {
        return Err(to_processing.error.unwrap_or_else(|| "claim failed".to_string()));
    }

    let mut plan = match generator.generate(&action).await {
        Ok(plan) => plan,
        Err(e) => {
            transitions
                .transition_with_retry(TransitionRequest {
                    stem: stem.clone(),
                    kind: FileKind::Action,
                    current_folder: VaultFolder::NeedsAction,
                    from_state: WorkflowState::ActionProcessing,
                    to_state: WorkflowState::Failed,
                    correlation_id: correlation_id.clone(),
                    action_id: Some(stem.clone()),
                    plan_id: None,
                    metadata: Default::default(),
                })
                .await;
            return Err(e.to_string());
        }
    };
    plan.id = PlanId::new(stem.clone());

    let plan_path = layout.folder(VaultFolder::Plans).join(plan_file_name(&stem));
    let plan_body = plan.to_markdown().map_err(|e| e.to_string())?;
    write_atomic(&plan_path, &plan_body).await.map_err(|e| e.to_string())?;

    let to_plans = transitions
        .transition(TransitionRequest {
            stem: stem.clone(),
            kind: FileKind::Action,
            current_folder: VaultFolder::NeedsAction,
            from_state: WorkflowState::ActionProcessing,
            to_state: WorkflowState::Plans,
            correlation_id: correlation_id.clone(),
            action_id: Some(stem.clone()),
            plan_id: Some(stem.clone()),
            metadata: Default::default(),
        })
        .await;
    if !to_plans.success {
        return Err(to_plans.error.unwrap_or_else(|| "plans move failed".to_string()));
    }
    // The plan file was just written straight into `Plans/`, so it is
    // already where this edge's target folder puts it; track its
    // physical folder from here on as it moves in lockstep with the
    // action.
    let mut plan_folder = VaultFolder::Plans;

    let ctx = RiskContext {
        action_type: action.action_type,
        priority: action.priority,
        duration_min: plan.estimated_duration_min.max(action.estimated_duration_min.unwrap_or(0)).into(),
        // Action carries no explicit external-origin flag; every ingested
        // source is treated as internal until one is added.
        source_is_external: false,
    };
    let eval = rules.evaluate(&ctx);

    match eval.decision {
        ApprovalDecision::AutoApprove => {
            let outcome = transitions
                .transition(TransitionRequest {
                    stem: stem.clone(),
                    kind: FileKind::Action,
                    current_folder: VaultFolder::Plans,
                    from_state: WorkflowState::Plans,
                    to_state: WorkflowState::ExecutionPending,
                    correlation_id: correlation_id.clone(),
                    action_id: Some(stem.clone()),
                    plan_id: Some(stem.clone()),
                    metadata: Default::default(),
                })
                .await;
            if !outcome.success {
                return Err(outcome.error.unwrap_or_else(|| "execution-pending move failed".to_string()));
            }
            move_plan(transitions, &stem, &mut plan_folder, WorkflowState::Plans, WorkflowState::ExecutionPending, &correlation_id).await?;
            Ok(())
        }
        ApprovalDecision::RequireApproval | ApprovalDecision::Escalate => {
            write_approval(layout, &stem, &action, eval.decision, eval.risk_level, &eval.reason, None).await?;
            let outcome = transitions
                .transition(TransitionRequest {
                    stem: stem.clone(),
                    kind: FileKind::Action,
                    current_folder: VaultFolder::Plans,
                    from_state: WorkflowState::Plans,
                    to_state: WorkflowState::PendingApproval,
                    correlation_id: correlation_id.clone(),
                    action_id: Some(stem.clone()),
                    plan_id: Some(stem.clone()),
                    metadata: Default::default(),
                })
                .await;
            if !outcome.success {
                return Err(outcome.error.unwrap_or_else(|| "pending-approval move failed".to_string()));
            }
            move_plan(transitions, &stem, &mut plan_folder, WorkflowState::Plans, WorkflowState::PendingApproval, &correlation_id).await?;
            Ok(())
        }
        ApprovalDecision::AutoReject => {
            write_approval(layout, &stem, &action, eval.decision, eval.risk_level, &eval.reason, Some("auto-reject")).await?;
            let mut approval_folder = VaultFolder::PendingApproval;
            let to_pending = transitions
                .transition(TransitionRequest {
                    stem: stem.clone(),
                    kind: FileKind::Action,
                    current_folder: VaultFolder::Plans,
                    from_state: WorkflowState::Plans,
                    to_state: WorkflowState::PendingApproval,
                    correlation_id: correlation_id.clone(),
                    action_id: Some(stem.clone()),
                    plan_id: Some(stem.clone()),
                    metadata: Default::default(),
                })
                .await;
            if !to_pending.success {
                return Err(to_pending.error.unwrap_or_else(|| "pending-approval move failed".to_string()));
            }
            move_plan(transitions, &stem, &mut plan_folder, WorkflowState::Plans, WorkflowState::PendingApproval, &correlation_id).await?;

            let to_review = transitions
                .transition(TransitionRequest {
                    stem: stem.clone(),
                    kind: FileKind::Action,
                    current_folder: VaultFolder::PendingApproval,
                    from_state: WorkflowState::PendingApproval,
                    to_state: WorkflowState::ApprovalReview,
                    correlation_id: correlation_id.clone(),
                    action_id: Some(stem.clone()),
                    plan_id: Some(stem.clone()),
                    metadata: Default::default(),
                })
                .await;
            if !to_review.success {
                return Err(to_review.error.unwrap_or_else(|| "approval-review move failed".to_string()));
            }
            move_plan(transitions, &stem, &mut plan_folder, WorkflowState::PendingApproval, WorkflowState::ApprovalReview, &correlation_id).await?;
            move_approval(transitions, &stem, &mut approval_folder, WorkflowState::PendingApproval, WorkflowState::ApprovalReview, &correlation_id).await?;

            let to_rejected = transitions
                .transition(TransitionRequest {
                    stem: stem.clone(),
                    kind: FileKind::Action,
                    current_folder: VaultFolder::PendingApproval,
                    from_state: WorkflowState::ApprovalReview,
                    to_state: WorkflowState::Rejected,
                    correlation_id: correlation_id.clone(),
                    action_id: Some(stem.clone()),
                    plan_id: Some(stem.clone()),
                    metadata: Default::default(),
                })
                .await;
            if !to_rejected.success {
                return Err(to_rejected.error.unwrap_or_else(|| "rejected move failed".to_string()));
            }
            move_plan(transitions, &stem, &mut plan_folder, WorkflowState::ApprovalReview, WorkflowState::Rejected, &correlation_id).await?;
            move_approval(transitions, &stem, &mut approval_folder, WorkflowState::ApprovalReview, WorkflowState::Rejected, &correlation_id).await?;

            let to_archived = transitions
                .transition(TransitionRequest {
                    stem: stem.clone(),
                    kind: FileKind::Action,
                    current_folder: VaultFolder::PendingApproval,
                    from_state: WorkflowState::Rejected,
                    to_state: WorkflowState::Archived,
                    correlation_id: correlation_id.clone(),
                    action_id: Some(stem.clone()),
                    plan_id: Some(stem.clone()),
                    metadata: Default::default(),
                })
                .await;
            if !to_archived.success {
                return Err(to_archived.error.unwrap_or_else(|| "archive move failed".to_string()));
            }
            move_plan(transitions, &stem, &mut plan_folder, WorkflowState::Rejected, WorkflowState::Archived, &correlation_id).await?;
            move_approval(transitions, &stem, &mut approval_folder, WorkflowState::Rejected, WorkflowState::Archived, &correlation_id).await?;
            Ok(())
        }
    }
}

/// Move the `.plan.md` sidecar along the same edge the action file just
/// took, updating `plan_folder` to the edge's physical destination.
async fn move_plan(
    transitions: &TransitionEngine,
    stem: &str,
    plan_folder: &mut VaultFolder,
    from_state: WorkflowState,
    to_state: WorkflowState,
    correlation_id: &str,
) -> Result<(), String> {
    let outcome = transitions
        .transition_if_present(TransitionRequest {
            stem: stem.to_string(),
            kind: FileKind::Plan,
            current_folder: *plan_folder,
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
            return Err(outcome.error.unwrap_or_else(|| "plan move failed".to_string()));
        }
        if let Some(folder) = to_state.folder() {
            *plan_folder = folder;
        }
    }
    Ok(())
}

/// Move the `.approval.md` sidecar along the same edge the action file
/// just took, updating `approval_folder` to the edge's physical
/// destination.
async fn move_approval(
    transitions: &TransitionEngine,
    stem: &str,
    approval_folder: &mut VaultFolder,
    from_state: WorkflowState,
    to_state: WorkflowState,
    correlation_id: &str,
) -> Result<(), String> {
    let outcome = transitions
        .transition_if_present(TransitionRequest {
            stem: stem.to_string(),
            kind: FileKind::Approval,
            current_folder: *approval_folder,
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
            return Err(outcome.error.unwrap_or_else(|| "approval move failed".to_string()));
        }
        if let Some(folder) = to_state.folder() {
            *approval_folder = folder;
        }
    }
    Ok(())
}

async fn write_approval(
    layout: &VaultLayout,
    stem: &str,
    action: &Action,
    decision: ApprovalDecision,
    risk_level: vaultflow_core::RiskLevel,
    reason: &str,
    resolved_by: Option<&str>,
) -> Result<(), String> {
    let now = Utc::now();
    let approval = Approval {
        id: ApprovalId::new(stem.to_string()),
        action_id: action.id.clone(),
        plan_id: PlanId::new(stem.to_string()),
        decision,
        reason: reason.to_string(),
        requested_at: now,
        resolved_at: resolved_by.map(|_| now),
        approver: resolved_by.map(|s| s.to_string()),
        risk_level,
        advisory_approvers: Vec::new(),
    };
    let path = layout.folder(VaultFolder::PendingApproval).join(approval_file_name(stem));
    write_atomic(&path, &approval.to_markdown()).await.map_err(|e| e.to_string())
}

async fn write_atomic(path: &std::path::Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    let tmp = path.with_file_name(name);
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::File::open(&tmp).await?.sync_all().await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl<P: PlanGeneratorAdapter + 'static> Service for PlanningWatcherService<P> {
    fn name(&self) -> &str {
        "planning-watcher"
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let layout = self.layout.clone();
        let generator = self.generator.clone();
        let transitions = self.transitions.clone();
        let rules = self.rules.clone();
        let interval = self.poll_interval;
        let last_poll_ms = self.last_poll_ms.clone();
        let last_error = self.last_error.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let dir = layout.folder(VaultFolder::NeedsAction);
                let entries = match std::fs::read_dir(&dir) {
                    Ok(e) => e,
                    Err(e) => {
                        *last_error.lock() = Some(e.to_string());
                        continue;
                    }
                };
                for entry in entries.filter_map(Result::ok) {
                    let path = entry.path();
                    if !path.is_file() || path.extension().is_some_and(|e| e == "tmp") {
                        continue;
                    }
                    if let Err(e) = process_one(&layout, generator.as_ref(), &transitions, &rules, &path).await {
                        warn!(path = %path.display(), error = %e, "planning failed");
                        *last_error.lock() = Some(e);
                    }
                }
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
#[path = "planning_watcher_tests.rs"]
mod tests;
