// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The execution engine: runs a plan's steps in order under one of three
//! modes, tracks a LIFO rollback stack of reversible steps, and applies
//! the configured rollback strategy when a step fails.

use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use vaultflow_adapters::step::{StepAdapterError, StepAdapterRegistry, StepOutcome};
use vaultflow_core::config::{ExecutionConfig, ExecutionMode, RollbackStrategy};
use vaultflow_core::{Plan, Step};
use vaultflow_storage::AuditLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    RolledBack,
}

/// The outcome of one step within a run, audited and surfaced to
/// operators regardless of mode.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub index: u32,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub rollback_token: Option<Value>,
}

/// What happened to a plan's run as a whole.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// Every step succeeded; the plan is ready to move `EXECUTED -> DONE`.
    Done { results: Vec<StepResult> },
    /// A step failed. `compensated` is true iff automatic rollback of
    /// every reversible step that had run also succeeded.
    Failed { results: Vec<StepResult>, compensated: bool },
    /// A step failed and rollback itself failed; the run must be
    /// quarantined to `Dead_Letter` rather than archived.
    DeadLettered { results: Vec<StepResult> },
}

pub struct ExecutionEngine {
    registry: StepAdapterRegistry,
    config: ExecutionConfig,
    audit_log: Arc<AuditLog>,
}

impl ExecutionEngine {
    pub fn new(registry: StepAdapterRegistry, config: ExecutionConfig, audit_log: Arc<AuditLog>) -> Self {
        Self { registry, config, audit_log }
    }

    /// Run every step of `plan` in order, stopping at the first failure
    /// and applying the configured rollback strategy.
    pub async fn execute_plan(&self, plan: &Plan, correlation_id: &str) -> ExecutionOutcome {
        let mut results = Vec::with_capacity(plan.steps.len());
        let mut rollback_stack: Vec<(Step, StepOutcome)> = Vec::new();
        let mut failed = false;

        for step in &plan.steps {
            let start = Instant::now();
            match self.run_step(step).await {
                Ok(outcome) => {
                    let duration_ms = start.elapsed().as_millis() as u64;
                    let token = step
                        .reversible
                        .then(|| serde_json::to_value(&outcome.output).unwrap_or(Value::Null));
                    results.push(StepResult {
                        index: step.index,
                        status: StepStatus::Succeeded,
                        duration_ms,
                        error: None,
                        rollback_token: token,
                    });
                    self.audit_step(correlation_id, "step.succeeded", step.index, None);
                    if step.reversible {
                        rollback_stack.push((step.clone(), outcome));
                    }
                }
                Err(e) => {
                    let duration_ms = start.elapsed().as_millis() as u64;
                    results.push(StepResult {
                        index: step.index,
                        status: StepStatus::Failed,
                        duration_ms,
                        error: Some(e.to_string()),
                        rollback_token: None,
                    });
                    self.audit_step(correlation_id, "step.failed", step.index, Some(e.to_string()));
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            self.audit_plan(correlation_id, "execution.completed", &plan.id.to_string(), results.len());
            return ExecutionOutcome::Done { results };
        }

        match self.config.rollback_strategy {
            RollbackStrategy::None => ExecutionOutcome::Failed { results, compensated: false },
            RollbackStrategy::Manual => ExecutionOutcome::Failed { results, compensated: false },
            RollbackStrategy::Automatic => {
                let compensated = self.rollback(correlation_id, &mut results, rollback_stack).await;
                if compensated {
                    ExecutionOutcome::Failed { results, compensated: true }
                } else {
                    ExecutionOutcome::DeadLettered { results }
                }
            }
        }
    }

    async fn run_step(&self, step: &Step) -> Result<StepOutcome, StepAdapterError> {
        let timeout = Duration::from_millis(self.config.step_timeout_ms);
        match tokio::time::timeout(timeout, self.dispatch(step)).await {
            Ok(result) => result,
            Err(_) => Err(StepAdapterError::Failed(format!(
                "step {} timed out after {}ms",
                step.index, self.config.step_timeout_ms
            ))),
        }
    }

    async fn dispatch(&self, step: &Step) -> Result<StepOutcome, StepAdapterError> {
        match self.config.mode {
            ExecutionMode::DryRun => {
                info!(step = step.index, kind = ?step.kind, "would execute");
                Ok(StepOutcome::default())
            }
            ExecutionMode::Simulated => {
                let ms = step
                    .params
                    .get("simulated_ms")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(100);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(StepOutcome::default())
            }
            ExecutionMode::Real => {
                let adapter = self.registry.get(step.kind).ok_or_else(|| {
                    StepAdapterError::Failed(format!("no adapter registered for {:?}", step.kind))
                })?;
                adapter.execute(step).await
            }
        }
    }

    /// Pop the rollback stack, invoking each step's compensation in
    /// reverse order. Non-reversible steps are logged and skipped rather
    /// than treated as failure; any genuine compensation failure marks
    /// the whole rollback unsuccessful.
    async fn rollback(
        &self,
        correlation_id: &str,
        results: &mut [StepResult],
        mut stack: Vec<(Step, StepOutcome)>,
    ) -> bool {
        if stack.is_empty() {
            return true;
        }
        let mut all_ok = true;
        while let Some((step, outcome)) = stack.pop() {
            let Some(adapter) = self.registry.get(step.kind) else {
                all_ok = false;
                continue;
            };
            match adapter.compensate(&step, &outcome).await {
                Ok(()) => {
                    if let Some(result) = results.iter_mut().find(|r| r.index == step.index) {
                        result.status = StepStatus::RolledBack;
                    }
                }
                Err(StepAdapterError::NotReversible(_)) => {
                    self.audit_step(correlation_id, "rollback.not_supported", step.index, None);
                }
                Err(e) => {
                    self.audit_step(correlation_id, "rollback.failed", step.index, Some(e.to_string()));
                    all_ok = false;
                }
            }
        }
        if all_ok {
            self.audit_rollback_completed(correlation_id);
        }
        all_ok
    }

    fn audit_step(&self, correlation_id: &str, event_type: &str, step_index: u32, error: Option<String>) {
        let mut details = BTreeMap::new();
        details.insert("step_index".to_string(), Value::from(step_index));
        if let Some(e) = error {
            details.insert("error".to_string(), Value::String(e));
        }
        self.append_audit(correlation_id, event_type, "step", step_index.to_string(), details);
    }

    fn audit_plan(&self, correlation_id: &str, event_type: &str, plan_id: &str, step_count: usize) {
        let mut details = BTreeMap::new();
        details.insert("step_count".to_string(), Value::from(step_count));
        self.append_audit(correlation_id, event_type, "plan", plan_id.to_string(), details);
    }

    fn audit_rollback_completed(&self, correlation_id: &str) {
        self.append_audit(correlation_id, "rollback.completed", "plan", correlation_id.to_string(), BTreeMap::new());
    }

    fn append_audit(&self, correlation_id: &str, event_type: &str, entity_type: &str, entity_id: String, details: BTreeMap<String, Value>) {
        if let Err(e) = self.audit_log.append(
            Utc::now(),
            event_type,
            "execution-engine",
            "execute",
            entity_type,
            entity_id,
            Some(correlation_id.to_string()),
            details,
        ) {
            tracing::error!("failed to append audit entry: {e}");
        }
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
