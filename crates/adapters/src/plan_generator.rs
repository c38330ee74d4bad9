// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The LLM adapter that turns an [`Action`] into a [`Plan`]. The real
//! model-backed implementation is an external collaborator; this crate
//! carries only the trait and a scriptable fake for tests.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use vaultflow_core::{Action, Plan, PlanId, PlanStatus};

#[derive(Debug, Error)]
pub enum PlanGeneratorError {
    #[error("plan generation failed: {0}")]
    Failed(String),
    #[error("plan generation timed out after {0}ms")]
    Timeout(u64),
}

#[async_trait]
pub trait PlanGeneratorAdapter: Send + Sync {
    async fn generate(&self, action: &Action) -> Result<Plan, PlanGeneratorError>;
}

struct FakeState {
    calls: Vec<Action>,
    next_plan: Option<Plan>,
    fail_next: Option<String>,
}

/// Returns a scripted [`Plan`] (set via [`FakePlanGeneratorAdapter::queue_plan`])
/// or a minimal single-no-op-step plan otherwise, and records every
/// action it was asked to plan for.
#[derive(Clone)]
pub struct FakePlanGeneratorAdapter {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakePlanGeneratorAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                next_plan: None,
                fail_next: None,
            })),
        }
    }
}

impl FakePlanGeneratorAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Action> {
        self.inner.lock().calls.clone()
    }

    pub fn queue_plan(&self, plan: Plan) {
        self.inner.lock().next_plan = Some(plan);
    }

    pub fn fail_next(&self, message: impl Into<String>) {
        self.inner.lock().fail_next = Some(message.into());
    }
}

#[async_trait]
impl PlanGeneratorAdapter for FakePlanGeneratorAdapter {
    async fn generate(&self, action: &Action) -> Result<Plan, PlanGeneratorError> {
        let mut inner = self.inner.lock();
        inner.calls.push(action.clone());

        if let Some(message) = inner.fail_next.take() {
            return Err(PlanGeneratorError::Failed(message));
        }

        if let Some(plan) = inner.next_plan.take() {
            return Ok(plan);
        }

        let now = Utc::now();
        Ok(Plan {
            action_id: action.id.clone(),
            id: PlanId::new(format!("fake-plan-{}", action.id.as_str())),
            status: PlanStatus::Draft,
            created_at: now,
            updated_at: now,
            estimated_duration_min: action.estimated_duration_min.unwrap_or(0),
            steps: Vec::new(),
            requires_approval: true,
            correlation_id: action.id.as_str().to_string(),
        })
    }
}

#[cfg(test)]
#[path = "plan_generator_tests.rs"]
mod tests;
