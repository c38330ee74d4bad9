// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic, rule-of-thumb plan generator used when `vaultflow start`
//! is not given a model-backed adapter. Maps an action's declared type to
//! a single step of the matching kind; the real LLM-backed planner is an
//! external collaborator this crate does not implement.

use async_trait::async_trait;
use chrono::Utc;
use vaultflow_adapters::{PlanGeneratorAdapter, PlanGeneratorError};
use vaultflow_core::{Action, ActionType, Plan, PlanId, PlanStatus, Step, StepKind};

pub struct HeuristicPlanGenerator;

fn step_kind_for(action_type: ActionType) -> StepKind {
    match action_type {
        ActionType::EmailResponse | ActionType::FollowUp => StepKind::Email,
        ActionType::MeetingRequest => StepKind::Calendar,
        ActionType::DocumentCreation | ActionType::DataAnalysis | ActionType::ReportGeneration => {
            StepKind::File
        }
        ActionType::Other => StepKind::Script,
    }
}

#[async_trait]
impl PlanGeneratorAdapter for HeuristicPlanGenerator {
    async fn generate(&self, action: &Action) -> Result<Plan, PlanGeneratorError> {
        let now = Utc::now();
        let step = Step {
            index: 0,
            kind: step_kind_for(action.action_type),
            params: action.context.iter().map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone()))).collect(),
            reversible: false,
            rollback_params: None,
        };
        Ok(Plan {
            action_id: action.id.clone(),
            id: PlanId::new(action.stem().to_string()),
            status: PlanStatus::Planned,
            created_at: now,
            updated_at: now,
            estimated_duration_min: action.estimated_duration_min.unwrap_or(15),
            steps: vec![step],
            requires_approval: false,
            correlation_id: action.stem().to_string(),
        })
    }
}

#[cfg(test)]
#[path = "plan_generator_tests.rs"]
mod tests;
