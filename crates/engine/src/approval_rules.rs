// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Risk-based approval routing. The active rule set lives behind an
//! `arc-swap` handle so a SIGHUP reload never exposes a partially-updated
//! list to a concurrent evaluation.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vaultflow_core::{ActionType, ApprovalDecision, Priority, RiskLevel};

/// One rule in the ordered list. `action_types: None` matches any type;
/// the other bounds are likewise absent (unbounded) when `None`.
///
/// `min_duration_min`/`max_risk_level` are not named in the external
/// interfaces contract's field list but are needed to express the
/// built-in rule set's ">120 minutes" and "risk = low" predicates
/// symmetrically with `max_duration_min`/`min_risk_level` — see the
/// design notes for this resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRule {
    pub rule_id: String,
    pub name: String,
    pub priority: i32,
    #[serde(default)]
    pub action_types: Option<Vec<ActionType>>,
    #[serde(default)]
    pub min_risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub max_risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub min_duration_min: Option<u32>,
    #[serde(default)]
    pub max_duration_min: Option<u32>,
    pub decision: ApprovalDecision,
    #[serde(default)]
    pub approvers: Vec<String>,
}

/// The inputs a rule is evaluated against.
#[derive(Debug, Clone)]
pub struct RiskContext {
    pub action_type: ActionType,
    pub priority: Priority,
    pub duration_min: Option<u32>,
    pub source_is_external: bool,
}

/// Bucketed score per the risk formula: action-type weight + duration
/// weight + priority weight + external-source weight.
pub fn risk_score(ctx: &RiskContext) -> u32 {
    let mut score = match ctx.action_type {
        ActionType::EmailResponse | ActionType::FollowUp => 1,
        ActionType::MeetingRequest => 2,
        ActionType::DocumentCreation => 3,
        ActionType::DataAnalysis | ActionType::ReportGeneration => 4,
        ActionType::Other => 1,
    };
    score += match ctx.duration_min.unwrap_or(0) {
        d if d > 180 => 3,
        d if d > 120 => 2,
        d if d > 60 => 1,
        _ => 0,
    };
    score += match ctx.priority {
        Priority::Critical => 3,
        Priority::High => 2,
        _ => 0,
    };
    if ctx.source_is_external {
        score += 1;
    }
    score
}

pub fn risk_level(score: u32) -> RiskLevel {
    match score {
        0..=3 => RiskLevel::Low,
        4..=5 => RiskLevel::Medium,
        6..=7 => RiskLevel::High,
        _ => RiskLevel::Critical,
    }
}

#[derive(Debug, Clone)]
pub struct ApprovalEvaluation {
    pub decision: ApprovalDecision,
    pub matched_rule_id: Option<String>,
    pub reason: String,
    pub risk_level: RiskLevel,
}

fn rule_matches(rule: &ApprovalRule, ctx: &RiskContext, level: RiskLevel) -> bool {
    if let Some(types) = &rule.action_types {
        if !types.contains(&ctx.action_type) {
            return false;
        }
    }
    if let Some(min) = rule.min_risk_level {
        if level < min {
            return false;
        }
    }
    if let Some(max) = rule.max_risk_level {
        if level > max {
            return false;
        }
    }
    let duration = ctx.duration_min.unwrap_or(0);
    if let Some(min) = rule.min_duration_min {
        if duration <= min {
            return false;
        }
    }
    if let Some(max) = rule.max_duration_min {
        if duration > max {
            return false;
        }
    }
    true
}

/// The built-in rule set, priority ascending (lower number evaluated
/// first; first match wins).
pub fn default_rules() -> Vec<ApprovalRule> {
    vec![
        ApprovalRule {
            rule_id: "critical-risk".to_string(),
            name: "critical risk escalates".to_string(),
            priority: 10,
            action_types: None,
            min_risk_level: Some(RiskLevel::Critical),
            max_risk_level: None,
            min_duration_min: None,
            max_duration_min: None,
            decision: ApprovalDecision::Escalate,
            approvers: Vec::new(),
        },
        ApprovalRule {
            rule_id: "high-risk".to_string(),
            name: "high risk requires approval".to_string(),
            priority: 20,
            action_types: None,
            min_risk_level: Some(RiskLevel::High),
            max_risk_level: None,
            min_duration_min: None,
            max_duration_min: None,
            decision: ApprovalDecision::RequireApproval,
            approvers: Vec::new(),
        },
        ApprovalRule {
            rule_id: "long-duration".to_string(),
            name: "long-running actions require approval".to_string(),
            priority: 30,
            action_types: None,
            min_risk_level: None,
            max_risk_level: None,
            min_duration_min: Some(120),
            max_duration_min: None,
            decision: ApprovalDecision::RequireApproval,
            approvers: Vec::new(),
        },
        ApprovalRule {
            rule_id: "analytical-type".to_string(),
            name: "analysis and reporting require approval".to_string(),
            priority: 40,
            action_types: Some(vec![ActionType::DataAnalysis, ActionType::ReportGeneration]),
            min_risk_level: None,
            max_risk_level: None,
            min_duration_min: None,
            max_duration_min: None,
            decision: ApprovalDecision::RequireApproval,
            approvers: Vec::new(),
        },
        ApprovalRule {
            rule_id: "quick-email".to_string(),
            name: "short email responses auto-approve".to_string(),
            priority: 50,
            action_types: Some(vec![ActionType::EmailResponse]),
            min_risk_level: None,
            max_risk_level: None,
            min_duration_min: None,
            max_duration_min: Some(29),
            decision: ApprovalDecision::AutoApprove,
            approvers: Vec::new(),
        },
        ApprovalRule {
            rule_id: "quick-followup".to_string(),
            name: "short low-risk follow-ups auto-approve".to_string(),
            priority: 60,
            action_types: Some(vec![ActionType::FollowUp]),
            min_risk_level: None,
            max_risk_level: Some(RiskLevel::Low),
            min_duration_min: None,
            max_duration_min: Some(29),
            decision: ApprovalDecision::AutoApprove,
            approvers: Vec::new(),
        },
    ]
}

/// The live, reloadable rule set.
pub struct ApprovalRuleSet {
    rules: ArcSwap<Vec<ApprovalRule>>,
}

impl ApprovalRuleSet {
    pub fn new(rules: Vec<ApprovalRule>) -> Self {
        Self { rules: ArcSwap::from_pointee(rules) }
    }

    /// Atomically replace the active rule list, e.g. on SIGHUP.
    pub fn reload(&self, rules: Vec<ApprovalRule>) {
        self.rules.store(Arc::new(rules));
    }

    pub fn evaluate(&self, ctx: &RiskContext) -> ApprovalEvaluation {
        let rules = self.rules.load();
        let score = risk_score(ctx);
        let level = risk_level(score);

        let mut ordered: Vec<&ApprovalRule> = rules.iter().collect();
        ordered.sort_by_key(|r| r.priority);

        for rule in ordered {
            if rule_matches(rule, ctx, level) {
                return ApprovalEvaluation {
                    decision: rule.decision,
                    matched_rule_id: Some(rule.rule_id.clone()),
                    reason: format!("matched rule {}", rule.name),
                    risk_level: level,
                };
            }
        }

        ApprovalEvaluation {
            decision: ApprovalDecision::RequireApproval,
            matched_rule_id: None,
            reason: "no rule matched; defaulting to require_approval".to_string(),
            risk_level: level,
        }
    }
}

impl Default for ApprovalRuleSet {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

#[cfg(test)]
#[path = "approval_rules_tests.rs"]
mod tests;
