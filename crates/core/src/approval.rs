// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Approval` entity and the risk/decision vocabulary shared with the
//! approval rule engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::ActionId;
use crate::define_id;
use crate::plan::PlanId;

define_id! {
    /// Unique identifier for an Approval record.
    pub struct ApprovalId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    AutoApprove,
    RequireApproval,
    AutoReject,
    Escalate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// A decision on whether a plan may proceed to execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub id: ApprovalId,
    pub action_id: ActionId,
    pub plan_id: PlanId,
    pub decision: ApprovalDecision,
    pub reason: String,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<String>,
    pub risk_level: RiskLevel,
    /// Advisory-only list of names copied from the matched rule's
    /// `approvers` field. No routing or notification is derived from this;
    /// see the open-question resolution in the design notes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advisory_approvers: Vec<String>,
}

impl Approval {
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    pub fn stem(&self) -> &str {
        self.id.as_str()
    }

    /// Render as the Markdown file format described in the external
    /// interfaces contract (front matter only, no body).
    pub fn to_markdown(&self) -> String {
        format!(
            "---\nid: {id}\naction_id: {action_id}\nplan_id: {plan_id}\ndecision: {decision}\nrisk_level: {risk}\nrequested_at: {requested_at}\nresolved_at: {resolved_at}\napprover: {approver}\nreason: {reason}\nadvisory_approvers: {advisory_approvers:?}\n---\n",
            id = self.id,
            action_id = self.action_id,
            plan_id = self.plan_id,
            decision = decision_str(self.decision),
            risk = risk_str(self.risk_level),
            requested_at = self.requested_at.to_rfc3339(),
            resolved_at = self
                .resolved_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "null".to_string()),
            approver = self.approver.clone().unwrap_or_else(|| "null".to_string()),
            reason = serde_yaml_scalar(&self.reason),
            advisory_approvers = self.advisory_approvers,
        )
    }

    /// Parse an approval back out of its Markdown-with-YAML-frontmatter
    /// form, the reverse of [`Approval::to_markdown`].
    pub fn from_markdown(content: &str) -> Result<Self, ApprovalParseError> {
        let rest = content
            .strip_prefix("---\n")
            .ok_or(ApprovalParseError::MissingFrontMatter)?;
        let end = rest.find("\n---").ok_or(ApprovalParseError::MissingFrontMatter)?;
        let front_matter = &rest[..end];
        Ok(serde_yaml::from_str(front_matter)?)
    }
}

/// YAML-quote a string so free-text reasons survive round-tripping even
/// when they contain colons or newlines.
fn serde_yaml_scalar(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ApprovalParseError {
    #[error("approval file is missing YAML front matter")]
    MissingFrontMatter,
    #[error("invalid approval front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn decision_str(d: ApprovalDecision) -> &'static str {
    match d {
        ApprovalDecision::AutoApprove => "auto_approve",
        ApprovalDecision::RequireApproval => "require_approval",
        ApprovalDecision::AutoReject => "auto_reject",
        ApprovalDecision::Escalate => "escalate",
    }
}

fn risk_str(r: RiskLevel) -> &'static str {
    match r {
        RiskLevel::Low => "low",
        RiskLevel::Medium => "medium",
        RiskLevel::High => "high",
        RiskLevel::Critical => "critical",
    }
}

#[cfg(test)]
#[path = "approval_tests.rs"]
mod tests;
