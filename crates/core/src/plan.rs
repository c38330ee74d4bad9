// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Plan` and `Step` entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::action::ActionId;
use crate::define_id;

define_id! {
    /// Unique identifier for a Plan.
    pub struct PlanId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Planned,
    PendingApproval,
    Approved,
    Executed,
    Rejected,
    Cancelled,
}

/// The kind of side effect a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Email,
    Calendar,
    File,
    Api,
    Script,
}

/// One step in a plan's ordered sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub index: u32,
    pub kind: StepKind,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
    pub reversible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_params: Option<BTreeMap<String, serde_json::Value>>,
}

/// A plan: the ordered sequence of steps that fulfils an Action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub action_id: ActionId,
    pub id: PlanId,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub estimated_duration_min: u32,
    pub steps: Vec<Step>,
    pub requires_approval: bool,
    pub correlation_id: String,
}

impl Plan {
    pub fn stem(&self) -> &str {
        self.id.as_str()
    }

    /// Render this plan as the Markdown-with-YAML-frontmatter file format
    /// described in the external interfaces contract.
    pub fn to_markdown(&self) -> Result<String, serde_yaml::Error> {
        let front_matter = serde_yaml::to_string(self)?;
        Ok(format!(
            "---\n{front_matter}---\n# Objectives\n\n# Steps\n\n# Resources\n\n# Success Criteria\n"
        ))
    }

    /// Parse a plan back out of its Markdown-with-YAML-frontmatter form.
    /// Body sections (Objectives/Steps/Resources/Success Criteria) are
    /// narrative-only and are not round-tripped; the front matter carries
    /// all structured state.
    pub fn from_markdown(content: &str) -> Result<Self, PlanParseError> {
        let rest = content
            .strip_prefix("---\n")
            .ok_or(PlanParseError::MissingFrontMatter)?;
        let end = rest.find("\n---").ok_or(PlanParseError::MissingFrontMatter)?;
        let front_matter = &rest[..end];
        Ok(serde_yaml::from_str(front_matter)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlanParseError {
    #[error("plan file is missing YAML front matter")]
    MissingFrontMatter,
    #[error("invalid plan front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
