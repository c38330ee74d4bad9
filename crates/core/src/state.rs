// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow states and the transition matrix.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vault::VaultFolder;

/// A workflow state. Each non-terminal state (other than the sub-states
/// that never persist a file of their own, see [`WorkflowState::folder`])
/// corresponds to one vault folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Inbox,
    NeedsAction,
    ActionProcessing,
    Plans,
    PendingApproval,
    ApprovalReview,
    Approved,
    Rejected,
    ExecutionPending,
    Executing,
    Executed,
    Done,
    Failed,
    Retry,
    DeadLetter,
    Archived,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl WorkflowState {
    /// Whether this state is terminal — no further transition is expected.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowState::Done | WorkflowState::Archived | WorkflowState::DeadLetter
        )
    }

    /// The vault folder a file in this state is expected to live in, if any.
    ///
    /// States that are purely in-flight bookkeeping (`ActionProcessing`,
    /// `ApprovalReview`, `ExecutionPending`, `Executing`, `Executed`, `Retry`)
    /// do not hold a distinct folder of their own: the file stays put while
    /// the engine processes it in one of these sub-states, and only a
    /// completed sub-state transition moves the file.
    pub fn folder(self) -> Option<VaultFolder> {
        match self {
            WorkflowState::Inbox => Some(VaultFolder::Inbox),
            WorkflowState::NeedsAction => Some(VaultFolder::NeedsAction),
            WorkflowState::Plans => Some(VaultFolder::Plans),
            WorkflowState::PendingApproval => Some(VaultFolder::PendingApproval),
            WorkflowState::Approved => Some(VaultFolder::Approved),
            WorkflowState::Done => Some(VaultFolder::Done),
            WorkflowState::Failed => Some(VaultFolder::Failed),
            WorkflowState::DeadLetter => Some(VaultFolder::DeadLetter),
            WorkflowState::Archived => Some(VaultFolder::Archived),
            WorkflowState::ActionProcessing
            | WorkflowState::ApprovalReview
            | WorkflowState::Rejected
            | WorkflowState::ExecutionPending
            | WorkflowState::Executing
            | WorkflowState::Executed
            | WorkflowState::Retry => None,
        }
    }

    /// Valid target states for this source state, per the transition matrix.
    pub fn valid_targets(self) -> &'static [WorkflowState] {
        use WorkflowState::*;
        match self {
            Inbox => &[NeedsAction, Failed],
            NeedsAction => &[ActionProcessing, Failed],
            ActionProcessing => &[Plans, Failed, Retry],
            Plans => &[PendingApproval, ExecutionPending, Failed],
            PendingApproval => &[ApprovalReview, Failed],
            ApprovalReview => &[Approved, Rejected, Failed],
            Approved => &[Executing, Failed],
            ExecutionPending => &[Executing, Failed],
            Executing => &[Executed, Failed, Retry],
            Executed => &[Done, Failed],
            Done => &[Archived],
            Rejected => &[Archived, DeadLetter],
            Failed => &[Retry, DeadLetter],
            // RETRY returns to whichever state the retried transition was
            // attempting to reach; the matrix allows any state as the
            // resumed target plus the dead-letter escape hatch, so callers
            // validate the resumed edge against the *original* source state.
            Retry => &[DeadLetter],
            DeadLetter => &[],
            Archived => &[],
        }
    }

    /// Whether `self -> target` is a valid edge in the matrix.
    pub fn can_transition_to(self, target: WorkflowState) -> bool {
        self.valid_targets().contains(&target)
    }

    /// Failure kinds that retry back into [`WorkflowState::Retry`] rather
    /// than going straight to [`WorkflowState::Failed`] or [`WorkflowState::DeadLetter`].
    pub fn is_retryable_source(self) -> bool {
        matches!(self, WorkflowState::ActionProcessing | WorkflowState::Executing)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
