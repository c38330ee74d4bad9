use super::*;

#[test]
fn terminal_states_are_exactly_three() {
    let terminal: Vec<WorkflowState> = [
        WorkflowState::Inbox,
        WorkflowState::NeedsAction,
        WorkflowState::ActionProcessing,
        WorkflowState::Plans,
        WorkflowState::PendingApproval,
        WorkflowState::ApprovalReview,
        WorkflowState::Approved,
        WorkflowState::Rejected,
        WorkflowState::ExecutionPending,
        WorkflowState::Executing,
        WorkflowState::Executed,
        WorkflowState::Done,
        WorkflowState::Failed,
        WorkflowState::Retry,
        WorkflowState::DeadLetter,
        WorkflowState::Archived,
    ]
    .into_iter()
    .filter(|s| s.is_terminal())
    .collect();

    assert_eq!(
        terminal,
        vec![WorkflowState::Done, WorkflowState::Archived, WorkflowState::DeadLetter]
    );
}

#[test]
fn matrix_matches_documented_edges() {
    assert!(WorkflowState::Inbox.can_transition_to(WorkflowState::NeedsAction));
    assert!(WorkflowState::Inbox.can_transition_to(WorkflowState::Failed));
    assert!(!WorkflowState::Inbox.can_transition_to(WorkflowState::Done));

    assert!(WorkflowState::Plans.can_transition_to(WorkflowState::PendingApproval));
    assert!(WorkflowState::Plans.can_transition_to(WorkflowState::ExecutionPending));
    assert!(!WorkflowState::Plans.can_transition_to(WorkflowState::Approved));

    assert!(WorkflowState::Done.can_transition_to(WorkflowState::Archived));
    assert!(!WorkflowState::Done.can_transition_to(WorkflowState::Failed));
}

#[test]
fn dead_letter_and_archived_have_no_outgoing_edges() {
    assert!(WorkflowState::DeadLetter.valid_targets().is_empty());
    assert!(WorkflowState::Archived.valid_targets().is_empty());
}

#[test]
fn only_action_processing_and_executing_retry_in_place() {
    assert!(WorkflowState::ActionProcessing.is_retryable_source());
    assert!(WorkflowState::Executing.is_retryable_source());
    assert!(!WorkflowState::Plans.is_retryable_source());
}

#[test]
fn folder_mapping_covers_every_persisted_state() {
    assert_eq!(WorkflowState::Inbox.folder(), Some(VaultFolder::Inbox));
    assert_eq!(WorkflowState::DeadLetter.folder(), Some(VaultFolder::DeadLetter));
    assert_eq!(WorkflowState::Executing.folder(), None);
}
