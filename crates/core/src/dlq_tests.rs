use super::*;

#[test]
fn dlq_entry_serializes_source_state_as_screaming_snake_case() {
    let entry = DlqEntry {
        dlq_id: "d1".to_string(),
        original_path: "Needs_Action/stem.action.yaml".to_string(),
        source_state: WorkflowState::NeedsAction,
        error: "lock timeout".to_string(),
        attempts: 5,
        context: BTreeMap::new(),
        quarantined_at: Utc::now(),
    };

    let json = serde_json::to_string(&entry).unwrap();
    assert!(json.contains("\"source_state\":\"NEEDS_ACTION\""));
}
