// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tempfile::tempdir;

fn step(kind: StepKind, params: BTreeMap<String, Value>) -> Step {
    Step {
        index: 0,
        kind,
        params,
        reversible: false,
        rollback_params: None,
    }
}

#[tokio::test]
async fn file_adapter_writes_then_compensates_by_deleting() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.txt");

    let mut params = BTreeMap::new();
    params.insert("op".to_string(), json!("write"));
    params.insert("path".to_string(), json!(path.display().to_string()));
    params.insert("content".to_string(), json!("hello"));

    let mut rollback = BTreeMap::new();
    rollback.insert("op".to_string(), json!("delete"));
    rollback.insert("path".to_string(), json!(path.display().to_string()));

    let mut s = step(StepKind::File, params);
    s.reversible = true;
    s.rollback_params = Some(rollback);

    let adapter = FileStepAdapter;
    let outcome = adapter.execute(&s).await.unwrap();
    assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "hello");

    adapter.compensate(&s, &outcome).await.unwrap();
    assert!(tokio::fs::metadata(&path).await.is_err());
}

#[tokio::test]
async fn file_adapter_missing_path_param_errors() {
    let adapter = FileStepAdapter;
    let s = step(StepKind::File, BTreeMap::new());
    let err = adapter.execute(&s).await.unwrap_err();
    assert!(matches!(err, StepAdapterError::MissingParam(_)));
}

#[tokio::test]
async fn script_adapter_runs_command_and_captures_stdout() {
    let mut params = BTreeMap::new();
    params.insert("command".to_string(), json!("echo"));
    params.insert("args".to_string(), json!(["hi"]));

    let adapter = ScriptStepAdapter;
    let outcome = adapter.execute(&step(StepKind::Script, params)).await.unwrap();
    assert_eq!(
        outcome.output.get("stdout").and_then(|v| v.as_str()).map(str::trim),
        Some("hi")
    );
}

#[tokio::test]
async fn script_adapter_is_never_reversible() {
    let adapter = ScriptStepAdapter;
    let s = step(StepKind::Script, BTreeMap::new());
    let err = adapter.compensate(&s, &StepOutcome::default()).await.unwrap_err();
    assert!(matches!(err, StepAdapterError::NotReversible(StepKind::Script)));
}

#[tokio::test]
async fn fake_adapter_records_calls_and_can_be_made_to_fail() {
    let adapter = FakeStepAdapter::new();
    let s = step(StepKind::Email, BTreeMap::new());

    adapter.execute(&s).await.unwrap();
    assert_eq!(adapter.calls().len(), 1);

    adapter.fail_next("smtp down");
    let err = adapter.execute(&s).await.unwrap_err();
    assert!(matches!(err, StepAdapterError::Failed(m) if m == "smtp down"));
}

#[test]
fn default_registry_routes_every_kind() {
    let registry = StepAdapterRegistry::with_defaults();
    assert!(registry.get(StepKind::File).is_some());
    assert!(registry.get(StepKind::Script).is_some());
    assert!(registry.get(StepKind::Email).is_some());
    assert!(registry.get(StepKind::Calendar).is_some());
    assert!(registry.get(StepKind::Api).is_some());
}
