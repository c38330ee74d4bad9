// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeMap;
use tempfile::tempdir;

fn append_sample(log: &AuditLog, seq_hint: &str) -> AuditEntry {
    log.append(
        Utc::now(),
        "transition.completed",
        "workflow-engine",
        "transition",
        "action",
        seq_hint,
        Some("corr-1".to_string()),
        BTreeMap::new(),
    )
    .unwrap()
}

#[test]
fn append_assigns_monotonic_seq_and_chains_hashes() {
    let dir = tempdir().unwrap();
    let log = AuditLog::open(dir.path().join("audit.jsonl")).unwrap();

    let e1 = append_sample(&log, "a1");
    let e2 = append_sample(&log, "a2");

    assert_eq!(e1.seq, 1);
    assert_eq!(e2.seq, 2);
    assert_ne!(e1.chain_hash, e2.chain_hash);

    let verification = log.verify_chain().unwrap();
    assert!(verification.valid, "{:?}", verification.issues);
    assert_eq!(verification.total_entries, 2);
}

#[test]
fn reopen_resumes_seq_and_chain_from_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");

    {
        let log = AuditLog::open(&path).unwrap();
        append_sample(&log, "a1");
    }

    let log = AuditLog::open(&path).unwrap();
    let e2 = append_sample(&log, "a2");
    assert_eq!(e2.seq, 2);

    let verification = log.verify_chain().unwrap();
    assert!(verification.valid);
    assert_eq!(verification.total_entries, 2);
}

#[test]
fn tampering_with_an_entry_is_detected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let log = AuditLog::open(&path).unwrap();
    append_sample(&log, "a1");
    append_sample(&log, "a2");

    let contents = std::fs::read_to_string(&path).unwrap();
    let tampered = contents.replace("a1", "a1-tampered");
    std::fs::write(&path, tampered).unwrap();

    let log = AuditLog::open(&path).unwrap();
    let verification = log.verify_chain().unwrap();
    assert!(!verification.valid);
    assert!(verification.invalid_entries > 0);
}

#[test]
fn query_filters_by_correlation_id_and_respects_limit() {
    let dir = tempdir().unwrap();
    let log = AuditLog::open(dir.path().join("audit.jsonl")).unwrap();
    append_sample(&log, "a1");
    append_sample(&log, "a2");
    log.append(
        Utc::now(),
        "transition.completed",
        "workflow-engine",
        "transition",
        "action",
        "other",
        Some("corr-2".to_string()),
        BTreeMap::new(),
    )
    .unwrap();

    let filter = AuditQuery {
        correlation_id: Some("corr-1".to_string()),
        ..Default::default()
    };
    let results = log.query(&filter, 10).unwrap();
    assert_eq!(results.len(), 2);

    let limited = log.query(&filter, 1).unwrap();
    assert_eq!(limited.len(), 1);
    // Most recent first.
    assert_eq!(limited[0].resource_id, "a2");
}

#[test]
fn export_then_import_detects_tamper() {
    let dir = tempdir().unwrap();
    let log = AuditLog::open(dir.path().join("audit.jsonl")).unwrap();
    append_sample(&log, "a1");
    append_sample(&log, "a2");

    let mut export = log.export().unwrap();
    let verification = import(&export).unwrap();
    assert!(verification.valid);

    export.entries[0].action = "tampered".to_string();
    let verification = import(&export).unwrap();
    assert!(!verification.valid);
}
