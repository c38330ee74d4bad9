// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;
use vaultflow_core::config::BusConfig;
use vaultflow_core::SequentialIdGen;

fn layout(root: &std::path::Path) -> VaultLayout {
    let layout = VaultLayout::new(root.to_path_buf());
    for dir in layout.all_dirs() {
        std::fs::create_dir_all(dir).unwrap();
    }
    layout
}

#[tokio::test]
async fn ingest_writes_action_file_and_archives_source() {
    let dir = tempdir().unwrap();
    let layout = layout(dir.path());
    let source = dir.path().join("inbox-raw.txt");
    std::fs::write(&source, "please reply to this email").unwrap();

    let bus = Arc::new(EventBus::new("test", &BusConfig::default()));
    let engine = IngestionEngine::new(layout.clone(), SequentialIdGen::new("stem"), bus, ArchiveConfig { retain_source: true });

    let outcome = engine.ingest(&source).await.unwrap();

    assert_eq!(outcome.action.action_type, ActionType::EmailResponse);
    assert!(outcome.action_path.exists());
    assert!(outcome.archived_path.is_some());
    assert!(outcome.archived_path.unwrap().exists());
    assert!(!source.exists());
}

#[tokio::test]
async fn ingest_without_retaining_source_deletes_it() {
    let dir = tempdir().unwrap();
    let layout = layout(dir.path());
    let source = dir.path().join("inbox-raw.txt");
    std::fs::write(&source, "routine note").unwrap();

    let bus = Arc::new(EventBus::new("test", &BusConfig::default()));
    let engine = IngestionEngine::new(layout, SequentialIdGen::new("stem"), bus, ArchiveConfig { retain_source: false });

    let outcome = engine.ingest(&source).await.unwrap();

    assert!(outcome.archived_path.is_none());
    assert!(!source.exists());
}

#[tokio::test]
async fn ingest_defaults_to_other_when_inference_fails() {
    let dir = tempdir().unwrap();
    let layout = layout(dir.path());
    let source = dir.path().join("inbox-raw.txt");
    std::fs::write(&source, "xyzzy plugh").unwrap();

    let bus = Arc::new(EventBus::new("test", &BusConfig::default()));
    let engine = IngestionEngine::new(layout, SequentialIdGen::new("stem"), bus, ArchiveConfig { retain_source: true });

    let outcome = engine.ingest(&source).await.unwrap();
    assert_eq!(outcome.action.action_type, ActionType::Other);
}

#[tokio::test]
async fn ingest_publishes_action_generated() {
    let dir = tempdir().unwrap();
    let layout = layout(dir.path());
    let source = dir.path().join("inbox-raw.txt");
    std::fs::write(&source, "note").unwrap();

    let bus = Arc::new(EventBus::new("test", &BusConfig::default()));
    let engine = IngestionEngine::new(layout, SequentialIdGen::new("stem"), bus.clone(), ArchiveConfig { retain_source: true });

    engine.ingest(&source).await.unwrap();

    let history = bus.history(0, 10);
    assert!(history.iter().any(|h| h.event.event_type == EventType::ActionGenerated));
}
