// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;
use vaultflow_core::config::LockConfig;

fn table(dir: &std::path::Path, timeout_ms: u64, stale_ms: u64) -> LockTable {
    LockTable::new(
        VaultLayout::new(dir.to_path_buf()),
        LockConfig { timeout_ms, stale_ms },
    )
}

#[tokio::test]
async fn acquire_and_release_round_trips() {
    let dir = tempdir().unwrap();
    let table = table(dir.path(), 500, 300_000);

    let acquired = table.acquire("stem-1").await.unwrap();
    assert!(!acquired.claimed_stale);
    assert!(dir.path().join(".locks").join("stem-1.lock").exists());
    drop(acquired);
    assert!(!dir.path().join(".locks").join("stem-1.lock").exists());
}

#[tokio::test]
async fn second_acquire_times_out_while_first_is_held() {
    let dir = tempdir().unwrap();
    let table = Arc::new(table(dir.path(), 100, 300_000));

    let _first = table.acquire("stem-1").await.unwrap();
    let err = table.acquire("stem-1").await.unwrap_err();
    assert!(matches!(err, LockError::Timeout { .. }));
}

#[tokio::test]
async fn stale_lock_file_is_reclaimed() {
    let dir = tempdir().unwrap();
    let locks_dir = dir.path().join(".locks");
    std::fs::create_dir_all(&locks_dir).unwrap();
    let lock_path = locks_dir.join("stem-1.lock");
    std::fs::write(&lock_path, "99999").unwrap();

    // Backdate the file so it's older than the stale threshold.
    let old = std::time::SystemTime::now() - Duration::from_secs(600);
    let file = std::fs::OpenOptions::new().write(true).open(&lock_path).unwrap();
    file.set_modified(old).unwrap();

    let table = table(dir.path(), 500, 1_000);
    let acquired = table.acquire("stem-1").await.unwrap();
    assert!(acquired.claimed_stale);
}

#[tokio::test]
async fn distinct_stems_do_not_contend() {
    let dir = tempdir().unwrap();
    let table = table(dir.path(), 500, 300_000);

    let a = table.acquire("stem-a").await.unwrap();
    let b = table.acquire("stem-b").await.unwrap();
    drop(a);
    drop(b);
}
