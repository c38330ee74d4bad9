// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tempfile::tempdir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Sample {
    seq: u64,
    label: String,
}

#[test]
fn save_and_load_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.json");

    let value = Sample {
        seq: 42,
        label: "hello".to_string(),
    };
    save_json(&path, &value).unwrap();
    assert!(path.exists());

    let loaded: Sample = load_json(&path).unwrap().unwrap();
    assert_eq!(loaded, value);
}

#[test]
fn load_nonexistent_returns_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.json");

    let result: Option<Sample> = load_json(&path).unwrap();
    assert!(result.is_none());
}

#[test]
fn save_leaves_no_tmp_file_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.json");
    let tmp_path = path.with_extension("tmp");

    save_json(&path, &Sample { seq: 1, label: "x".to_string() }).unwrap();

    assert!(!tmp_path.exists());
    assert!(path.exists());
}

#[test]
fn corrupt_file_quarantined_and_load_returns_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.json");

    let mut f = File::create(&path).unwrap();
    f.write_all(b"\xe5\x03\x01binary-garbage").unwrap();
    drop(f);

    let result: Option<Sample> = load_json(&path).unwrap();
    assert!(result.is_none());
    assert!(!path.exists());

    let bak = path.with_extension("bak");
    assert!(bak.exists());
}

#[test]
fn corrupt_files_rotate_bak_chain() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.json");

    for i in 1..=4u8 {
        let mut f = File::create(&path).unwrap();
        f.write_all(&[i; 4]).unwrap();
        drop(f);

        let result: Option<Sample> = load_json(&path).unwrap();
        assert!(result.is_none());
    }

    let bak1 = path.with_extension("bak");
    assert_eq!(fs::read(&bak1).unwrap(), vec![4u8; 4]);

    let bak2 = path.with_extension("bak.2");
    assert_eq!(fs::read(&bak2).unwrap(), vec![3u8; 4]);

    let bak3 = path.with_extension("bak.3");
    assert_eq!(fs::read(&bak3).unwrap(), vec![2u8; 4]);

    let bak4 = path.with_extension("bak.4");
    assert!(!bak4.exists());
}
