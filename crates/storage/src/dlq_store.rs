// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dead-letter queue storage: admission, listing, retry, and purge.
//!
//! A quarantined file is copied into `Dead_Letter/<timestamp>_<stem>`
//! alongside a sibling `.meta.json` carrying a [`vaultflow_core::DlqEntry`].
//! The pair is the unit of storage; retry and purge always act on both
//! halves together.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vaultflow_core::{DlqEntry, VaultFolder, VaultLayout, WorkflowState};

use crate::snapshot::{load_json, save_json, SnapshotError};

#[derive(Debug, Error)]
pub enum DlqError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("dead-letter entry not found: {0}")]
    NotFound(String),
}

pub struct DlqStore {
    layout: VaultLayout,
}

fn meta_path_for(quarantined_path: &Path) -> PathBuf {
    quarantined_path.with_extension("meta.json")
}

impl DlqStore {
    pub fn new(layout: VaultLayout) -> Self {
        Self { layout }
    }

    /// Copy `source` into `Dead_Letter/<timestamp>_<stem>`, write its
    /// metadata sidecar, and remove the original. Returns the written
    /// [`DlqEntry`].
    pub fn admit(
        &self,
        source: &Path,
        stem: &str,
        source_state: WorkflowState,
        error: impl Into<String>,
        attempts: u32,
        context: BTreeMap<String, serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Result<DlqEntry, DlqError> {
        let dead_letter_dir = self.layout.folder(VaultFolder::DeadLetter);
        fs::create_dir_all(&dead_letter_dir)?;

        let dlq_id = format!("{}_{}", now.format("%Y%m%d-%H%M%S"), stem);
        let quarantined_path = dead_letter_dir.join(&dlq_id);

        fs::copy(source, &quarantined_path)?;
        fs::remove_file(source)?;

        let entry = DlqEntry {
            dlq_id: dlq_id.clone(),
            original_path: source.display().to_string(),
            source_state,
            error: error.into(),
            attempts,
            context,
            quarantined_at: now,
        };
        save_json(&meta_path_for(&quarantined_path), &entry)?;

        Ok(entry)
    }

    /// List every quarantined entry, most recently quarantined first.
    pub fn list(&self) -> Result<Vec<DlqEntry>, DlqError> {
        let dead_letter_dir = self.layout.folder(VaultFolder::DeadLetter);
        if !dead_letter_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&dead_letter_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json")
                && path.to_string_lossy().ends_with(".meta.json")
            {
                if let Some(dlq_entry) = load_json(&path)? {
                    entries.push(dlq_entry);
                }
            }
        }
        entries.sort_by(|a: &DlqEntry, b: &DlqEntry| b.quarantined_at.cmp(&a.quarantined_at));
        Ok(entries)
    }

    /// Move the quarantined file back to its recorded source folder and
    /// remove the DLQ pair. The caller is responsible for re-validating
    /// the transition; this only restores the bytes.
    pub fn retry(&self, dlq_id: &str) -> Result<PathBuf, DlqError> {
        let dead_letter_dir = self.layout.folder(VaultFolder::DeadLetter);
        let quarantined_path = dead_letter_dir.join(dlq_id);
        let meta_path = meta_path_for(&quarantined_path);

        let entry: DlqEntry = load_json(&meta_path)?
            .ok_or_else(|| DlqError::NotFound(dlq_id.to_string()))?;

        let restore_path = match entry.source_state.folder() {
            Some(folder) => self.layout.folder(folder).join(
                PathBuf::from(&entry.original_path)
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(dlq_id)),
            ),
            None => PathBuf::from(&entry.original_path),
        };

        if let Some(parent) = restore_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&quarantined_path, &restore_path)?;
        fs::remove_file(&meta_path)?;

        Ok(restore_path)
    }

    /// Permanently delete DLQ pairs quarantined more than `max_age_days`
    /// ago. Returns the number of pairs purged.
    pub fn purge_older_than(&self, max_age_days: i64, now: DateTime<Utc>) -> Result<usize, DlqError> {
        let cutoff = now - chrono::Duration::days(max_age_days);
        let mut purged = 0;

        for entry in self.list()? {
            if entry.quarantined_at < cutoff {
                let dead_letter_dir = self.layout.folder(VaultFolder::DeadLetter);
                let quarantined_path = dead_letter_dir.join(&entry.dlq_id);
                let meta_path = meta_path_for(&quarantined_path);
                let _ = fs::remove_file(&quarantined_path);
                let _ = fs::remove_file(&meta_path);
                purged += 1;
            }
        }

        Ok(purged)
    }
}

#[cfg(test)]
#[path = "dlq_store_tests.rs"]
mod tests;
