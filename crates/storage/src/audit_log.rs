// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only, hash-chained audit log.
//!
//! Entries are stored as JSON-lines under a single file. Each entry's
//! `entry_hash` covers its own canonical JSON (excluding the two hash
//! fields); `chain_hash` covers `entry_hash ∥ previous chain_hash`, so
//! tampering with any entry — or reordering, dropping, or duplicating
//! one — breaks every chain hash computed after it. A sidecar
//! `chain_hashes.json` maps `seq -> chain_hash` for O(1) spot checks
//! without a full scan.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use vaultflow_core::{AuditEntry, EngineError, IdGen, UuidIdGen};

use crate::snapshot::{load_json, save_json};

#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] crate::snapshot::SnapshotError),
    #[error(transparent)]
    Integrity(#[from] EngineError),
}

/// Result of [`AuditLog::verify_chain`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainVerification {
    pub valid: bool,
    pub total_entries: u64,
    pub invalid_entries: u64,
    pub issues: Vec<String>,
}

/// Portable export produced by [`AuditLog::export`], independently
/// verifiable via [`import`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditExport {
    pub entries: Vec<AuditEntry>,
    pub terminal_chain_hash: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn entry_hash_of(entry: &AuditEntry) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_vec(&entry.content())?;
    Ok(sha256_hex(&canonical))
}

fn chain_hash_of(entry_hash: &str, prev_chain_hash: Option<&str>) -> String {
    match prev_chain_hash {
        Some(prev) => sha256_hex(format!("{entry_hash}{prev}").as_bytes()),
        None => sha256_hex(entry_hash.as_bytes()),
    }
}

struct Inner {
    next_seq: u64,
    last_chain_hash: Option<String>,
    /// Set to the first `seq` whose hash no longer matches once a tamper
    /// is detected (at open time, by an explicit [`AuditLog::verify_chain`]
    /// call, or by `append`'s own pre-write check). Once set, every
    /// subsequent `append` is refused until [`AuditLog::reset_integrity_lock`]
    /// is called by an operator who has investigated the break.
    broken_since: Option<u64>,
}

/// A single-writer, many-reader append-only audit log.
pub struct AuditLog {
    path: PathBuf,
    sidecar_path: PathBuf,
    inner: Mutex<Inner>,
}

impl AuditLog {
    /// Open (or create) the audit log at `path`, replaying any existing
    /// entries to recover `next_seq` and the last chain hash.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuditLogError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let sidecar_path = sidecar_path_for(&path);

        let mut next_seq = 1;
        let mut last_chain_hash = None;
        let mut broken_since = None;
        let mut expected_seq = 1u64;
        if path.exists() {
            let file = File::open(&path)?;
            for line in BufReader::new(file).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let entry: AuditEntry = serde_json::from_str(&line)?;

                if broken_since.is_none() {
                    let expected_entry_hash = entry_hash_of(&entry)?;
                    let expected_chain_hash = chain_hash_of(&expected_entry_hash, last_chain_hash.as_deref());
                    if entry.seq != expected_seq || expected_chain_hash != entry.chain_hash {
                        broken_since = Some(entry.seq);
                    }
                }
                expected_seq = entry.seq + 1;
                next_seq = entry.seq + 1;
                last_chain_hash = Some(entry.chain_hash.clone());
            }
        }

        Ok(Self {
            path,
            sidecar_path,
            inner: Mutex::new(Inner {
                next_seq,
                last_chain_hash,
                broken_since,
            }),
        })
    }

    /// Append a new entry built from the supplied fields, computing its
    /// `seq`, `entry_hash`, and `chain_hash`, fsyncing the write, then
    /// updating the sidecar index. Serialized under a single writer lock.
    #[allow(clippy::too_many_arguments)]
    pub fn append(
        &self,
        timestamp: DateTime<Utc>,
        event_type: impl Into<String>,
        actor: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
        resource_id: impl Into<String>,
        correlation_id: Option<String>,
        details: BTreeMap<String, serde_json::Value>,
    ) -> Result<AuditEntry, AuditLogError> {
        let mut inner = self.inner.lock();

        if let Some(first_invalid_seq) = inner.broken_since {
            return Err(AuditLogError::Integrity(EngineError::IntegrityBroken { first_invalid_seq }));
        }

        let seq = inner.next_seq;
        let mut entry = AuditEntry {
            seq,
            entry_id: UuidIdGen.next(),
            timestamp,
            event_type: event_type.into(),
            actor: actor.into(),
            action: action.into(),
            resource: resource.into(),
            resource_id: resource_id.into(),
            correlation_id,
            details,
            entry_hash: String::new(),
            chain_hash: String::new(),
        };

        entry.entry_hash = entry_hash_of(&entry)?;
        entry.chain_hash = chain_hash_of(&entry.entry_hash, inner.last_chain_hash.as_deref());

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let line = serde_json::to_string(&entry)?;
        writeln!(file, "{line}")?;
        file.sync_all()?;

        let mut sidecar: BTreeMap<u64, String> =
            load_json(&self.sidecar_path)?.unwrap_or_default();
        sidecar.insert(seq, entry.chain_hash.clone());
        save_json(&self.sidecar_path, &sidecar)?;

        inner.next_seq = seq + 1;
        inner.last_chain_hash = Some(entry.chain_hash.clone());

        Ok(entry)
    }

    fn read_all(&self) -> Result<Vec<AuditEntry>, AuditLogError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)?;
        let mut out = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            out.push(serde_json::from_str(&line)?);
        }
        Ok(out)
    }

    /// Query entries matching all of the given (optional) filters, most
    /// recent first, bounded by `limit`.
    pub fn query(&self, filter: &AuditQuery, limit: usize) -> Result<Vec<AuditEntry>, AuditLogError> {
        let mut matches: Vec<AuditEntry> = self
            .read_all()?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();
        matches.reverse();
        matches.truncate(limit);
        Ok(matches)
    }

    /// Recompute the hash chain end-to-end and report the first
    /// mismatched `seq`, if any. A broken chain also locks out further
    /// [`AuditLog::append`] calls, mirroring what `open` would have found
    /// had the process been restarted after the tamper.
    pub fn verify_chain(&self) -> Result<ChainVerification, AuditLogError> {
        let entries = self.read_all()?;
        let mut issues = Vec::new();
        let mut prev_chain_hash: Option<String> = None;
        let mut expected_seq = 1u64;
        let mut first_invalid_seq: Option<u64> = None;

        for entry in &entries {
            if entry.seq != expected_seq {
                issues.push(format!(
                    "seq gap: expected {expected_seq}, found {}",
                    entry.seq
                ));
                first_invalid_seq.get_or_insert(entry.seq);
            }
            expected_seq = entry.seq + 1;

            let expected_entry_hash = entry_hash_of(entry)?;
            if expected_entry_hash != entry.entry_hash {
                issues.push(format!("seq {}: entry_hash mismatch", entry.seq));
                first_invalid_seq.get_or_insert(entry.seq);
            }

            let expected_chain_hash = chain_hash_of(&expected_entry_hash, prev_chain_hash.as_deref());
            if expected_chain_hash != entry.chain_hash {
                issues.push(format!("seq {}: chain_hash mismatch", entry.seq));
                first_invalid_seq.get_or_insert(entry.seq);
            }

            prev_chain_hash = Some(entry.chain_hash.clone());
        }

        if let Some(seq) = first_invalid_seq {
            let mut inner = self.inner.lock();
            inner.broken_since.get_or_insert(seq);
        }

        Ok(ChainVerification {
            valid: issues.is_empty(),
            total_entries: entries.len() as u64,
            invalid_entries: issues.len() as u64,
            issues,
        })
    }

    /// Clear a tamper lockout set by [`AuditLog::verify_chain`] or
    /// detected at open time. Callers are expected to have already
    /// investigated and recorded the break out-of-band; this does not
    /// repair the chain itself.
    pub fn reset_integrity_lock(&self) {
        self.inner.lock().broken_since = None;
    }

    /// Emit a portable export of every entry plus the terminal chain
    /// hash, so an external party can verify the chain independently.
    pub fn export(&self) -> Result<AuditExport, AuditLogError> {
        let entries = self.read_all()?;
        let terminal_chain_hash = entries
            .last()
            .map(|e| e.chain_hash.clone())
            .unwrap_or_default();
        Ok(AuditExport {
            entries,
            terminal_chain_hash,
        })
    }
}

/// Re-derive the chain from an export and compare against its carried
/// terminal hash, detecting any single-entry tamper.
pub fn import(export: &AuditExport) -> Result<ChainVerification, AuditLogError> {
    let mut issues = Vec::new();
    let mut prev_chain_hash: Option<String> = None;

    for entry in &export.entries {
        let expected_entry_hash = entry_hash_of(entry)?;
        let expected_chain_hash = chain_hash_of(&expected_entry_hash, prev_chain_hash.as_deref());
        if expected_chain_hash != entry.chain_hash {
            issues.push(format!("seq {}: chain_hash mismatch", entry.seq));
        }
        prev_chain_hash = Some(entry.chain_hash.clone());
    }

    if prev_chain_hash.as_deref() != Some(export.terminal_chain_hash.as_str())
        && !export.entries.is_empty()
    {
        issues.push("terminal chain_hash does not match recomputed chain".to_string());
    }

    Ok(ChainVerification {
        valid: issues.is_empty(),
        total_entries: export.entries.len() as u64,
        invalid_entries: issues.len() as u64,
        issues,
    })
}

/// Optional filters for [`AuditLog::query`]. All set fields must match.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub correlation_id: Option<String>,
    pub actor: Option<String>,
    pub event_type: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl AuditQuery {
    fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(cid) = &self.correlation_id {
            if entry.correlation_id.as_deref() != Some(cid.as_str()) {
                return false;
            }
        }
        if let Some(actor) = &self.actor {
            if &entry.actor != actor {
                return false;
            }
        }
        if let Some(event_type) = &self.event_type {
            if &entry.event_type != event_type {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.timestamp > until {
                return false;
            }
        }
        true
    }
}

fn sidecar_path_for(path: &Path) -> PathBuf {
    path.parent()
        .unwrap_or_else(|| Path::new("."))
        .join("chain_hashes.json")
}

#[cfg(test)]
#[path = "audit_log_tests.rs"]
mod tests;
