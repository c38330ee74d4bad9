// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two-level stem lock: an in-process lock table serializes local
//! concurrency, a lock *file* under `.locks/<stem>.lock` serializes
//! against any other process sharing the vault. Acquisition is all-or-
//! nothing under a single overall timeout; release always unwinds both
//! levels via `Drop`, including on cancellation.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use vaultflow_core::config::LockConfig;
use vaultflow_core::VaultLayout;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("timed out acquiring lock for stem {stem} after {timeout_ms}ms")]
    Timeout { stem: String, timeout_ms: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Held while a stem is locked. Dropping it unlinks the lock file and
/// releases the in-process mutex, in that order, on every exit path.
pub struct StemGuard {
    lock_path: PathBuf,
    _in_process: OwnedMutexGuard<()>,
}

impl Drop for StemGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

/// Outcome of [`LockTable::acquire`]: the guard plus whether a stale
/// lock file was reclaimed along the way (the caller is expected to
/// audit-log this).
pub struct Acquired {
    pub guard: StemGuard,
    pub claimed_stale: bool,
}

pub struct LockTable {
    layout: VaultLayout,
    config: LockConfig,
    in_process: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockTable {
    pub fn new(layout: VaultLayout, config: LockConfig) -> Self {
        Self {
            layout,
            config,
            in_process: Mutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(&self, stem: &str) -> Result<Acquired, LockError> {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let deadline = Instant::now() + timeout;

        let mutex = {
            let mut table = self.in_process.lock();
            table
                .entry(stem.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };

        let in_process_guard = tokio::time::timeout_at(deadline.into(), mutex.lock_owned())
            .await
            .map_err(|_| LockError::Timeout {
                stem: stem.to_string(),
                timeout_ms: self.config.timeout_ms,
            })?;

        let lock_path = self.layout.lock_file(stem);
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut claimed_stale = false;
        loop {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    let _ = writeln!(file, "{}", std::process::id());
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    let is_stale = std::fs::metadata(&lock_path)
                        .and_then(|m| m.modified())
                        .map(|modified| {
                            modified.elapsed().unwrap_or_default()
                                > Duration::from_millis(self.config.stale_ms)
                        })
                        .unwrap_or(false);

                    if is_stale {
                        let _ = std::fs::remove_file(&lock_path);
                        claimed_stale = true;
                        continue;
                    }

                    if Instant::now() >= deadline {
                        return Err(LockError::Timeout {
                            stem: stem.to_string(),
                            timeout_ms: self.config.timeout_ms,
                        });
                    }
                    tokio::time::sleep(Duration::from_millis(25)).await;
                }
                Err(e) => return Err(LockError::Io(e)),
            }
        }

        Ok(Acquired {
            guard: StemGuard {
                lock_path,
                _in_process: in_process_guard,
            },
            claimed_stale,
        })
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
