// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic atomic JSON persistence for crash-safe state.
//!
//! Any value that is `Serialize`/`DeserializeOwned` can be saved to and
//! loaded from disk via [`save_json`]/[`load_json`]. A save never leaves
//! a half-written file behind: the value is written to `<path>.tmp`,
//! fsynced, then renamed into place. A load that finds unparsable JSON
//! quarantines the file under a rotating `.bak` suffix and reports no
//! value, so callers can rebuild from another source instead of
//! refusing to start.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Save `value` to `path` atomically (write to `.tmp`, fsync, rename).
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");

    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load a value saved by [`save_json`].
///
/// Returns `Ok(None)` if the file doesn't exist or is corrupt. A corrupt
/// file is rotated into a `.bak` chain so the caller can rebuild state
/// from another source (e.g. a folder scan) instead of refusing to
/// start.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    match serde_json::from_reader(reader) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            let bak_path = rotate_bak_path(path);
            warn!(
                error = %e,
                path = %path.display(),
                bak = %bak_path.display(),
                "corrupt snapshot, quarantining and starting fresh",
            );
            fs::rename(path, &bak_path)?;
            Ok(None)
        }
    }
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
/// The oldest backup is removed when the limit is reached.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
