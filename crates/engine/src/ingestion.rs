// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbox ingestion: turns a raw `file.created` arrival in `Inbox` into an
//! `Action` record in `Needs_Action`, preserving provenance by archiving
//! the original under the same stem.

use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use vaultflow_core::config::ArchiveConfig;
use vaultflow_core::vault::{action_file_name, source_file_name};
use vaultflow_core::{Action, ActionId, ActionType, Event, EventType, IdGen, Priority, UuidIdGen, VaultFolder, VaultLayout};

use crate::bus::EventBus;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("failed to read source file {path}: {cause}")]
    Read { path: String, cause: String },
    #[error("failed to write action file: {cause}")]
    Write { cause: String },
    #[error("failed to archive source file: {cause}")]
    Archive { cause: String },
}

#[derive(Debug, Clone)]
pub struct IngestionOutcome {
    pub action: Action,
    pub action_path: PathBuf,
    pub archived_path: Option<PathBuf>,
}

/// Best-effort keyword inference; falls back to [`ActionType::Other`].
fn infer_action_type(content: &str) -> ActionType {
    let lower = content.to_lowercase();
    if lower.contains("meeting") || lower.contains("calendar invite") {
        ActionType::MeetingRequest
    } else if lower.contains("follow up") || lower.contains("follow-up") || lower.contains("followup") {
        ActionType::FollowUp
    } else if lower.contains("report") {
        ActionType::ReportGeneration
    } else if lower.contains("analy") {
        ActionType::DataAnalysis
    } else if lower.contains("document") || lower.contains("draft") {
        ActionType::DocumentCreation
    } else if lower.contains("reply") || lower.contains("email") {
        ActionType::EmailResponse
    } else {
        ActionType::Other
    }
}

async fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    let tmp = path.with_file_name(name);
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::File::open(&tmp).await?.sync_all().await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

pub struct IngestionEngine<G: IdGen = UuidIdGen> {
    layout: VaultLayout,
    id_gen: G,
    bus: Arc<EventBus>,
    archive: ArchiveConfig,
}

impl<G: IdGen> IngestionEngine<G> {
    pub fn new(layout: VaultLayout, id_gen: G, bus: Arc<EventBus>, archive: ArchiveConfig) -> Self {
        Self { layout, id_gen, bus, archive }
    }

    /// Read `source_path`, assign it a fresh stem, write `<stem>.action.yaml`
    /// into `Needs_Action`, then archive (or discard) the original.
    pub async fn ingest(&self, source_path: &Path) -> Result<IngestionOutcome, IngestionError> {
        let stem = self.id_gen.next();
        let content = tokio::fs::read_to_string(source_path).await.map_err(|e| IngestionError::Read {
            path: source_path.display().to_string(),
            cause: e.to_string(),
        })?;

        let action = Action {
            id: ActionId::new(stem.clone()),
            action_type: infer_action_type(&content),
            priority: Priority::Low,
            context: BTreeMap::new(),
            created_at: Utc::now(),
            source: source_path.display().to_string(),
            estimated_duration_min: None,
        };

        let action_yaml = serde_yaml::to_string(&action).map_err(|e| IngestionError::Write { cause: e.to_string() })?;
        let action_path = self.layout.folder(VaultFolder::NeedsAction).join(action_file_name(&stem));
        write_atomic(&action_path, &action_yaml)
            .await
            .map_err(|e| IngestionError::Write { cause: e.to_string() })?;

        let archived_path = if self.archive.retain_source {
            let dest = self.layout.folder(VaultFolder::Archived).join(source_file_name(&stem));
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| IngestionError::Archive { cause: e.to_string() })?;
            }
            tokio::fs::rename(source_path, &dest)
                .await
                .map_err(|e| IngestionError::Archive { cause: e.to_string() })?;
            Some(dest)
        } else {
            let _ = tokio::fs::remove_file(source_path).await;
            None
        };

        self.bus.publish(
            Event::new(EventType::ActionGenerated, "ingestion-engine").with_correlation_id(stem.clone()),
        );

        Ok(IngestionOutcome { action, action_path, archived_path })
    }
}

#[cfg(test)]
#[path = "ingestion_tests.rs"]
mod tests;
