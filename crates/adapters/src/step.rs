// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step adapters: the execution engine dispatches each [`Step`] to the
//! adapter registered for its [`StepKind`]. `file` and `script` have
//! concrete in-core implementations since they only touch the local
//! filesystem/process; `email`, `calendar`, and `api` are interface-only
//! here and are backed in tests and DRY_RUN/SIMULATED modes by
//! [`FakeStepAdapter`].

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use vaultflow_core::{Step, StepKind};

#[derive(Debug, Error)]
pub enum StepAdapterError {
    #[error("missing required param {0}")]
    MissingParam(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("step failed: {0}")]
    Failed(String),
    #[error("step kind {0:?} has no compensation and is not reversible")]
    NotReversible(StepKind),
}

/// The result of running one step, carried into the rollback stack when
/// the step is reversible.
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub output: BTreeMap<String, Value>,
}

/// One kind's execute/compensate pair. Implementations must be cheap to
/// clone (typically an `Arc`-wrapped handle) since the registry hands
/// out shared references.
#[async_trait]
pub trait StepAdapter: Send + Sync {
    async fn execute(&self, step: &Step) -> Result<StepOutcome, StepAdapterError>;

    /// Undo a previously executed step. The default implementation
    /// reports the step as non-reversible; adapters for reversible
    /// kinds override this.
    async fn compensate(&self, step: &Step, _outcome: &StepOutcome) -> Result<(), StepAdapterError> {
        Err(StepAdapterError::NotReversible(step.kind))
    }
}

fn require<'a>(params: &'a BTreeMap<String, Value>, key: &str) -> Result<&'a Value, StepAdapterError> {
    params.get(key).ok_or_else(|| StepAdapterError::MissingParam(key.to_string()))
}

/// Writes/moves/deletes a local file. `params.op` is one of `write`,
/// `append`, `delete`; `params.path` names the target.
pub struct FileStepAdapter;

#[async_trait]
impl StepAdapter for FileStepAdapter {
    async fn execute(&self, step: &Step) -> Result<StepOutcome, StepAdapterError> {
        let op = require(&step.params, "op")?.as_str().unwrap_or("write");
        let path = require(&step.params, "path")?
            .as_str()
            .ok_or_else(|| StepAdapterError::MissingParam("path".to_string()))?;
        let path = PathBuf::from(path);

        match op {
            "write" => {
                let content = step.params.get("content").and_then(|v| v.as_str()).unwrap_or("");
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, content).await?;
            }
            "append" => {
                use tokio::io::AsyncWriteExt;
                let content = step.params.get("content").and_then(|v| v.as_str()).unwrap_or("");
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .await?;
                file.write_all(content.as_bytes()).await?;
            }
            "delete" => {
                if tokio::fs::metadata(&path).await.is_ok() {
                    tokio::fs::remove_file(&path).await?;
                }
            }
            other => return Err(StepAdapterError::Failed(format!("unknown file op {other}"))),
        }

        let mut output = BTreeMap::new();
        output.insert("path".to_string(), Value::String(path.display().to_string()));
        Ok(StepOutcome { output })
    }

    async fn compensate(&self, step: &Step, _outcome: &StepOutcome) -> Result<(), StepAdapterError> {
        let Some(rollback) = &step.rollback_params else {
            return Err(StepAdapterError::NotReversible(step.kind));
        };
        let op = rollback.get("op").and_then(|v| v.as_str()).unwrap_or("delete");
        let path = rollback
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| StepAdapterError::MissingParam("path".to_string()))?;
        let path = PathBuf::from(path);

        match op {
            "delete" => {
                if tokio::fs::metadata(&path).await.is_ok() {
                    tokio::fs::remove_file(&path).await?;
                }
            }
            "restore" => {
                let content = rollback.get("content").and_then(|v| v.as_str()).unwrap_or("");
                tokio::fs::write(&path, content).await?;
            }
            other => return Err(StepAdapterError::Failed(format!("unknown rollback op {other}"))),
        }
        Ok(())
    }
}

/// Runs a local subprocess to completion and captures stdout/exit code.
/// Never reversible — scripts have no generic undo.
pub struct ScriptStepAdapter;

#[async_trait]
impl StepAdapter for ScriptStepAdapter {
    async fn execute(&self, step: &Step) -> Result<StepOutcome, StepAdapterError> {
        let command = require(&step.params, "command")?
            .as_str()
            .ok_or_else(|| StepAdapterError::MissingParam("command".to_string()))?;
        let args: Vec<String> = step
            .params
            .get("args")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        let output = Command::new(command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(StepAdapterError::Failed(format!(
                "exit status {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let mut result = BTreeMap::new();
        result.insert(
            "stdout".to_string(),
            Value::String(String::from_utf8_lossy(&output.stdout).to_string()),
        );
        Ok(StepOutcome { output: result })
    }
}

/// A call recorded by [`FakeStepAdapter`], for test assertions.
#[derive(Debug, Clone)]
pub struct StepCall {
    pub kind: StepKind,
    pub params: BTreeMap<String, Value>,
}

struct FakeState {
    calls: Vec<StepCall>,
    fail_next: Option<String>,
}

/// In-memory stand-in for `email`/`calendar`/`api` steps (and any other
/// kind) in tests and DRY_RUN/SIMULATED execution modes.
#[derive(Clone)]
pub struct FakeStepAdapter {
    inner: Arc<parking_lot::Mutex<FakeState>>,
}

impl Default for FakeStepAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(parking_lot::Mutex::new(FakeState {
                calls: Vec::new(),
                fail_next: None,
            })),
        }
    }
}

impl FakeStepAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<StepCall> {
        self.inner.lock().calls.clone()
    }

    /// Make the next `execute()` call fail with the given message.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.inner.lock().fail_next = Some(message.into());
    }
}

#[async_trait]
impl StepAdapter for FakeStepAdapter {
    async fn execute(&self, step: &Step) -> Result<StepOutcome, StepAdapterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StepCall {
            kind: step.kind,
            params: step.params.clone(),
        });
        if let Some(message) = inner.fail_next.take() {
            return Err(StepAdapterError::Failed(message));
        }
        Ok(StepOutcome::default())
    }

    async fn compensate(&self, step: &Step, _outcome: &StepOutcome) -> Result<(), StepAdapterError> {
        if step.reversible {
            Ok(())
        } else {
            Err(StepAdapterError::NotReversible(step.kind))
        }
    }
}

/// Maps each [`StepKind`] to the adapter that executes it.
#[derive(Clone)]
pub struct StepAdapterRegistry {
    adapters: HashMap<StepKind, Arc<dyn StepAdapter>>,
}

impl StepAdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: StepKind, adapter: Arc<dyn StepAdapter>) {
        self.adapters.insert(kind, adapter);
    }

    pub fn get(&self, kind: StepKind) -> Option<Arc<dyn StepAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    /// `file`/`script` routed to concrete in-core adapters; `email`,
    /// `calendar`, `api` routed to a shared [`FakeStepAdapter`] — the
    /// real implementations are external collaborators outside this
    /// crate's scope.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(StepKind::File, Arc::new(FileStepAdapter));
        registry.register(StepKind::Script, Arc::new(ScriptStepAdapter));
        let fake = Arc::new(FakeStepAdapter::new());
        registry.register(StepKind::Email, fake.clone());
        registry.register(StepKind::Calendar, fake.clone());
        registry.register(StepKind::Api, fake);
        registry
    }
}

impl Default for StepAdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
