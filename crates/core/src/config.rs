// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration: compiled-in defaults, an optional TOML file,
//! then environment variables. CLI flags are layered on top of this by
//! the `vaultflow-cli` crate, which owns the clap definitions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    DryRun,
    Real,
    Simulated,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::DryRun
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RollbackStrategy {
    Automatic,
    Manual,
    None,
}

impl Default for RollbackStrategy {
    fn default() -> Self {
        RollbackStrategy::Automatic
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub base_ms: u64,
    pub cap_ms: u64,
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_ms: 1_000,
            cap_ms: 60_000,
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub timeout_ms: u64,
    pub stale_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            stale_ms: 300_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub history_size: usize,
    pub subscriber_queue: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            history_size: 1000,
            subscriber_queue: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
    pub rollback_strategy: RollbackStrategy,
    pub step_timeout_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            rollback_strategy: RollbackStrategy::default(),
            step_timeout_ms: 120_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Pretty
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub retain_source: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self { retain_source: true }
    }
}

/// Where the ordered approval rule list is loaded from. `rules_path`
/// unset means the built-in default rule set; present means a JSON file
/// holding a `Vec<ApprovalRule>` (see `vaultflow_engine::approval_rules`)
/// reloaded atomically on SIGHUP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    pub rules_path: Option<PathBuf>,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self { rules_path: None }
    }
}

/// Top-level engine configuration, matching the keys in the external
/// interfaces contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vault_path: PathBuf,
    pub execution: ExecutionConfig,
    pub retry: RetryConfig,
    pub lock: LockConfig,
    pub bus: BusConfig,
    pub health: HealthConfig,
    pub dashboard_interval_ms: u64,
    pub audit_path: String,
    pub archive: ArchiveConfig,
    pub approval: ApprovalConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_path: PathBuf::from("./vault"),
            execution: ExecutionConfig::default(),
            retry: RetryConfig::default(),
            lock: LockConfig::default(),
            bus: BusConfig::default(),
            health: HealthConfig::default(),
            dashboard_interval_ms: 30_000,
            audit_path: "System_Log/Audit/immutable_audit.jsonl".to_string(),
            archive: ArchiveConfig::default(),
            approval: ApprovalConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {cause}")]
    Read { path: String, cause: String },
    #[error("invalid config file {path}: {cause}")]
    Parse { path: String, cause: String },
}

impl Config {
    /// Load defaults, optionally overlaid by a TOML file, optionally
    /// overlaid by `VAULTFLOW_*` environment variables.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                path: path.display().to_string(),
                cause: e.to_string(),
            })?;
            config = toml::from_str(&text).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                cause: e.to_string(),
            })?;
        }

        if let Ok(vault_path) = std::env::var("VAULTFLOW_VAULT_PATH") {
            config.vault_path = PathBuf::from(vault_path);
        }
        if let Ok(level) = std::env::var("VAULTFLOW_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(mode) = std::env::var("VAULTFLOW_EXECUTION_MODE") {
            config.execution.mode = match mode.to_uppercase().as_str() {
                "REAL" => ExecutionMode::Real,
                "SIMULATED" => ExecutionMode::Simulated,
                _ => ExecutionMode::DryRun,
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
