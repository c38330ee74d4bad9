// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vaultflow start`: build the orchestrator in-process and block until a
//! shutdown signal arrives. There is no daemonizing step — run this under
//! a process supervisor (systemd, runit, a container) for long-lived use.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing_subscriber::EnvFilter;
use vaultflow_core::config::Config;
use vaultflow_daemon::orchestrator;

use crate::plan_generator::HeuristicPlanGenerator;

#[derive(Args)]
pub struct StartArgs {
    /// Path to a vaultflow.toml config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the configured log level (e.g. debug, info, warn)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

fn init_logging(config: &Config, override_level: Option<&str>) {
    let level = override_level.unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match config.logging.format {
        vaultflow_core::config::LogFormat::Json => subscriber.json().init(),
        vaultflow_core::config::LogFormat::Pretty => subscriber.init(),
    }
}

pub async fn run(args: StartArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    init_logging(&config, args.log_level.as_deref());

    let generator = Arc::new(HeuristicPlanGenerator);
    let orchestrator = orchestrator::build(&config, generator).context("failed to build orchestrator")?;

    tracing::info!(vault = %config.vault_path.display(), "starting vaultflow");
    orchestrator.run_until_shutdown().await.context("orchestrator exited with an error")?;
    Ok(())
}
