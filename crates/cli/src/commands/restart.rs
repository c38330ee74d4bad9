// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vaultflow restart`: stop a running orchestrator (if any), then start
//! a fresh one in the foreground. Convenience wrapper; equivalent to
//! running `stop` followed by `start`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::color;
use crate::commands::{start, stop};

#[derive(Args)]
pub struct RestartArgs {
    /// Path to a vaultflow.toml config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the configured log level (e.g. debug, info, warn)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Seconds to wait for the previous process to exit before giving up
    #[arg(long, default_value = "30")]
    pub timeout: u64,
}

pub async fn run(args: RestartArgs) -> Result<()> {
    stop::run(stop::StopArgs { config: args.config.clone(), timeout: args.timeout }).await?;
    println!("{}", color::muted("starting a fresh orchestrator"));
    start::run(start::StartArgs { config: args.config, log_level: args.log_level }).await
}
