// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vaultflow stop`: signal a running orchestrator via its PID file. No
//! socket is involved — the file at `<vault>/.locks/orchestrator.pid` is
//! written by [`vaultflow_daemon::orchestrator::Orchestrator`] once it
//! acquires the vault lock, and removed when it releases it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::color;
use crate::commands::vault_ctx;
use crate::exit_error::ExitError;

#[derive(Args)]
pub struct StopArgs {
    /// Path to a vaultflow.toml config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Seconds to wait for the process to exit before giving up
    #[arg(long, default_value = "30")]
    pub timeout: u64,
}

/// Read the PID an orchestrator wrote at `path`, or `None` if it isn't running.
pub fn read_pid(path: &std::path::Path) -> Result<Option<u32>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let pid: u32 = text.trim().parse().with_context(|| format!("invalid pid in {}", path.display()))?;
    Ok(Some(pid))
}

pub fn process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn send_signal(pid: u32, signal: &str) -> Result<()> {
    let status = std::process::Command::new("kill")
        .args([signal, &pid.to_string()])
        .status()
        .context("failed to invoke kill")?;
    if !status.success() {
        bail!("kill {signal} {pid} failed");
    }
    Ok(())
}

pub async fn run(args: StopArgs) -> Result<()> {
    let (_config, layout) = vault_ctx::load(args.config.as_deref())?;
    let pid_path = layout.orchestrator_pid_path();

    let Some(pid) = read_pid(&pid_path)? else {
        println!("{}", color::muted("no running orchestrator found for this vault"));
        return Ok(());
    };

    if !process_alive(pid) {
        println!("{}", color::muted("stale pid file found; orchestrator is not running"));
        let _ = std::fs::remove_file(&pid_path);
        return Ok(());
    }

    send_signal(pid, "-TERM")?;

    let deadline = std::time::Instant::now() + Duration::from_secs(args.timeout);
    while std::time::Instant::now() < deadline {
        if !process_alive(pid) {
            println!("{} orchestrator (pid {pid})", color::green("stopped"));
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    Err(ExitError::new(1, format!("orchestrator (pid {pid}) did not exit within {}s", args.timeout)).into())
}
