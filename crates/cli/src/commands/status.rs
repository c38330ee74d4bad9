// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vaultflow status`: whether the orchestrator is running, plus the
//! same per-folder counts and recent audit tail the dashboard writes,
//! computed fresh so `status` never lags a stale `Dashboard.md`.

use std::io::stdout;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use vaultflow_core::VaultFolder;
use vaultflow_storage::AuditQuery;

use crate::color;
use crate::commands::stop::{process_alive, read_pid};
use crate::commands::vault_ctx;
use crate::output::OutputFormat;
use crate::table::{Column, Table};

#[derive(Args)]
pub struct StatusArgs {
    /// Path to a vaultflow.toml config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t)]
    pub output: OutputFormat,
}

#[derive(Serialize)]
struct FolderCount {
    folder: String,
    count: usize,
}

#[derive(Serialize)]
struct StatusReport {
    vault: String,
    running: bool,
    pid: Option<u32>,
    folders: Vec<FolderCount>,
}

fn folder_count(layout: &vaultflow_core::VaultLayout, folder: VaultFolder) -> usize {
    std::fs::read_dir(layout.folder(folder))
        .map(|entries| entries.filter_map(Result::ok).filter(|e| e.path().is_file()).count())
        .unwrap_or(0)
}

pub fn run(args: StatusArgs) -> Result<()> {
    let (config, layout) = vault_ctx::load(args.config.as_deref())?;

    let pid = read_pid(&layout.orchestrator_pid_path())?;
    let running = pid.is_some_and(process_alive);

    let folders: Vec<FolderCount> = VaultFolder::ALL
        .iter()
        .map(|f| FolderCount { folder: f.dir_name().to_string(), count: folder_count(&layout, *f) })
        .collect();

    let report = StatusReport { vault: layout.root().display().to_string(), running, pid, folders };

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            let state = if report.running { color::green("running") } else { color::muted("stopped") };
            println!("vault:  {}", report.vault);
            println!("status: {state}");
            if let Some(pid) = report.pid {
                println!("pid:    {pid}");
            }
            println!();

            let mut table = Table::colored(vec![Column::left("FOLDER"), Column::right("COUNT")]);
            for fc in &report.folders {
                table.row(vec![fc.folder.clone(), fc.count.to_string()]);
            }
            table.render(&mut stdout());

            if let Ok(audit_log) = vault_ctx::open_audit_log(&config, &layout) {
                if let Ok(entries) = audit_log.query(&AuditQuery::default(), 5) {
                    if !entries.is_empty() {
                        println!("\nrecent audit activity:");
                        for entry in entries {
                            println!("  {} {} {}/{}", entry.timestamp.to_rfc3339(), entry.event_type, entry.resource, entry.resource_id);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
