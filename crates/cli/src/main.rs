// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! vaultflow - a file-driven workflow orchestrator CLI

mod color;
mod commands;
mod exit_error;
mod output;
mod plan_generator;
mod table;

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};

use commands::approval::ApprovalArgs;
use commands::init::InitArgs;
use commands::restart::RestartArgs;
use commands::start::StartArgs;
use commands::status::StatusArgs;
use commands::stop::StopArgs;

#[derive(Parser)]
#[command(name = "vaultflow", version, about = "A file-driven workflow orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vault folder tree and an optional starter config
    Init(InitArgs),
    /// Build the orchestrator and run it in the foreground until shutdown
    Start(StartArgs),
    /// Show whether the orchestrator is running and per-folder counts
    Status(StatusArgs),
    /// Signal a running orchestrator to shut down
    Stop(StopArgs),
    /// Stop then start a fresh orchestrator
    Restart(RestartArgs),
    /// Inspect and resolve pending approvals
    Approval(ApprovalArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e.downcast_ref::<exit_error::ExitError>().map_or(1, |c| c.code);
        eprintln!("Error: {e}");
        std::process::exit(code);
    }
}

async fn run() -> Result<()> {
    let matches = Cli::command().styles(color::styles()).get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    match cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Start(args) => commands::start::run(args).await,
        Commands::Status(args) => commands::status::run(args),
        Commands::Stop(args) => commands::stop::run(args).await,
        Commands::Restart(args) => commands::restart::run(args).await,
        Commands::Approval(args) => commands::approval::run(args).await,
    }
}
