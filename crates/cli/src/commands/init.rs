// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vaultflow init`: create the vault folder tree and a starter config.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use vaultflow_core::config::Config;
use vaultflow_core::VaultLayout;

use crate::color;

#[derive(Args)]
pub struct InitArgs {
    /// Root directory for the new vault (created if missing)
    #[arg(value_name = "PATH", default_value = "./vault")]
    pub path: PathBuf,

    /// Write a starter vaultflow.toml next to the vault pointing at it
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

pub fn run(args: InitArgs) -> Result<()> {
    let layout = VaultLayout::new(args.path.clone());
    for dir in layout.all_dirs() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    if let Some(config_path) = &args.config {
        let mut config = Config::default();
        config.vault_path = args.path.clone();
        let toml = toml::to_string_pretty(&config).context("failed to render config")?;
        std::fs::write(config_path, toml)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        println!("{} {}", color::muted("wrote"), config_path.display());
    }

    println!("{} vault at {}", color::green("initialized"), layout.root().display());
    Ok(())
}
