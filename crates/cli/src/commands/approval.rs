// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vaultflow approval`: list, inspect, and resolve the approval records
//! a plan's risk evaluation parked in `Pending_Approval`. Approving or
//! rejecting stamps the approval file's `resolved_at`/`approver`/`reason`
//! fields in place, then drives the underlying action through the same
//! `PENDING_APPROVAL -> APPROVAL_REVIEW -> {APPROVED, REJECTED}` edges the
//! automatic auto-reject path uses.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use vaultflow_core::vault::approval_file_name;
use vaultflow_core::{Approval, VaultFolder, WorkflowState};
use vaultflow_engine::{FileKind, TransitionRequest};
use vaultflow_storage::AuditQuery;

use crate::color;
use crate::commands::vault_ctx;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;
use crate::table::{Column, Table};

#[derive(Args)]
pub struct ApprovalArgs {
    #[command(subcommand)]
    pub command: ApprovalCommand,
}

#[derive(Subcommand)]
pub enum ApprovalCommand {
    /// List approvals still awaiting a decision
    List {
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
        #[arg(short = 'o', long = "output", value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Show one approval's full record
    Show {
        /// Approval id (the stem shared with its action and plan)
        id: String,
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
        #[arg(short = 'o', long = "output", value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Approve a pending approval, letting its plan proceed to execution
    Approve {
        id: String,
        /// Name or identifier of the person approving
        #[arg(short = 'a', long, default_value = "cli")]
        approver: String,
        /// Optional note appended to the stored reason
        #[arg(short = 'r', long)]
        reason: Option<String>,
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Reject a pending approval, routing its action to Rejected/Archived
    Reject {
        id: String,
        #[arg(short = 'a', long, default_value = "cli")]
        approver: String,
        /// Required: why this plan is being rejected
        #[arg(short = 'r', long)]
        reason: String,
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Show recently resolved approvals from the audit log
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
        #[arg(short = 'o', long = "output", value_enum, default_value_t)]
        output: OutputFormat,
    },
}

fn approval_path(layout: &vaultflow_core::VaultLayout, id: &str) -> PathBuf {
    layout.folder(VaultFolder::PendingApproval).join(approval_file_name(id))
}

fn load(layout: &vaultflow_core::VaultLayout, id: &str) -> Result<Approval> {
    let path = approval_path(layout, id);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("no pending approval named {id} (looked in {})", path.display()))?;
    Approval::from_markdown(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn save(layout: &vaultflow_core::VaultLayout, approval: &Approval) -> Result<()> {
    let path = approval_path(layout, approval.id.as_str());
    std::fs::write(&path, approval.to_markdown()).with_context(|| format!("failed to write {}", path.display()))
}

pub async fn run(args: ApprovalArgs) -> Result<()> {
    match args.command {
        ApprovalCommand::List { config, output } => list(config, output),
        ApprovalCommand::Show { id, config, output } => show(id, config, output),
        ApprovalCommand::Approve { id, approver, reason, config } => approve(id, approver, reason, config).await,
        ApprovalCommand::Reject { id, approver, reason, config } => reject(id, approver, reason, config).await,
        ApprovalCommand::History { limit, config, output } => history(limit, config, output),
    }
}

fn list(config: Option<PathBuf>, output: OutputFormat) -> Result<()> {
    let (_config, layout) = vault_ctx::load(config.as_deref())?;
    let dir = layout.folder(VaultFolder::PendingApproval);
    let mut pending = Vec::new();
    if dir.is_dir() {
        for entry in std::fs::read_dir(&dir).with_context(|| format!("failed to read {}", dir.display()))? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let text = std::fs::read_to_string(&path)?;
            if let Ok(approval) = Approval::from_markdown(&text) {
                if !approval.is_resolved() {
                    pending.push(approval);
                }
            }
        }
    }
    pending.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pending)?),
        OutputFormat::Text => {
            if pending.is_empty() {
                println!("{}", color::muted("no approvals pending"));
                return Ok(());
            }
            let mut table = Table::colored(vec![
                Column::left("ID"),
                Column::left("RISK"),
                Column::left("DECISION"),
                Column::muted("REQUESTED"),
            ]);
            for approval in &pending {
                table.row(vec![
                    approval.id.as_str().to_string(),
                    format!("{:?}", approval.risk_level),
                    format!("{:?}", approval.decision),
                    approval.requested_at.to_rfc3339(),
                ]);
            }
            table.render(&mut std::io::stdout());
        }
    }
    Ok(())
}

fn show(id: String, config: Option<PathBuf>, output: OutputFormat) -> Result<()> {
    let (_config, layout) = vault_ctx::load(config.as_deref())?;
    let approval = load(&layout, &id)?;
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&approval)?),
        OutputFormat::Text => print!("{}", approval.to_markdown()),
    }
    Ok(())
}

/// Move the action (and its plan/approval sidecars, when present) through
/// `PENDING_APPROVAL -> APPROVAL_REVIEW -> target`, bailing out with an
/// [`ExitError`] if any edge is rejected.
async fn advance(layout: &vaultflow_core::VaultLayout, config: &vaultflow_core::config::Config, id: &str, target: WorkflowState) -> Result<()> {
    let transitions = vault_ctx::open_transitions(config, layout)?;
    let correlation_id = id.to_string();

    let to_review = transitions
        .transition(TransitionRequest {
            stem: id.to_string(),
            kind: FileKind::Action,
            current_folder: VaultFolder::PendingApproval,
            from_state: WorkflowState::PendingApproval,
            to_state: WorkflowState::ApprovalReview,
            correlation_id: correlation_id.clone(),
            action_id: Some(id.to_string()),
            plan_id: Some(id.to_string()),
            metadata: Default::default(),
        })
        .await;
    if !to_review.success {
        bail!(ExitError::new(1, to_review.error.unwrap_or_else(|| "approval-review move failed".to_string())));
    }
    move_sidecars(&transitions, id, VaultFolder::PendingApproval, WorkflowState::PendingApproval, WorkflowState::ApprovalReview, &correlation_id).await?;

    let outcome = transitions
        .transition(TransitionRequest {
            stem: id.to_string(),
            kind: FileKind::Action,
            current_folder: VaultFolder::PendingApproval,
            from_state: WorkflowState::ApprovalReview,
            to_state: target,
            correlation_id: correlation_id.clone(),
            action_id: Some(id.to_string()),
            plan_id: Some(id.to_string()),
            metadata: Default::default(),
        })
        .await;
    if !outcome.success {
        bail!(ExitError::new(1, outcome.error.unwrap_or_else(|| "final move failed".to_string())));
    }
    move_sidecars(&transitions, id, VaultFolder::PendingApproval, WorkflowState::ApprovalReview, target, &correlation_id).await?;
    Ok(())
}

/// Move the `.plan.md`/`.approval.md` sidecars along the same edge the
/// action file just took. Both sidecars exist for any action an operator
/// can act on here, but [`vaultflow_engine::TransitionEngine::transition_if_present`]
/// is used rather than a plain `transition` so this stays correct if that
/// ever stops being true.
async fn move_sidecars(
    transitions: &vaultflow_engine::TransitionEngine,
    stem: &str,
    current_folder: VaultFolder,
    from_state: WorkflowState,
    to_state: WorkflowState,
    correlation_id: &str,
) -> Result<()> {
    for kind in [FileKind::Plan, FileKind::Approval] {
        let outcome = transitions
            .transition_if_present(TransitionRequest {
                stem: stem.to_string(),
                kind,
                current_folder,
                from_state,
                to_state,
                correlation_id: correlation_id.to_string(),
                action_id: Some(stem.to_string()),
                plan_id: Some(stem.to_string()),
                metadata: Default::default(),
            })
            .await;
        if let Some(outcome) = outcome {
            if !outcome.success {
                bail!(ExitError::new(1, outcome.error.unwrap_or_else(|| "sidecar move failed".to_string())));
            }
        }
    }
    Ok(())
}

async fn approve(id: String, approver: String, reason: Option<String>, config: Option<PathBuf>) -> Result<()> {
    let (cfg, layout) = vault_ctx::load(config.as_deref())?;
    let mut approval = load(&layout, &id)?;
    if approval.is_resolved() {
        bail!(ExitError::new(1, format!("approval {id} was already resolved")));
    }
    approval.resolved_at = Some(Utc::now());
    approval.approver = Some(approver);
    if let Some(reason) = reason {
        approval.reason = reason;
    }
    save(&layout, &approval)?;

    advance(&layout, &cfg, &id, WorkflowState::Approved).await?;
    println!("{} approval {id}", color::green("approved"));
    Ok(())
}

async fn reject(id: String, approver: String, reason: String, config: Option<PathBuf>) -> Result<()> {
    let (cfg, layout) = vault_ctx::load(config.as_deref())?;
    let mut approval = load(&layout, &id)?;
    if approval.is_resolved() {
        bail!(ExitError::new(1, format!("approval {id} was already resolved")));
    }
    approval.resolved_at = Some(Utc::now());
    approval.approver = Some(approver);
    approval.reason = reason;
    save(&layout, &approval)?;

    advance(&layout, &cfg, &id, WorkflowState::Rejected).await?;
    println!("{} approval {id}", color::yellow("rejected"));
    Ok(())
}

fn history(limit: usize, config: Option<PathBuf>, output: OutputFormat) -> Result<()> {
    let (cfg, layout) = vault_ctx::load(config.as_deref())?;
    let audit_log = vault_ctx::open_audit_log(&cfg, &layout)?;
    let query = AuditQuery { event_type: Some("transition.completed".to_string()), ..Default::default() };
    let mut entries: Vec<_> = audit_log
        .query(&query, usize::MAX)?
        .into_iter()
        .filter(|e| {
            matches!(
                e.details.get("to_state").and_then(|v| v.as_str()),
                Some("Approved") | Some("Rejected")
            )
        })
        .collect();
    entries.truncate(limit);

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("{}", color::muted("no resolved approvals in the audit log"));
                return Ok(());
            }
            let mut table = Table::colored(vec![
                Column::left("ID"),
                Column::status("OUTCOME"),
                Column::muted("WHEN"),
            ]);
            for entry in &entries {
                let outcome = entry.details.get("to_state").and_then(|v| v.as_str()).unwrap_or("?");
                table.row(vec![entry.resource_id.clone(), outcome.to_string(), entry.timestamp.to_rfc3339()]);
            }
            table.render(&mut std::io::stdout());
        }
    }
    Ok(())
}
