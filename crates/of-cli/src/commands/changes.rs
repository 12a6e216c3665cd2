//! Review pending schema changes.

use crate::cli::{ChangesArgs, ChangesCommands, GlobalArgs, OutputFormat, StatusFilter};
use crate::commands::common::{self, Workspace};
use anyhow::Result;
use of_core::{ChangeStatus, PendingChange};

/// Execute the changes command.
pub async fn execute(args: &ChangesArgs, global: &GlobalArgs) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let ontology_id = workspace.ontology_id;

    match &args.command {
        ChangesCommands::List { status } => {
            let status = status.map(change_status);
            let changes = workspace.with_meta(|meta| {
                Ok(meta.scope(ontology_id).pending().list(status)?)
            })?;
            if global.output == OutputFormat::Json {
                return common::print_json(&changes);
            }
            if changes.is_empty() {
                println!("No schema changes.");
            } else {
                print_changes(&changes);
            }
        }
        ChangesCommands::Approve { id } => {
            let change = workspace.with_meta(|meta| {
                Ok(meta.scoped_transaction(ontology_id, |scope| scope.pending().approve(*id))?)
            })?;
            report_review(&change, global.output)?;
        }
        ChangesCommands::Reject { id, reason } => {
            let change = workspace.with_meta(|meta| {
                Ok(meta.scoped_transaction(ontology_id, |scope| {
                    scope.pending().reject(*id, reason)
                })?)
            })?;
            report_review(&change, global.output)?;
        }
    }
    Ok(())
}

fn change_status(filter: StatusFilter) -> ChangeStatus {
    match filter {
        StatusFilter::Pending => ChangeStatus::Pending,
        StatusFilter::Approved => ChangeStatus::Approved,
        StatusFilter::Rejected => ChangeStatus::Rejected,
        StatusFilter::AutoApplied => ChangeStatus::AutoApplied,
    }
}

fn report_review(change: &PendingChange, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => common::print_json(change),
        OutputFormat::Text => {
            println!("Change {} is now {}: {}", change.id, change.status, change.change.description());
            Ok(())
        }
    }
}

/// Print changes as a table.
pub(crate) fn print_changes(changes: &[PendingChange]) {
    println!("  {:>5} {:<12} {:<16} DESCRIPTION", "ID", "STATUS", "ACTION");
    for change in changes {
        let action = change
            .suggested_action
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>5} {:<12} {:<16} {}",
            change.id,
            change.status,
            action,
            change.change.description()
        );
        if let Some(reason) = &change.reject_reason {
            println!("        rejected: {reason}");
        }
    }
}
