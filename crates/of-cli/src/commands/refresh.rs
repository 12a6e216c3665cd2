//! Re-read the source schema and record drift as pending changes.

use crate::cli::{GlobalArgs, OutputFormat, RefreshArgs};
use crate::commands::changes::print_changes;
use crate::commands::common::{self, Workspace};
use anyhow::Result;
use of_extract::RefreshOutcome;

/// Execute the refresh command.
pub async fn execute(_args: &RefreshArgs, global: &GlobalArgs) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let outcome = workspace.engine()?.refresher().refresh(workspace.ontology_id).await?;

    if global.output == OutputFormat::Json {
        return common::print_json(&outcome.changes());
    }
    match &outcome {
        RefreshOutcome::Baseline => println!("Recorded baseline schema snapshot."),
        RefreshOutcome::Unchanged => println!("Schema unchanged."),
        RefreshOutcome::Changed(changes) => {
            println!("Detected {} schema change(s):", changes.len());
            print_changes(changes);
        }
    }
    Ok(())
}
