//! Show the state of an extraction run.

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common::{self, ExitCode, Workspace};
use anyhow::Result;

/// Execute the status command.
///
/// A failed run is reported, not treated as a command failure.
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let engine = workspace.engine()?;

    let run = match &args.run_id {
        Some(run_id) => Some(engine.run_status(workspace.ontology_id, run_id)?),
        None => engine.latest_run(workspace.ontology_id)?,
    };
    let Some(run) = run else {
        eprintln!("No runs recorded for ontology {}", workspace.ontology_id);
        return Err(ExitCode(2).into());
    };

    common::print_run(&run, global.output)
}
