//! Resume a failed, cancelled or crashed run.

use crate::cli::{GlobalArgs, ResumeArgs};
use crate::commands::common::{self, Workspace};
use crate::commands::extract::{build_engine, finish, run_cancellable};
use anyhow::{Context, Result};

/// Execute the resume command.
pub async fn execute(args: &ResumeArgs, global: &GlobalArgs) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let ontology_id = workspace.ontology_id;
    let (engine, printer) = build_engine(&workspace, args.progress)?;

    let run_id = match &args.run_id {
        Some(id) => id.clone(),
        None => engine
            .latest_run(ontology_id)?
            .map(|run| run.run_id)
            .with_context(|| format!("No runs recorded for ontology {ontology_id}"))?,
    };
    log::info!("Resuming run {run_id}");

    let outcome = run_cancellable(&engine, ontology_id, |engine| async move {
        engine.resume_run(ontology_id, &run_id).await
    })
    .await;

    finish(engine, printer).await;
    common::report_run(&outcome?.run, global.output)
}
