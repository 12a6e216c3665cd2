//! Start a new extraction run.

use crate::cli::{ExtractArgs, GlobalArgs};
use crate::commands::common::{self, Workspace};
use anyhow::Result;
use of_core::OntologyId;
use of_extract::{Engine, ExtractResult, RunOutcome};
use std::future::Future;
use std::sync::Arc;

/// Execute the extract command.
pub async fn execute(args: &ExtractArgs, global: &GlobalArgs) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let ontology_id = workspace.ontology_id;
    let (engine, printer) = build_engine(&workspace, args.progress)?;

    let outcome = run_cancellable(&engine, ontology_id, |engine| async move {
        engine.start_run(ontology_id).await
    })
    .await;

    finish(engine, printer).await;
    common::report_run(&outcome?.run, global.output)
}

/// Build the engine, wiring a progress printer when asked.
pub(crate) fn build_engine(
    workspace: &Workspace,
    progress: bool,
) -> Result<(Arc<Engine>, Option<tokio::task::JoinHandle<()>>)> {
    let engine = workspace.engine()?;
    if !progress {
        return Ok((Arc::new(engine), None));
    }
    let (tx, handle) = common::spawn_progress_printer();
    Ok((Arc::new(engine.with_progress(tx)), Some(handle)))
}

/// Drop the engine so the progress channel closes, then drain the printer.
pub(crate) async fn finish(engine: Arc<Engine>, printer: Option<tokio::task::JoinHandle<()>>) {
    drop(engine);
    if let Some(handle) = printer {
        let _ = handle.await;
    }
}

/// Drive `run` to completion, cancelling the ontology's run on Ctrl-C.
pub(crate) async fn run_cancellable<F, Fut>(
    engine: &Arc<Engine>,
    ontology_id: OntologyId,
    run: F,
) -> ExtractResult<RunOutcome>
where
    F: FnOnce(Arc<Engine>) -> Fut,
    Fut: Future<Output = ExtractResult<RunOutcome>>,
{
    let watcher = {
        let engine = engine.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Cancelling run; completed steps are kept.");
                engine.cancel(ontology_id);
            }
        })
    };
    let result = run(engine.clone()).await;
    watcher.abort();
    let _ = watcher.await;
    result
}
