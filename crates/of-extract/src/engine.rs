//! Extraction workflow engine.
//!
//! Runs the step DAG in topological order, one step at a time, persisting
//! the run after every transition. Failed attempts are retried under the
//! configured [`RetryPolicy`](of_core::RetryPolicy); optional steps degrade
//! to `skipped`; anything else fatal ends the run as `failed` with the
//! failing step and root error recorded.

use crate::context::StepContext;
use crate::error::{ExtractError, ExtractResult};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::refresh::SchemaRefresher;
use crate::step::ExtractionStep;
use crate::steps::default_steps;
use of_analysis::{SemanticClassifier, WorkerPool};
use of_core::{
    CancelFlag, Classify, Config, ErrorClass, ExtractionRun, OntologyId, RetryDecision,
    RunStatus, StepDag, StepKind,
};
use of_db::DataSource;
use of_meta::{MetaDb, MetaError, MetaResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Longest stretch of backoff sleep between cancellation checks.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Final state of a run the engine executed.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run: ExtractionRun,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.run.status == RunStatus::Succeeded
    }

    pub fn is_degraded(&self) -> bool {
        self.run.is_degraded()
    }

    /// Failing step and root-error summary of a failed run.
    pub fn failure(&self) -> Option<(Option<StepKind>, &str)> {
        match self.run.status {
            RunStatus::Failed => Some((
                self.run.failed_step,
                self.run.error_summary.as_deref().unwrap_or("unknown error"),
            )),
            _ => None,
        }
    }
}

struct ActiveRun {
    run_id: String,
    cancel: CancelFlag,
}

/// Removes the in-process claim on an ontology when the run ends.
struct ActiveClaim<'e> {
    engine: &'e Engine,
    ontology_id: OntologyId,
}

impl Drop for ActiveClaim<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.engine.active.lock() {
            active.remove(&self.ontology_id);
        }
    }
}

pub struct Engine {
    meta: Arc<Mutex<MetaDb>>,
    source: Arc<dyn DataSource>,
    semantic: Arc<dyn SemanticClassifier>,
    config: Arc<Config>,
    pool: WorkerPool,
    order: Vec<StepKind>,
    steps: HashMap<StepKind, Arc<dyn ExtractionStep>>,
    active: Mutex<HashMap<OntologyId, ActiveRun>>,
    listener: Option<UnboundedSender<ProgressEvent>>,
}

impl Engine {
    pub fn new(
        meta: Arc<Mutex<MetaDb>>,
        source: Arc<dyn DataSource>,
        semantic: Arc<dyn SemanticClassifier>,
        config: Config,
    ) -> ExtractResult<Self> {
        let order = StepDag::extraction()?.topological_order()?;
        let pool = WorkerPool::new(config.pool.max_concurrency);
        let steps = default_steps().into_iter().map(|s| (s.kind(), s)).collect();
        Ok(Self {
            meta,
            source,
            semantic,
            config: Arc::new(config),
            pool,
            order,
            steps,
            active: Mutex::new(HashMap::new()),
            listener: None,
        })
    }

    /// Replace the implementation of one step.
    pub fn with_step(mut self, step: Arc<dyn ExtractionStep>) -> Self {
        self.steps.insert(step.kind(), step);
        self
    }

    /// Forward progress events to `listener`.
    pub fn with_progress(mut self, listener: UnboundedSender<ProgressEvent>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn step_order(&self) -> &[StepKind] {
        &self.order
    }

    pub fn refresher(&self) -> SchemaRefresher {
        SchemaRefresher::new(self.source.clone(), self.meta.clone())
    }

    /// Start a new run over every step.
    ///
    /// Fails with [`ExtractError::RunAlreadyActive`] while another run of the
    /// same ontology is running, in this process or according to the store.
    pub async fn start_run(&self, ontology_id: OntologyId) -> ExtractResult<RunOutcome> {
        require_ontology(ontology_id)?;
        let run = ExtractionRun::new(ontology_id, &self.order);
        let (_claim, cancel) = self.claim(ontology_id, &run.run_id)?;

        self.with_meta(|meta| meta.scoped_transaction(ontology_id, |scope| scope.begin_run(&run)))
            .map_err(|e| match e {
                ExtractError::Meta(MetaError::RunAlreadyActive { run_id, .. }) => {
                    ExtractError::RunAlreadyActive {
                        ontology_id,
                        run_id,
                    }
                }
                other => other,
            })?;
        log::info!("Started run {} for ontology {}", run.run_id, ontology_id);
        self.execute(run, cancel).await
    }

    /// Continue a crashed or transiently failed run from its first
    /// unfinished step.
    pub async fn resume_run(&self, ontology_id: OntologyId, run_id: &str) -> ExtractResult<RunOutcome> {
        require_ontology(ontology_id)?;
        let (_claim, cancel) = self.claim(ontology_id, run_id)?;

        let mut run = self.load_run(ontology_id, run_id)?;
        if !run.is_resumable() {
            let reason = match (run.status, run.error_class) {
                (RunStatus::Succeeded, _) => "run already succeeded".to_string(),
                (_, Some(class)) => format!("it failed with a non-retryable {class} error"),
                _ => "run is not resumable".to_string(),
            };
            return Err(ExtractError::NotResumable {
                run_id: run_id.to_string(),
                reason,
            });
        }

        run.reopen();
        let other = self.with_meta(|meta| {
            meta.scoped_transaction(ontology_id, |scope| {
                if let Some(active) = scope.active_run_id()? {
                    if active != run.run_id {
                        return Ok(Some(active));
                    }
                }
                scope.save_run(&run)?;
                Ok(None)
            })
        })?;
        if let Some(other) = other {
            return Err(ExtractError::RunAlreadyActive {
                ontology_id,
                run_id: other,
            });
        }

        log::info!(
            "Resuming run {} for ontology {} at {:?}",
            run_id,
            ontology_id,
            run.steps_to_run().first()
        );
        self.execute(run, cancel).await
    }

    pub fn run_status(&self, ontology_id: OntologyId, run_id: &str) -> ExtractResult<ExtractionRun> {
        self.load_run(ontology_id, run_id)
    }

    pub fn latest_run(&self, ontology_id: OntologyId) -> ExtractResult<Option<ExtractionRun>> {
        self.with_meta(|meta| meta.scope(ontology_id).latest_run())
    }

    /// Request cancellation of the ontology's in-process run. Returns whether
    /// one was running.
    pub fn cancel(&self, ontology_id: OntologyId) -> bool {
        let Ok(active) = self.active.lock() else {
            return false;
        };
        match active.get(&ontology_id) {
            Some(run) => {
                log::info!("Cancelling run {}", run.run_id);
                run.cancel.cancel();
                true
            }
            None => false,
        }
    }

    fn claim(&self, ontology_id: OntologyId, run_id: &str) -> ExtractResult<(ActiveClaim<'_>, CancelFlag)> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| ExtractError::Poisoned("active runs"))?;
        if let Some(existing) = active.get(&ontology_id) {
            return Err(ExtractError::RunAlreadyActive {
                ontology_id,
                run_id: existing.run_id.clone(),
            });
        }
        let cancel = CancelFlag::new();
        active.insert(
            ontology_id,
            ActiveRun {
                run_id: run_id.to_string(),
                cancel: cancel.clone(),
            },
        );
        Ok((
            ActiveClaim {
                engine: self,
                ontology_id,
            },
            cancel,
        ))
    }

    fn load_run(&self, ontology_id: OntologyId, run_id: &str) -> ExtractResult<ExtractionRun> {
        self.with_meta(|meta| meta.scope(ontology_id).load_run(run_id))?
            .ok_or_else(|| ExtractError::RunNotFound {
                ontology_id,
                run_id: run_id.to_string(),
            })
    }

    fn with_meta<T>(&self, body: impl FnOnce(&MetaDb) -> MetaResult<T>) -> ExtractResult<T> {
        let meta = self
            .meta
            .lock()
            .map_err(|_| ExtractError::Poisoned("metadata store"))?;
        Ok(body(&meta)?)
    }

    fn lock_run<'r>(state: &'r Mutex<ExtractionRun>) -> ExtractResult<MutexGuard<'r, ExtractionRun>> {
        state.lock().map_err(|_| ExtractError::Poisoned("run state"))
    }

    /// Apply `change` to the run and persist it.
    fn transition(
        &self,
        state: &Mutex<ExtractionRun>,
        change: impl FnOnce(&mut ExtractionRun),
    ) -> ExtractResult<()> {
        let mut run = Self::lock_run(state)?;
        change(&mut run);
        self.with_meta(|meta| meta.scope(run.ontology_id).save_run(&run))
    }

    async fn execute(&self, run: ExtractionRun, cancel: CancelFlag) -> ExtractResult<RunOutcome> {
        let ontology_id = run.ontology_id;
        let run_id = run.run_id.clone();
        let pending = run.steps_to_run();
        let state = Arc::new(Mutex::new(run));

        let ctx = StepContext::new(
            ontology_id,
            run_id.clone(),
            self.source.clone(),
            self.semantic.clone(),
            self.config.clone(),
            self.pool.with_cancel(cancel.clone()),
            cancel.clone(),
            ProgressReporter::new(state.clone(), self.listener.clone())
                .persisting_to(self.meta.clone()),
            self.meta.clone(),
        );

        for kind in pending {
            if cancel.is_cancelled() {
                self.transition(&state, |run| {
                    run.mark_run_failed(Some(kind), ErrorClass::Cancelled, "run cancelled")
                })?;
                break;
            }
            let Some(step) = self.steps.get(&kind) else {
                self.transition(&state, |run| {
                    run.mark_run_failed(
                        Some(kind),
                        ErrorClass::Configuration,
                        "no implementation registered for step",
                    )
                })?;
                break;
            };
            if !self.run_step(step.as_ref(), &ctx, &state).await? {
                break;
            }
        }

        let still_running = Self::lock_run(&state)?.status == RunStatus::Running;
        if still_running {
            self.transition(&state, |run| run.mark_run_succeeded())?;
        }

        let run = Self::lock_run(&state)?.clone();
        match run.status {
            RunStatus::Succeeded if run.is_degraded() => log::warn!(
                "Run {} succeeded degraded; skipped: {:?}",
                run_id,
                run.degraded_steps
            ),
            RunStatus::Succeeded => log::info!("Run {} succeeded", run_id),
            _ => log::error!(
                "Run {} failed at {:?}: {}",
                run_id,
                run.failed_step,
                run.error_summary.as_deref().unwrap_or("unknown error")
            ),
        }
        Ok(RunOutcome { run })
    }

    /// Run one step to completion under the retry policy. Returns whether
    /// the run should continue.
    async fn run_step(
        &self,
        step: &dyn ExtractionStep,
        ctx: &StepContext,
        state: &Mutex<ExtractionRun>,
    ) -> ExtractResult<bool> {
        let kind = step.kind();
        let mut tracker = self.config.retry.tracker();
        loop {
            self.transition(state, |run| run.mark_step_running(kind))?;
            log::info!("Step {} started (attempt {})", kind, tracker.attempts() + 1);

            let error = match step.execute(ctx).await {
                Ok(summary) => {
                    log::info!("Step {} succeeded: {}", kind, summary);
                    self.transition(state, |run| run.mark_step_succeeded(kind))?;
                    return Ok(true);
                }
                Err(e) => e,
            };

            let class = if ctx.cancel.is_cancelled() {
                ErrorClass::Cancelled
            } else {
                error.error_class()
            };
            let message = error.to_string();
            self.transition(state, |run| run.mark_step_failed(kind, &message))?;

            match tracker.on_failure(class) {
                RetryDecision::RetryAfter(delay) => {
                    log::warn!(
                        "Step {} failed ({}), retrying in {:?}: {}",
                        kind,
                        class,
                        delay,
                        message
                    );
                    if !backoff(delay, &ctx.cancel).await {
                        self.transition(state, |run| {
                            run.mark_run_failed(Some(kind), ErrorClass::Cancelled, "run cancelled")
                        })?;
                        return Ok(false);
                    }
                }
                RetryDecision::GiveUp { class, escalated } => {
                    if kind.is_optional() && class != ErrorClass::Cancelled {
                        log::warn!("Optional step {} skipped: {}", kind, message);
                        self.transition(state, |run| run.mark_step_skipped(kind, &message))?;
                        return Ok(true);
                    }
                    let summary = if escalated {
                        format!("{message} (gave up after {} attempts)", tracker.attempts())
                    } else {
                        message
                    };
                    log::error!("Step {} failed ({}): {}", kind, class, summary);
                    self.transition(state, |run| run.mark_run_failed(Some(kind), class, &summary))?;
                    return Ok(false);
                }
            }
        }
    }
}

fn require_ontology(ontology_id: OntologyId) -> ExtractResult<()> {
    if ontology_id.is_nil() {
        return Err(ExtractError::Configuration(
            "extraction requires a non-nil ontology id".to_string(),
        ));
    }
    Ok(())
}

/// Sleep for `delay`, waking early on cancellation. Returns `false` if
/// cancelled.
async fn backoff(delay: Duration, cancel: &CancelFlag) -> bool {
    let deadline = tokio::time::Instant::now() + delay;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return true;
        }
        tokio::time::sleep((deadline - now).min(CANCEL_POLL)).await;
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
