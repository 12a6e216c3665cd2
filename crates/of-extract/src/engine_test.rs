use super::*;
use crate::error::{StepError, StepResult};
use crate::steps::{ClassificationStep, OntologySummary, ProfilingStep, TerminologyStep};
use async_trait::async_trait;
use of_analysis::NoopSemanticClassifier;
use of_core::{RetryPolicy, StepStatus, VerifiedRelationship};
use of_db::{DbError, DuckDbSource};
use of_meta::Entity;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::mpsc;

const SHOP: &str = r#"
CREATE TABLE customers (
    customer_id INTEGER PRIMARY KEY,
    email VARCHAR,
    deleted_at TIMESTAMP
);
INSERT INTO customers
SELECT
    range,
    'c' || CAST(range AS VARCHAR) || '@example.com',
    CASE WHEN range % 50 = 0 THEN TIMESTAMP '2024-01-01 00:00:00' ELSE NULL END
FROM range(1, 201);

CREATE TABLE orders (order_id INTEGER PRIMARY KEY, customer_id INTEGER, status VARCHAR);
INSERT INTO orders
SELECT range, 1 + range % 200, CASE WHEN range % 2 = 0 THEN 'open' ELSE 'closed' END
FROM range(1000, 1600);
"#;

fn fast_retries(max_attempts: u32) -> Config {
    Config {
        retry: RetryPolicy {
            max_attempts,
            same_error_threshold: max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 5,
            jitter: 0.0,
        },
        ..Config::default()
    }
}

struct Fixture {
    source: Arc<DuckDbSource>,
    meta: Arc<Mutex<MetaDb>>,
    ontology_id: OntologyId,
}

impl Fixture {
    fn new() -> Self {
        let source = DuckDbSource::in_memory().unwrap();
        source.execute_batch(SHOP).unwrap();
        Self {
            source: Arc::new(source),
            meta: Arc::new(Mutex::new(MetaDb::open_memory().unwrap())),
            ontology_id: OntologyId::new_random(),
        }
    }

    fn engine(&self, config: Config) -> Engine {
        Engine::new(
            self.meta.clone(),
            self.source.clone(),
            Arc::new(NoopSemanticClassifier),
            config,
        )
        .unwrap()
    }

    fn summary(&self) -> OntologySummary {
        self.meta
            .lock()
            .unwrap()
            .scoped_transaction(self.ontology_id, OntologySummary::collect)
            .unwrap()
    }
}

/// Fails a fixed number of times with `class`, then delegates.
struct Scripted {
    inner: Arc<dyn ExtractionStep>,
    failures: u32,
    class: ErrorClass,
    calls: AtomicU32,
}

impl Scripted {
    fn new(inner: impl ExtractionStep + 'static, failures: u32, class: ErrorClass) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(inner),
            failures,
            class,
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl ExtractionStep for Scripted {
    fn kind(&self) -> StepKind {
        self.inner.kind()
    }

    async fn execute(&self, ctx: &StepContext) -> StepResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(match self.class {
                ErrorClass::Configuration => StepError::Configuration("bad setting".into()),
                class => StepError::Source(DbError::Transient {
                    class,
                    message: format!("attempt {call} failed"),
                }),
            });
        }
        self.inner.execute(ctx).await
    }
}

/// Cancels the run from inside a step.
struct CancelsRun(StepKind);

#[async_trait]
impl ExtractionStep for CancelsRun {
    fn kind(&self) -> StepKind {
        self.0
    }

    async fn execute(&self, ctx: &StepContext) -> StepResult<String> {
        ctx.cancel.cancel();
        Err(StepError::Cancelled)
    }
}

/// Does nothing, slowly.
struct Idle(StepKind, Duration);

#[async_trait]
impl ExtractionStep for Idle {
    fn kind(&self) -> StepKind {
        self.0
    }

    async fn execute(&self, _ctx: &StepContext) -> StepResult<String> {
        tokio::time::sleep(self.1).await;
        Ok("idle".into())
    }
}

/// Reports partial progress, then waits for the gate before finishing.
struct Halfway {
    kind: StepKind,
    gate: Arc<tokio::sync::Notify>,
}

#[async_trait]
impl ExtractionStep for Halfway {
    fn kind(&self) -> StepKind {
        self.kind
    }

    async fn execute(&self, ctx: &StepContext) -> StepResult<String> {
        ctx.progress.report(self.kind, 1, 4, Some("first table".into()))?;
        self.gate.notified().await;
        ctx.progress.report(self.kind, 4, 4, None)?;
        Ok("4 tables".into())
    }
}

fn status_of(run: &ExtractionRun, step: StepKind) -> StepStatus {
    run.step(step).unwrap().status
}

fn attempts_of(run: &ExtractionRun, step: StepKind) -> u32 {
    run.step(step).unwrap().attempts
}

#[tokio::test]
async fn test_full_run_builds_ontology() {
    let fx = Fixture::new();
    let engine = fx.engine(fast_retries(3));
    let outcome = engine.start_run(fx.ontology_id).await.unwrap();

    assert!(outcome.succeeded(), "{:?}", outcome.failure());
    assert!(!outcome.is_degraded());
    for step in StepKind::ALL {
        assert_eq!(status_of(&outcome.run, step), StepStatus::Succeeded);
        assert_eq!(attempts_of(&outcome.run, step), 1);
    }

    let summary = fx.summary();
    assert_eq!(summary.entities, 2);
    assert_eq!(summary.annotations, 6);
    assert_eq!(summary.relationships, 1);
    assert_eq!(summary.stale, 0);

    let meta = fx.meta.lock().unwrap();
    let scope = meta.scope(fx.ontology_id);
    let relationships = scope.list::<VerifiedRelationship>().unwrap();
    assert_eq!(
        relationships[0].record.key.to_string(),
        "orders.customer_id -> customers.customer_id"
    );
    assert!(scope.get::<Entity>("orders").unwrap().is_some());

    let stored = scope.load_run(&outcome.run.run_id).unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Succeeded);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let fx = Fixture::new();
    let engine = fx.engine(fast_retries(3));
    engine.start_run(fx.ontology_id).await.unwrap();
    let first = fx.summary();
    let first_records = {
        let meta = fx.meta.lock().unwrap();
        meta.scope(fx.ontology_id)
            .list::<VerifiedRelationship>()
            .unwrap()
    };

    let outcome = engine.start_run(fx.ontology_id).await.unwrap();
    assert!(outcome.succeeded());
    assert_eq!(fx.summary(), first);

    let meta = fx.meta.lock().unwrap();
    let second_records = meta
        .scope(fx.ontology_id)
        .list::<VerifiedRelationship>()
        .unwrap();
    assert_eq!(second_records.len(), first_records.len());
    assert_eq!(second_records[0].record, first_records[0].record);
    assert_eq!(second_records[0].updated_at, first_records[0].updated_at);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let fx = Fixture::new();
    let step = Scripted::new(ProfilingStep, 2, ErrorClass::RateLimited);
    let engine = fx.engine(fast_retries(5)).with_step(step.clone());

    let outcome = engine.start_run(fx.ontology_id).await.unwrap();
    assert!(outcome.succeeded());
    assert_eq!(attempts_of(&outcome.run, StepKind::Profiling), 3);
    assert_eq!(step.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_bound_fails_run_and_resume_continues() {
    let fx = Fixture::new();
    let failing = Scripted::new(ClassificationStep, u32::MAX, ErrorClass::Network);
    let engine = fx.engine(fast_retries(4)).with_step(failing.clone());

    let outcome = engine.start_run(fx.ontology_id).await.unwrap();
    let run = &outcome.run;
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.failed_step, Some(StepKind::Classification));
    assert_eq!(run.error_class, Some(ErrorClass::Network));
    assert_eq!(attempts_of(run, StepKind::Classification), 4);
    assert_eq!(failing.calls.load(Ordering::SeqCst), 4);
    let (step, summary) = outcome.failure().unwrap();
    assert_eq!(step, Some(StepKind::Classification));
    assert!(summary.contains("gave up after 4 attempts"), "{summary}");
    assert_eq!(status_of(run, StepKind::Profiling), StepStatus::Succeeded);
    assert_eq!(status_of(run, StepKind::RelationshipDiscovery), StepStatus::Pending);

    // the source recovered
    let engine = fx.engine(fast_retries(4));
    let resumed = engine
        .resume_run(fx.ontology_id, &run.run_id)
        .await
        .unwrap();
    assert!(resumed.succeeded());
    assert_eq!(resumed.run.run_id, run.run_id);
    assert_eq!(attempts_of(&resumed.run, StepKind::Profiling), 1);
    assert_eq!(attempts_of(&resumed.run, StepKind::Classification), 5);
}

#[tokio::test]
async fn test_configuration_error_is_not_retried_or_resumable() {
    let fx = Fixture::new();
    let failing = Scripted::new(ClassificationStep, 1, ErrorClass::Configuration);
    let engine = fx.engine(fast_retries(5)).with_step(failing.clone());

    let outcome = engine.start_run(fx.ontology_id).await.unwrap();
    assert_eq!(outcome.run.error_class, Some(ErrorClass::Configuration));
    assert_eq!(failing.calls.load(Ordering::SeqCst), 1);

    let err = engine
        .resume_run(fx.ontology_id, &outcome.run.run_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::NotResumable { .. }));
}

#[tokio::test]
async fn test_missing_input_fails_fast() {
    let fx = Fixture::new();
    let engine = fx
        .engine(fast_retries(5))
        .with_step(Arc::new(Idle(StepKind::Profiling, Duration::ZERO)));

    let outcome = engine.start_run(fx.ontology_id).await.unwrap();
    assert_eq!(outcome.run.failed_step, Some(StepKind::Classification));
    assert_eq!(outcome.run.error_class, Some(ErrorClass::Validation));
    assert_eq!(attempts_of(&outcome.run, StepKind::Classification), 1);
}

#[tokio::test]
async fn test_optional_step_degrades() {
    let fx = Fixture::new();
    let engine = fx
        .engine(fast_retries(3))
        .with_step(Scripted::new(TerminologyStep, u32::MAX, ErrorClass::RateLimited));

    let outcome = engine.start_run(fx.ontology_id).await.unwrap();
    assert!(outcome.succeeded());
    assert!(outcome.is_degraded());
    assert_eq!(outcome.run.degraded_steps, vec![StepKind::TerminologyDiscovery]);
    assert_eq!(
        status_of(&outcome.run, StepKind::TerminologyDiscovery),
        StepStatus::Skipped
    );
    assert_eq!(
        status_of(&outcome.run, StepKind::Finalization),
        StepStatus::Succeeded
    );
}

#[tokio::test]
async fn test_stored_active_run_blocks_start_until_resumed() {
    let fx = Fixture::new();
    let crashed = ExtractionRun::new(fx.ontology_id, &StepKind::ALL);
    fx.meta
        .lock()
        .unwrap()
        .scope(fx.ontology_id)
        .begin_run(&crashed)
        .unwrap();

    let engine = fx.engine(fast_retries(3));
    match engine.start_run(fx.ontology_id).await {
        Err(ExtractError::RunAlreadyActive { run_id, .. }) => assert_eq!(run_id, crashed.run_id),
        other => panic!("expected RunAlreadyActive, got {other:?}"),
    }

    let resumed = engine
        .resume_run(fx.ontology_id, &crashed.run_id)
        .await
        .unwrap();
    assert!(resumed.succeeded());
}

#[tokio::test]
async fn test_one_in_process_run_per_ontology() {
    let fx = Fixture::new();
    let engine = fx.engine(fast_retries(3)).with_step(Arc::new(Idle(
        StepKind::Finalization,
        Duration::from_millis(200),
    )));
    let other_ontology = OntologyId::new_random();

    let (first, second, other) = tokio::join!(
        engine.start_run(fx.ontology_id),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            engine.start_run(fx.ontology_id).await
        },
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            engine.cancel(other_ontology)
        }
    );
    assert!(first.unwrap().succeeded());
    assert!(matches!(second, Err(ExtractError::RunAlreadyActive { .. })));
    assert!(!other);

    // the claim is released once the run ends
    assert!(engine.start_run(fx.ontology_id).await.unwrap().succeeded());
}

#[tokio::test]
async fn test_cancellation_keeps_completed_steps() {
    let fx = Fixture::new();
    let engine = fx
        .engine(fast_retries(3))
        .with_step(Arc::new(CancelsRun(StepKind::RelationshipDiscovery)));

    let outcome = engine.start_run(fx.ontology_id).await.unwrap();
    assert_eq!(outcome.run.status, RunStatus::Failed);
    assert_eq!(outcome.run.error_class, Some(ErrorClass::Cancelled));
    assert_eq!(outcome.run.failed_step, Some(StepKind::RelationshipDiscovery));
    assert_eq!(
        status_of(&outcome.run, StepKind::Classification),
        StepStatus::Succeeded
    );
    assert_eq!(fx.summary().annotations, 6);

    let resumed = fx
        .engine(fast_retries(3))
        .resume_run(fx.ontology_id, &outcome.run.run_id)
        .await
        .unwrap();
    assert!(resumed.succeeded());
    assert_eq!(attempts_of(&resumed.run, StepKind::Classification), 1);
}

#[tokio::test]
async fn test_progress_sequence_strictly_increases() {
    let fx = Fixture::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = fx.engine(fast_retries(3)).with_progress(tx);
    let outcome = engine.start_run(fx.ontology_id).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(!events.is_empty());
    assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
    assert!(events.iter().all(|e| e.run_id == outcome.run.run_id));
    assert!(events.iter().any(|e| e.step == StepKind::Classification));
    assert_eq!(
        outcome.run.progress_sequence,
        events.last().map(|e| e.sequence).unwrap()
    );

    let classification = outcome.run.step(StepKind::Classification).unwrap();
    assert_eq!(classification.progress.completed, 6);
    assert_eq!(classification.progress.total, 6);
}

#[tokio::test]
async fn test_stored_run_shows_progress_mid_step() {
    let fx = Fixture::new();
    let gate = Arc::new(tokio::sync::Notify::new());
    let engine = fx.engine(fast_retries(3)).with_step(Arc::new(Halfway {
        kind: StepKind::Enrichment,
        gate: gate.clone(),
    }));

    let watch = async {
        for _ in 0..1000 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let Some(run) = engine.latest_run(fx.ontology_id).unwrap() else {
                continue;
            };
            let step = run.step(StepKind::Enrichment).unwrap();
            if step.status == StepStatus::Running && step.progress.total > 0 {
                gate.notify_one();
                return step.progress.clone();
            }
        }
        gate.notify_one();
        panic!("progress never reached the store");
    };
    let (outcome, seen) = tokio::join!(engine.start_run(fx.ontology_id), watch);

    assert_eq!(seen.completed, 1);
    assert_eq!(seen.total, 4);
    assert_eq!(seen.message.as_deref(), Some("first table"));
    let outcome = outcome.unwrap();
    assert!(outcome.succeeded());
    let stored = engine
        .run_status(fx.ontology_id, &outcome.run.run_id)
        .unwrap();
    assert_eq!(stored.step(StepKind::Enrichment).unwrap().progress.completed, 4);
}

#[tokio::test]
async fn test_unknown_run_and_nil_ontology() {
    let fx = Fixture::new();
    let engine = fx.engine(fast_retries(3));
    assert!(matches!(
        engine.run_status(fx.ontology_id, "missing"),
        Err(ExtractError::RunNotFound { .. })
    ));
    assert!(matches!(
        engine.resume_run(fx.ontology_id, "missing").await,
        Err(ExtractError::RunNotFound { .. })
    ));
    let nil = OntologyId::from_uuid(uuid::Uuid::nil());
    assert!(matches!(
        engine.start_run(nil).await,
        Err(ExtractError::Configuration(_))
    ));
    assert!(engine.latest_run(fx.ontology_id).unwrap().is_none());
}
