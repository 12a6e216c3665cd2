//! Progress events emitted while a run executes.

use crate::error::{StepError, StepResult};
use of_core::{ExtractionRun, StepKind};
use of_meta::MetaDb;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

/// Minimum spacing between persisted progress snapshots of one run.
pub const PERSIST_INTERVAL: Duration = Duration::from_millis(200);

/// One progress update. `sequence` strictly increases within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub run_id: String,
    pub step: StepKind,
    pub sequence: u64,
    pub completed: u64,
    pub total: u64,
    pub message: Option<String>,
}

/// Writes progress onto the run's step state, forwards it to an optional
/// listener, and persists it so pollers of the stored run see it.
#[derive(Clone)]
pub struct ProgressReporter {
    run: Arc<Mutex<ExtractionRun>>,
    listener: Option<UnboundedSender<ProgressEvent>>,
    store: Option<Arc<Mutex<MetaDb>>>,
    last_saved: Arc<Mutex<Option<(StepKind, Instant)>>>,
}

impl ProgressReporter {
    pub fn new(run: Arc<Mutex<ExtractionRun>>, listener: Option<UnboundedSender<ProgressEvent>>) -> Self {
        Self {
            run,
            listener,
            store: None,
            last_saved: Arc::new(Mutex::new(None)),
        }
    }

    /// Persist progress into `meta`, at most once per [`PERSIST_INTERVAL`]
    /// within a step. A step's first update and its finishing update are
    /// always saved.
    pub fn persisting_to(mut self, meta: Arc<Mutex<MetaDb>>) -> Self {
        self.store = Some(meta);
        self
    }

    pub fn report(
        &self,
        step: StepKind,
        completed: u64,
        total: u64,
        message: Option<String>,
    ) -> StepResult<()> {
        let event = {
            let mut run = self.run.lock().map_err(|_| StepError::Poisoned("run state"))?;
            let sequence = run.record_progress(step, completed, total, message.clone());
            // saved under the run lock so a step transition is never overwritten
            self.persist(&run, step, completed >= total);
            ProgressEvent {
                run_id: run.run_id.clone(),
                step,
                sequence,
                completed,
                total,
                message,
            }
        };
        if let Some(listener) = &self.listener {
            // A dropped receiver only means nobody is watching.
            let _ = listener.send(event);
        }
        Ok(())
    }

    /// Progress callback for pool-driven work; lock failures are logged.
    pub fn counter(&self, step: StepKind) -> impl Fn(usize, usize) + Sync + '_ {
        move |completed, total| {
            if let Err(e) = self.report(step, completed as u64, total as u64, None) {
                log::warn!("Dropped progress update for {}: {}", step, e);
            }
        }
    }

    fn persist(&self, run: &ExtractionRun, step: StepKind, finished: bool) {
        let Some(store) = &self.store else {
            return;
        };
        let Ok(mut last_saved) = self.last_saved.lock() else {
            return;
        };
        let recent = last_saved
            .is_some_and(|(saved, at)| saved == step && at.elapsed() < PERSIST_INTERVAL);
        if !finished && recent {
            return;
        }
        let saved = store
            .lock()
            .map_err(|_| StepError::Poisoned("metadata store"))
            .and_then(|meta| Ok(meta.scope(run.ontology_id).save_run(run)?));
        match saved {
            Ok(()) => *last_saved = Some((step, Instant::now())),
            Err(e) => log::warn!("Progress of run {} not persisted: {}", run.run_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use of_core::OntologyId;
    use tokio::sync::mpsc;

    #[test]
    fn test_sequence_increases_across_steps() {
        let run = ExtractionRun::new(OntologyId::new_random(), &StepKind::ALL);
        let run = Arc::new(Mutex::new(run));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(run.clone(), Some(tx));

        reporter.report(StepKind::Profiling, 1, 1, None).unwrap();
        reporter.counter(StepKind::Classification)(3, 10);
        reporter
            .report(StepKind::Classification, 10, 10, Some("done".into()))
            .unwrap();

        let mut sequences = Vec::new();
        while let Ok(event) = rx.try_recv() {
            sequences.push(event.sequence);
        }
        assert_eq!(sequences, vec![1, 2, 3]);

        let run = run.lock().unwrap();
        let step = run.step(StepKind::Classification).unwrap();
        assert_eq!(step.progress.completed, 10);
        assert_eq!(step.progress.sequence, 3);
    }

    #[test]
    fn test_progress_is_persisted_and_throttled() {
        let meta = Arc::new(Mutex::new(MetaDb::open_memory().unwrap()));
        let run = ExtractionRun::new(OntologyId::new_random(), &StepKind::ALL);
        let (ontology_id, run_id) = (run.ontology_id, run.run_id.clone());
        meta.lock().unwrap().scope(ontology_id).begin_run(&run).unwrap();
        let reporter =
            ProgressReporter::new(Arc::new(Mutex::new(run)), None).persisting_to(meta.clone());
        let stored = |step| {
            let meta = meta.lock().unwrap();
            let run = meta.scope(ontology_id).load_run(&run_id).unwrap().unwrap();
            run.step(step).unwrap().progress.clone()
        };

        reporter.report(StepKind::Classification, 1, 10, None).unwrap();
        assert_eq!(stored(StepKind::Classification).completed, 1);

        // inside the interval: kept in memory only
        reporter.report(StepKind::Classification, 2, 10, None).unwrap();
        assert_eq!(stored(StepKind::Classification).completed, 1);

        // finishing a step's work is always saved
        reporter.report(StepKind::Classification, 10, 10, None).unwrap();
        assert_eq!(stored(StepKind::Classification).completed, 10);

        // so is the first update of the next step
        reporter.report(StepKind::Enrichment, 1, 3, None).unwrap();
        assert_eq!(stored(StepKind::Enrichment).completed, 1);
    }

    #[test]
    fn test_report_without_listener() {
        let run = ExtractionRun::new(OntologyId::new_random(), &StepKind::ALL);
        let reporter = ProgressReporter::new(Arc::new(Mutex::new(run)), None);
        assert!(reporter.report(StepKind::Profiling, 0, 0, None).is_ok());
    }
}
