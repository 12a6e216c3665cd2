//! Everything a step needs, handed to it by the engine.

use crate::error::{StepError, StepResult};
use crate::progress::ProgressReporter;
use of_analysis::{SemanticClassifier, WorkerPool};
use of_core::{CancelFlag, ColumnFeature, Config, OntologyId, SchemaSnapshot, StepKind};
use of_db::DataSource;
use of_meta::{MetaDb, OntologyScope};
use std::sync::{Arc, Mutex};

pub struct StepContext {
    pub ontology_id: OntologyId,
    pub run_id: String,
    pub source: Arc<dyn DataSource>,
    pub semantic: Arc<dyn SemanticClassifier>,
    pub config: Arc<Config>,
    pub pool: WorkerPool,
    pub cancel: CancelFlag,
    pub progress: ProgressReporter,
    meta: Arc<Mutex<MetaDb>>,
}

impl StepContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ontology_id: OntologyId,
        run_id: String,
        source: Arc<dyn DataSource>,
        semantic: Arc<dyn SemanticClassifier>,
        config: Arc<Config>,
        pool: WorkerPool,
        cancel: CancelFlag,
        progress: ProgressReporter,
        meta: Arc<Mutex<MetaDb>>,
    ) -> Self {
        Self {
            ontology_id,
            run_id,
            source,
            semantic,
            config,
            pool,
            cancel,
            progress,
            meta,
        }
    }

    /// Fail fast when the identifiers every step relies on are missing.
    pub fn require_identifiers(&self, step: StepKind) -> StepResult<()> {
        if self.ontology_id.is_nil() {
            return Err(StepError::Configuration(format!(
                "{step} requires an ontology id"
            )));
        }
        if self.run_id.trim().is_empty() {
            return Err(StepError::Configuration(format!("{step} requires a run id")));
        }
        Ok(())
    }

    pub fn check_cancelled(&self) -> StepResult<()> {
        if self.cancel.is_cancelled() {
            Err(StepError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run `body` in one metadata transaction scoped to this ontology.
    pub fn with_store<T>(
        &self,
        body: impl FnOnce(&OntologyScope<'_>) -> of_meta::MetaResult<T>,
    ) -> StepResult<T> {
        let meta = self.meta.lock().map_err(|_| StepError::Poisoned("metadata store"))?;
        Ok(meta.scoped_transaction(self.ontology_id, body)?)
    }

    /// The schema snapshot stored by profiling.
    pub fn snapshot(&self, step: StepKind) -> StepResult<SchemaSnapshot> {
        self.with_store(|scope| scope.latest_snapshot())?
            .ok_or(StepError::MissingInput {
                step,
                what: "schema snapshot",
            })
    }

    /// Column features stored by classification.
    pub fn features(&self, step: StepKind) -> StepResult<Vec<ColumnFeature>> {
        let features = self.with_store(|scope| scope.load_features())?;
        if features.is_empty() {
            return Err(StepError::MissingInput {
                step,
                what: "column features",
            });
        }
        Ok(features)
    }
}
