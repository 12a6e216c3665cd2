//! Schema refresh: diff the live schema against the stored baseline.

use crate::error::{ExtractError, ExtractResult};
use of_core::{diff_schemas, OntologyId, PendingChange, SchemaSnapshot};
use of_db::DataSource;
use of_meta::{MetaDb, MetaResult, OntologyScope};
use std::sync::{Arc, Mutex};

/// What storing a fresh snapshot did.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// No previous snapshot; this one is the baseline.
    Baseline,
    /// Same fingerprint as the stored snapshot.
    Unchanged,
    /// Differences were recorded as pending changes.
    Changed(Vec<PendingChange>),
}

impl RefreshOutcome {
    pub fn changes(&self) -> &[PendingChange] {
        match self {
            RefreshOutcome::Changed(changes) => changes,
            _ => &[],
        }
    }
}

/// Compare `fresh` with the stored snapshot, record the difference and make
/// `fresh` the new baseline. Call inside a scoped transaction.
pub fn apply_snapshot(scope: &OntologyScope<'_>, fresh: &SchemaSnapshot) -> MetaResult<RefreshOutcome> {
    let Some(previous) = scope.latest_snapshot()? else {
        scope.save_snapshot(fresh)?;
        log::info!(
            "Stored baseline snapshot for {} ({} tables)",
            scope.ontology_id(),
            fresh.tables.len()
        );
        return Ok(RefreshOutcome::Baseline);
    };
    if previous.fingerprint() == fresh.fingerprint() {
        return Ok(RefreshOutcome::Unchanged);
    }

    let diff = diff_schemas(&previous, fresh);
    let changes = scope.pending().record_changes(&diff)?;
    scope.save_snapshot(fresh)?;
    log::info!(
        "Schema of {} changed: {} changes recorded",
        scope.ontology_id(),
        changes.len()
    );
    Ok(RefreshOutcome::Changed(changes))
}

/// Fetches the live schema and records how it moved since the last snapshot.
pub struct SchemaRefresher {
    source: Arc<dyn DataSource>,
    meta: Arc<Mutex<MetaDb>>,
}

impl SchemaRefresher {
    pub fn new(source: Arc<dyn DataSource>, meta: Arc<Mutex<MetaDb>>) -> Self {
        Self { source, meta }
    }

    pub async fn refresh(&self, ontology_id: OntologyId) -> ExtractResult<RefreshOutcome> {
        if ontology_id.is_nil() {
            return Err(ExtractError::Configuration(
                "schema refresh requires an ontology id".to_string(),
            ));
        }
        let fresh = self.source.get_schema().await?;
        let meta = self
            .meta
            .lock()
            .map_err(|_| ExtractError::Poisoned("metadata store"))?;
        Ok(meta.scoped_transaction(ontology_id, |scope| apply_snapshot(scope, &fresh))?)
    }
}

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;
