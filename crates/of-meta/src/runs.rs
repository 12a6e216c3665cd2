//! Extraction run persistence.

use crate::error::{MetaError, MetaResult};
use crate::row_helpers::now_text;
use crate::scope::OntologyScope;
use duckdb::{params, OptionalExt};
use of_core::{ExtractionRun, RunStatus};

impl<'a> OntologyScope<'a> {
    /// Store a new run, refusing when another run of this ontology is still
    /// `running`. Call inside a scoped transaction so the check and the
    /// insert are atomic.
    pub fn begin_run(&self, run: &ExtractionRun) -> MetaResult<()> {
        if let Some(active) = self.active_run_id()? {
            return Err(MetaError::RunAlreadyActive {
                ontology_id: self.key().to_string(),
                run_id: active,
            });
        }
        self.conn.execute(
            "INSERT INTO of_meta.extraction_runs
                (run_id, ontology_id, status, failed_step, payload, started_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                run.run_id,
                self.key(),
                run.status.as_str(),
                run.failed_step.map(|s| s.as_str()),
                serde_json::to_string(run)?,
                run.started_at.to_rfc3339(),
                now_text(),
            ],
        )?;
        Ok(())
    }

    /// Persist the current state of a run.
    pub fn save_run(&self, run: &ExtractionRun) -> MetaResult<()> {
        let updated = self.conn.execute(
            "UPDATE of_meta.extraction_runs
             SET status = ?, failed_step = ?, payload = ?, updated_at = ?
             WHERE ontology_id = ? AND run_id = ?",
            params![
                run.status.as_str(),
                run.failed_step.map(|s| s.as_str()),
                serde_json::to_string(run)?,
                now_text(),
                self.key(),
                run.run_id,
            ],
        )?;
        if updated == 0 {
            return Err(MetaError::NotFound {
                what: "extraction run",
                key: run.run_id.clone(),
            });
        }
        Ok(())
    }

    pub fn load_run(&self, run_id: &str) -> MetaResult<Option<ExtractionRun>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM of_meta.extraction_runs WHERE ontology_id = ? AND run_id = ?",
                params![self.key(), run_id],
                |row| row.get(0),
            )
            .optional()?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(MetaError::from))
            .transpose()
    }

    /// The run still marked `running` for this ontology, if any.
    pub fn active_run_id(&self) -> MetaResult<Option<String>> {
        let run_id = self
            .conn
            .query_row(
                "SELECT run_id FROM of_meta.extraction_runs
                 WHERE ontology_id = ? AND status = ?
                 ORDER BY started_at DESC LIMIT 1",
                params![self.key(), RunStatus::Running.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(run_id)
    }

    /// Most recently started run.
    pub fn latest_run(&self) -> MetaResult<Option<ExtractionRun>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM of_meta.extraction_runs
                 WHERE ontology_id = ? ORDER BY started_at DESC LIMIT 1",
                params![self.key()],
                |row| row.get(0),
            )
            .optional()?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(MetaError::from))
            .transpose()
    }
}

#[cfg(test)]
#[path = "runs_test.rs"]
mod tests;
