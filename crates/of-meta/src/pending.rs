//! Pending schema changes: recording detected deltas and the review API.
//!
//! Destructive deltas are applied at detection time: inferred metadata for
//! the removed table or column is deleted and curated metadata is flagged
//! stale. Review operations on such auto-applied changes succeed without
//! side effects. None of these methods open a transaction; run them inside
//! [`MetaDb::scoped_transaction`](crate::MetaDb::scoped_transaction).

use crate::error::{MetaError, MetaResult};
use crate::merge::{MergeOutcome, Retiring};
use crate::records::{ColumnAnnotation, Entity};
use crate::row_helpers::{now_text, parse_literal, parse_opt_time, parse_time};
use crate::scope::OntologyScope;
use duckdb::{params, OptionalExt, Row};
use of_core::{
    ChangeStatus, ChangeType, ColumnName, ColumnRef, DetectedChange, PendingChange, Provenance,
    SchemaDiff, SuggestedAction, TableName,
};

const SELECT_RETIRING: &str = "SELECT kind, record_key, source, stale
     FROM of_meta.ontology_records WHERE ontology_id = ?";

const SELECT_CHANGE: &str = "SELECT change_id, change_type, table_name, column_name, old_value,
        new_value, suggested_action, status, detected_at, reviewed_at, reject_reason
     FROM of_meta.pending_changes";

/// Review API over one ontology's pending changes.
pub struct PendingChanges<'s, 'a> {
    scope: &'s OntologyScope<'a>,
}

impl<'a> OntologyScope<'a> {
    pub fn pending(&self) -> PendingChanges<'_, 'a> {
        PendingChanges { scope: self }
    }
}

type RawChange = (
    i64,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
    Option<String>,
    Option<String>,
);

fn read_raw(row: &Row<'_>) -> duckdb::Result<RawChange> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
    ))
}

fn decode(raw: RawChange) -> MetaResult<PendingChange> {
    let (id, change_type, table, column, old_value, new_value, action, status, detected, reviewed, reason) =
        raw;
    let table = TableName::try_new(table).ok_or(MetaError::Corrupt {
        what: "pending change",
        detail: format!("change {id} has a blank table name"),
    })?;
    Ok(PendingChange {
        id,
        change: DetectedChange {
            change_type: parse_literal("change type", &change_type)?,
            table,
            column: column.and_then(ColumnName::try_new),
            old_value,
            new_value,
        },
        status: parse_literal("change status", &status)?,
        suggested_action: action
            .map(|a| parse_literal::<SuggestedAction>("suggested action", &a))
            .transpose()?,
        detected_at: parse_time("detected_at", &detected)?,
        reviewed_at: parse_opt_time("reviewed_at", reviewed.as_deref())?,
        reject_reason: reason,
    })
}

impl PendingChanges<'_, '_> {
    /// Persist every change in `diff`, applying destructive ones immediately.
    ///
    /// A change identical to one still awaiting review is not recorded twice.
    pub fn record_changes(&self, diff: &SchemaDiff) -> MetaResult<Vec<PendingChange>> {
        let mut recorded = Vec::with_capacity(diff.changes.len());
        for change in &diff.changes {
            if let Some(existing) = self.find_open_duplicate(change)? {
                log::debug!("Change already pending: {}", change.description());
                recorded.push(existing);
                continue;
            }
            let status = change.change_type.initial_status();
            if change.change_type.is_destructive() {
                self.apply_removal(change)?;
            }
            let id: i64 = self.scope.conn.query_row(
                "INSERT INTO of_meta.pending_changes
                    (ontology_id, change_type, table_name, column_name, old_value, new_value,
                     suggested_action, status, detected_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                 RETURNING change_id",
                params![
                    self.scope.key(),
                    change.change_type.as_str(),
                    change.table.as_str(),
                    change.column.as_deref(),
                    change.old_value.as_deref(),
                    change.new_value.as_deref(),
                    change.change_type.suggested_action().map(|a| a.as_str()),
                    status.as_str(),
                    now_text(),
                ],
                |row| row.get(0),
            )?;
            log::info!("Recorded {} change {}: {}", status, id, change.description());
            recorded.push(self.get(id)?);
        }
        Ok(recorded)
    }

    /// Changes for this ontology, optionally filtered by status, oldest first.
    pub fn list(&self, status: Option<ChangeStatus>) -> MetaResult<Vec<PendingChange>> {
        let rows = match status {
            Some(status) => {
                let mut stmt = self.scope.conn.prepare(&format!(
                    "{SELECT_CHANGE} WHERE ontology_id = ? AND status = ? ORDER BY change_id"
                ))?;
                let rows = stmt
                    .query_map(params![self.scope.key(), status.as_str()], read_raw)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self.scope.conn.prepare(&format!(
                    "{SELECT_CHANGE} WHERE ontology_id = ? ORDER BY change_id"
                ))?;
                let rows = stmt
                    .query_map(params![self.scope.key()], read_raw)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        rows.into_iter().map(decode).collect()
    }

    pub fn get(&self, id: i64) -> MetaResult<PendingChange> {
        let raw = self
            .scope
            .conn
            .query_row(
                &format!("{SELECT_CHANGE} WHERE ontology_id = ? AND change_id = ?"),
                params![self.scope.key(), id],
                read_raw,
            )
            .optional()?
            .ok_or_else(|| MetaError::NotFound {
                what: "pending change",
                key: id.to_string(),
            })?;
        decode(raw)
    }

    /// Approve a change and apply its suggested action at inferred precedence.
    ///
    /// Auto-applied and already-approved changes are returned unchanged.
    pub fn approve(&self, id: i64) -> MetaResult<PendingChange> {
        let change = self.get(id)?;
        match change.status {
            ChangeStatus::AutoApplied | ChangeStatus::Approved => return Ok(change),
            ChangeStatus::Rejected => {
                return Err(MetaError::InvalidTransition {
                    id,
                    action: "approve",
                    status: change.status.to_string(),
                })
            }
            ChangeStatus::Pending => {}
        }

        if let Some(action) = change.suggested_action {
            let outcome = self.apply_action(action, &change.change)?;
            log::info!("Approved change {} ({}): {:?}", id, action, outcome);
        }
        self.set_status(id, ChangeStatus::Approved, None)?;
        self.get(id)
    }

    /// Reject a change, recording why.
    ///
    /// Auto-applied and already-rejected changes are returned unchanged.
    pub fn reject(&self, id: i64, reason: &str) -> MetaResult<PendingChange> {
        let change = self.get(id)?;
        match change.status {
            ChangeStatus::AutoApplied | ChangeStatus::Rejected => return Ok(change),
            ChangeStatus::Approved => {
                return Err(MetaError::InvalidTransition {
                    id,
                    action: "reject",
                    status: change.status.to_string(),
                })
            }
            ChangeStatus::Pending => {}
        }
        self.set_status(id, ChangeStatus::Rejected, Some(reason))?;
        self.get(id)
    }

    fn set_status(&self, id: i64, status: ChangeStatus, reason: Option<&str>) -> MetaResult<()> {
        self.scope.conn.execute(
            "UPDATE of_meta.pending_changes
             SET status = ?, reviewed_at = ?, reject_reason = ?
             WHERE ontology_id = ? AND change_id = ?",
            params![status.as_str(), now_text(), reason, self.scope.key(), id],
        )?;
        Ok(())
    }

    fn find_open_duplicate(&self, change: &DetectedChange) -> MetaResult<Option<PendingChange>> {
        let raw = self
            .scope
            .conn
            .query_row(
                &format!(
                    "{SELECT_CHANGE}
                     WHERE ontology_id = ? AND status = 'pending' AND change_type = ?
                       AND table_name = ? AND column_name IS NOT DISTINCT FROM ?
                       AND new_value IS NOT DISTINCT FROM ?
                     LIMIT 1"
                ),
                params![
                    self.scope.key(),
                    change.change_type.as_str(),
                    change.table.as_str(),
                    change.column.as_deref(),
                    change.new_value.as_deref(),
                ],
                read_raw,
            )
            .optional()?;
        raw.map(decode).transpose()
    }

    fn apply_action(
        &self,
        action: SuggestedAction,
        change: &DetectedChange,
    ) -> MetaResult<MergeOutcome> {
        let column_ref = || {
            change
                .column
                .clone()
                .map(|column| ColumnRef {
                    table: change.table.clone(),
                    column,
                })
                .ok_or_else(|| MetaError::Corrupt {
                    what: "pending change",
                    detail: format!("{action} requires a column on {}", change.table),
                })
        };
        match action {
            SuggestedAction::CreateEntity => self
                .scope
                .upsert_entity(&Entity::for_table(change.table.clone()), Provenance::Inferred),
            SuggestedAction::CreateColumnAnnotation => {
                let annotation =
                    ColumnAnnotation::unclassified(column_ref()?, change.new_value.clone());
                self.scope
                    .upsert_column_annotation(&annotation, Provenance::Inferred)
            }
            SuggestedAction::UpdateColumnAnnotation => {
                let column = column_ref()?;
                let mut annotation = self
                    .scope
                    .get::<ColumnAnnotation>(&column.to_string())?
                    .map(|stored| stored.record)
                    .unwrap_or_else(|| ColumnAnnotation::unclassified(column, None));
                annotation.data_type = change.new_value.clone();
                self.scope
                    .upsert_column_annotation(&annotation, Provenance::Inferred)
            }
        }
    }

    fn apply_removal(&self, change: &DetectedChange) -> MetaResult<()> {
        let conn = self.scope.conn;
        let ontology = self.scope.key();
        let table = change.table.as_str();
        let affected = match (&change.change_type, &change.column) {
            (ChangeType::TableRemoved, _) => {
                conn.execute(
                    "DELETE FROM of_meta.column_features WHERE ontology_id = ? AND table_name = ?",
                    params![ontology, table],
                )?;
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_RETIRING} AND (table_name = ? OR related_table = ?)"
                ))?;
                let rows = stmt.query_map(params![ontology, table, table], Retiring::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            (ChangeType::ColumnRemoved, Some(column)) => {
                let column = column.as_str();
                conn.execute(
                    "DELETE FROM of_meta.column_features
                     WHERE ontology_id = ? AND table_name = ? AND column_name = ?",
                    params![ontology, table, column],
                )?;
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_RETIRING} AND ((table_name = ? AND column_name = ?) \
                     OR (related_table = ? AND related_column = ?))"
                ))?;
                let rows = stmt.query_map(
                    params![ontology, table, column, table, column],
                    Retiring::from_row,
                )?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            _ => return Ok(()),
        };

        let report = self.scope.retire(affected)?;
        log::info!(
            "{}: deleted {} inferred records, flagged {} curated records stale",
            change.description(),
            report.deleted,
            report.flagged_stale
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "pending_test.rs"]
mod tests;
