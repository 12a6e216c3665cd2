//! Provenance merge engine.
//!
//! Every write of an ontology fact goes through [`decide`]. Provenance only
//! moves toward higher precedence (`inferred < agentTool < manual`), and an
//! inference pass never mutates a record a curator owns.

use crate::error::MetaResult;
use crate::records::{
    ColumnAnnotation, Entity, GlossaryTerm, OntologyRecord, RecordKind, Stored,
};
use crate::row_helpers::{now_text, parse_literal, parse_time};
use crate::scope::OntologyScope;
use duckdb::{params, OptionalExt};
use of_core::{compute_checksum, Provenance, VerifiedRelationship};
use std::collections::HashSet;

/// What a write should do given the stored record's provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    Insert,
    /// Overwrite; `source` is the provenance the record ends up with.
    Update { source: Provenance },
    Skip { existing: Provenance },
}

/// The single precedence comparison used at every write site.
pub fn decide(existing: Option<Provenance>, incoming: Provenance) -> MergeDecision {
    match existing {
        None => MergeDecision::Insert,
        Some(existing) if existing.outranks(incoming) => MergeDecision::Skip { existing },
        Some(existing) => MergeDecision::Update {
            source: existing.promote(incoming),
        },
    }
}

/// Result of one upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
    /// Same content and provenance already stored.
    Unchanged,
    /// A higher-precedence record was left untouched.
    Skipped { existing: Provenance },
}

impl MergeOutcome {
    pub fn wrote(self) -> bool {
        matches!(self, MergeOutcome::Inserted | MergeOutcome::Updated)
    }
}

/// Counts from [`OntologyScope::retire_unobserved`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetireReport {
    pub deleted: usize,
    pub flagged_stale: usize,
}

/// A stored record up for retirement, as selected by
/// `SELECT kind, record_key, source, stale`.
pub(crate) struct Retiring {
    kind: String,
    key: String,
    source: String,
    stale: bool,
}

impl Retiring {
    pub(crate) fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            kind: row.get(0)?,
            key: row.get(1)?,
            source: row.get(2)?,
            stale: row.get(3)?,
        })
    }
}

struct Existing {
    source: Provenance,
    checksum: String,
    stale: bool,
}

impl<'a> OntologyScope<'a> {
    /// Merge `record` written by `source` into the store.
    pub fn upsert<R: OntologyRecord>(
        &self,
        record: &R,
        source: Provenance,
    ) -> MetaResult<MergeOutcome> {
        let key = record.record_key();
        let payload = serde_json::to_string(record)?;
        let checksum = compute_checksum(&payload);
        let existing = self.existing(R::KIND, &key)?;

        match decide(existing.as_ref().map(|e| e.source), source) {
            MergeDecision::Skip { existing } => {
                log::debug!(
                    "Skipping {} '{}': stored {} outranks incoming {}",
                    R::KIND,
                    key,
                    existing,
                    source
                );
                Ok(MergeOutcome::Skipped { existing })
            }
            MergeDecision::Insert => {
                let loc = record.location();
                let now = now_text();
                self.conn.execute(
                    "INSERT INTO of_meta.ontology_records
                        (ontology_id, kind, record_key, table_name, column_name,
                         related_table, related_column, payload, checksum,
                         source, last_edit_source, stale, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, false, ?, ?)",
                    params![
                        self.key(),
                        R::KIND.as_str(),
                        key,
                        loc.table.as_deref(),
                        loc.column.as_deref(),
                        loc.related_table.as_deref(),
                        loc.related_column.as_deref(),
                        payload,
                        checksum,
                        source.as_str(),
                        source.as_str(),
                        now,
                        now,
                    ],
                )?;
                Ok(MergeOutcome::Inserted)
            }
            MergeDecision::Update { source: merged } => {
                // `existing` is Some whenever decide() returns Update.
                let unchanged = existing
                    .as_ref()
                    .is_some_and(|e| e.checksum == checksum && e.source == merged && !e.stale);
                if unchanged {
                    return Ok(MergeOutcome::Unchanged);
                }
                self.conn.execute(
                    "UPDATE of_meta.ontology_records
                     SET payload = ?, checksum = ?, source = ?, last_edit_source = ?,
                         stale = false, updated_at = ?
                     WHERE ontology_id = ? AND kind = ? AND record_key = ?",
                    params![
                        payload,
                        checksum,
                        merged.as_str(),
                        source.as_str(),
                        now_text(),
                        self.key(),
                        R::KIND.as_str(),
                        key,
                    ],
                )?;
                Ok(MergeOutcome::Updated)
            }
        }
    }

    pub fn upsert_entity(&self, entity: &Entity, source: Provenance) -> MetaResult<MergeOutcome> {
        self.upsert(entity, source)
    }

    pub fn upsert_relationship(
        &self,
        relationship: &VerifiedRelationship,
        source: Provenance,
    ) -> MetaResult<MergeOutcome> {
        self.upsert(relationship, source)
    }

    pub fn upsert_column_annotation(
        &self,
        annotation: &ColumnAnnotation,
        source: Provenance,
    ) -> MetaResult<MergeOutcome> {
        self.upsert(annotation, source)
    }

    pub fn upsert_term(&self, term: &GlossaryTerm, source: Provenance) -> MetaResult<MergeOutcome> {
        self.upsert(term, source)
    }

    /// Load one record by logical key.
    pub fn get<R: OntologyRecord>(&self, key: &str) -> MetaResult<Option<Stored<R>>> {
        let row = self
            .conn
            .query_row(
                "SELECT payload, source, last_edit_source, stale, updated_at
                 FROM of_meta.ontology_records
                 WHERE ontology_id = ? AND kind = ? AND record_key = ?",
                params![self.key(), R::KIND.as_str(), key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;
        row.map(decode_stored).transpose()
    }

    /// All records of one kind, ordered by key.
    pub fn list<R: OntologyRecord>(&self) -> MetaResult<Vec<Stored<R>>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload, source, last_edit_source, stale, updated_at
             FROM of_meta.ontology_records
             WHERE ontology_id = ? AND kind = ?
             ORDER BY record_key",
        )?;
        let rows = stmt
            .query_map(params![self.key(), R::KIND.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(decode_stored).collect()
    }

    /// Retire records of kind `R` whose keys were not observed by the latest
    /// inference pass: inferred rows are deleted, curated rows are flagged
    /// stale and otherwise left alone.
    pub fn retire_unobserved<R: OntologyRecord>(
        &self,
        observed: &HashSet<String>,
    ) -> MetaResult<RetireReport> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, record_key, source, stale FROM of_meta.ontology_records
             WHERE ontology_id = ? AND kind = ?",
        )?;
        let rows = stmt
            .query_map(params![self.key(), R::KIND.as_str()], Retiring::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        let unobserved = rows.into_iter().filter(|r| !observed.contains(&r.key));

        let report = self.retire(unobserved)?;
        if report.deleted > 0 || report.flagged_stale > 0 {
            log::info!(
                "Retired unobserved {} records: {} deleted, {} flagged stale",
                R::KIND,
                report.deleted,
                report.flagged_stale
            );
        }
        Ok(report)
    }

    /// Retire facts inference no longer supports: rows inference may delete
    /// go, curated rows are flagged stale and kept.
    pub(crate) fn retire(
        &self,
        rows: impl IntoIterator<Item = Retiring>,
    ) -> MetaResult<RetireReport> {
        let mut report = RetireReport::default();
        for row in rows {
            let source: Provenance = parse_literal("record source", &row.source)?;
            if source.may_be_deleted_by_inference() {
                self.conn.execute(
                    "DELETE FROM of_meta.ontology_records
                     WHERE ontology_id = ? AND kind = ? AND record_key = ?",
                    params![self.key(), row.kind, row.key],
                )?;
                report.deleted += 1;
            } else if !row.stale {
                self.conn.execute(
                    "UPDATE of_meta.ontology_records SET stale = true
                     WHERE ontology_id = ? AND kind = ? AND record_key = ?",
                    params![self.key(), row.kind, row.key],
                )?;
                report.flagged_stale += 1;
            }
        }
        Ok(report)
    }

    fn existing(&self, kind: RecordKind, key: &str) -> MetaResult<Option<Existing>> {
        let row = self
            .conn
            .query_row(
                "SELECT source, checksum, stale FROM of_meta.ontology_records
                 WHERE ontology_id = ? AND kind = ? AND record_key = ?",
                params![self.key(), kind.as_str(), key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, bool>(2)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(source, checksum, stale)| {
            Ok(Existing {
                source: parse_literal("record source", &source)?,
                checksum,
                stale,
            })
        })
        .transpose()
    }
}

fn decode_stored<R: OntologyRecord>(
    (payload, source, last_edit_source, stale, updated_at): (String, String, String, bool, String),
) -> MetaResult<Stored<R>> {
    Ok(Stored {
        record: serde_json::from_str(&payload)?,
        source: parse_literal("record source", &source)?,
        last_edit_source: parse_literal("record source", &last_edit_source)?,
        stale,
        updated_at: parse_time("record timestamp", &updated_at)?,
    })
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod tests;
