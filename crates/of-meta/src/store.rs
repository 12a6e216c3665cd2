//! Classifier output and schema snapshot persistence.

use crate::error::MetaResult;
use crate::row_helpers::now_text;
use crate::scope::OntologyScope;
use duckdb::{params, OptionalExt};
use of_core::{ColumnFeature, SchemaSnapshot};

impl<'a> OntologyScope<'a> {
    /// Replace stored features for the given columns.
    pub fn save_features(&self, features: &[ColumnFeature]) -> MetaResult<()> {
        let now = now_text();
        for feature in features {
            self.conn.execute(
                "INSERT OR REPLACE INTO of_meta.column_features
                    (ontology_id, table_name, column_name, role, semantic_type,
                     confidence, payload, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    self.key(),
                    feature.column.table.as_str(),
                    feature.column.column.as_str(),
                    feature.role.as_str(),
                    feature.semantic_type.as_str(),
                    feature.confidence,
                    serde_json::to_string(feature)?,
                    now,
                ],
            )?;
        }
        Ok(())
    }

    /// All stored features, ordered by table then column.
    pub fn load_features(&self) -> MetaResult<Vec<ColumnFeature>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM of_meta.column_features
             WHERE ontology_id = ? ORDER BY table_name, column_name",
        )?;
        let payloads = stmt
            .query_map(params![self.key()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        payloads
            .iter()
            .map(|p| Ok(serde_json::from_str(p)?))
            .collect()
    }

    /// Store a snapshot as the new diff baseline.
    pub fn save_snapshot(&self, snapshot: &SchemaSnapshot) -> MetaResult<()> {
        self.conn.execute(
            "INSERT INTO of_meta.schema_snapshots (ontology_id, fingerprint, payload, captured_at)
             VALUES (?, ?, ?, ?)",
            params![
                self.key(),
                snapshot.fingerprint(),
                serde_json::to_string(snapshot)?,
                now_text(),
            ],
        )?;
        Ok(())
    }

    /// The most recently stored snapshot.
    pub fn latest_snapshot(&self) -> MetaResult<Option<SchemaSnapshot>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM of_meta.schema_snapshots
                 WHERE ontology_id = ? ORDER BY snapshot_id DESC LIMIT 1",
                params![self.key()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload.map(|p| serde_json::from_str(&p)).transpose()?)
    }
}
