//! Identity types: ontologies, tables, columns.

use crate::error::{CoreError, CoreResult};
use crate::identifier::define_identifier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of one ontology (one project's semantic layer).
///
/// Passed explicitly to every operation that reads or writes metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OntologyId(Uuid);

impl OntologyId {
    /// Generate a fresh random ontology id.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Whether this is the nil UUID, which is never a valid ontology.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for OntologyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OntologyId {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let id = Uuid::parse_str(s).map_err(|e| CoreError::InvalidOntologyId {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        if id.is_nil() {
            return Err(CoreError::InvalidOntologyId {
                value: s.to_string(),
                reason: "nil id".to_string(),
            });
        }
        Ok(Self(id))
    }
}

define_identifier! {
    /// Name of a table in the observed schema.
    pub struct TableName;
}

define_identifier! {
    /// Name of a column within a table.
    pub struct ColumnName;
}

/// Stable schema identity of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: TableName,
    pub column: ColumnName,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: TableName::new(table),
            column: ColumnName::new(column),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ontology_id_rejects_nil() {
        let err = OntologyId::from_str("00000000-0000-0000-0000-000000000000").unwrap_err();
        assert!(matches!(err, CoreError::InvalidOntologyId { .. }));
    }

    #[test]
    fn ontology_id_round_trips_through_display() {
        let id = OntologyId::new_random();
        let parsed: OntologyId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn blank_identifiers_are_rejected() {
        assert!(TableName::try_new("   ").is_none());
        assert!(ColumnName::try_new("").is_none());
        assert!(serde_json::from_str::<ColumnName>("\" \"").is_err());
    }

    #[test]
    fn quoted_escapes_embedded_quotes() {
        assert_eq!(TableName::new("odd\"name").quoted(), "\"odd\"\"name\"");
        assert_eq!(ColumnRef::new("users", "id").to_string(), "users.id");
    }
}
