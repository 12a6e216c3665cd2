//! Metadata records tracked by the merge engine.

use chrono::{DateTime, Utc};
use of_core::{
    ColumnFeature, ColumnName, ColumnRef, ColumnRole, Provenance, SemanticType, TableName,
    VerifiedRelationship,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of fact stored in `ontology_records`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Entity,
    Relationship,
    ColumnAnnotation,
    GlossaryTerm,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Entity => "entity",
            RecordKind::Relationship => "relationship",
            RecordKind::ColumnAnnotation => "columnAnnotation",
            RecordKind::GlossaryTerm => "glossaryTerm",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema objects a record describes; used to retire records when the
/// objects disappear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordLocation {
    pub table: Option<TableName>,
    pub column: Option<ColumnName>,
    pub related_table: Option<TableName>,
    pub related_column: Option<ColumnName>,
}

/// A fact that can be merged into the store under provenance rules.
pub trait OntologyRecord: Serialize + DeserializeOwned {
    const KIND: RecordKind;

    /// Logical identity; two records with the same key are the same fact.
    fn record_key(&self) -> String;

    fn location(&self) -> RecordLocation {
        RecordLocation::default()
    }
}

/// A business entity backed by one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub table: TableName,
    pub name: String,
    pub description: Option<String>,
}

impl Entity {
    /// Entity named after its table, without a description.
    pub fn for_table(table: TableName) -> Self {
        Self {
            name: table.to_string(),
            table,
            description: None,
        }
    }
}

impl OntologyRecord for Entity {
    const KIND: RecordKind = RecordKind::Entity;

    fn record_key(&self) -> String {
        self.table.to_string()
    }

    fn location(&self) -> RecordLocation {
        RecordLocation {
            table: Some(self.table.clone()),
            ..RecordLocation::default()
        }
    }
}

impl OntologyRecord for VerifiedRelationship {
    const KIND: RecordKind = RecordKind::Relationship;

    fn record_key(&self) -> String {
        self.key.to_string()
    }

    fn location(&self) -> RecordLocation {
        RecordLocation {
            table: Some(self.key.source.table.clone()),
            column: Some(self.key.source.column.clone()),
            related_table: Some(self.key.target.table.clone()),
            related_column: Some(self.key.target.column.clone()),
        }
    }
}

/// Semantic annotation of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnAnnotation {
    pub column: ColumnRef,
    pub data_type: Option<String>,
    pub role: ColumnRole,
    pub semantic_type: SemanticType,
    pub description: Option<String>,
    pub confidence: f64,
}

impl ColumnAnnotation {
    /// Annotation with nothing known beyond the column's type.
    pub fn unclassified(column: ColumnRef, data_type: Option<String>) -> Self {
        Self {
            column,
            data_type,
            role: ColumnRole::Unknown,
            semantic_type: SemanticType::Unknown,
            description: None,
            confidence: 0.0,
        }
    }

    pub fn from_feature(feature: &ColumnFeature, data_type: Option<String>) -> Self {
        Self {
            column: feature.column.clone(),
            data_type,
            role: feature.role,
            semantic_type: feature.semantic_type,
            description: None,
            confidence: feature.confidence,
        }
    }
}

impl OntologyRecord for ColumnAnnotation {
    const KIND: RecordKind = RecordKind::ColumnAnnotation;

    fn record_key(&self) -> String {
        self.column.to_string()
    }

    fn location(&self) -> RecordLocation {
        RecordLocation {
            table: Some(self.column.table.clone()),
            column: Some(self.column.column.clone()),
            ..RecordLocation::default()
        }
    }
}

/// Business glossary term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlossaryTerm {
    pub term: String,
    pub definition: String,
    #[serde(default)]
    pub tables: Vec<TableName>,
}

impl OntologyRecord for GlossaryTerm {
    const KIND: RecordKind = RecordKind::GlossaryTerm;

    fn record_key(&self) -> String {
        self.term.trim().to_lowercase()
    }
}

/// A record as stored, with its provenance bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<R> {
    pub record: R,
    pub source: Provenance,
    pub last_edit_source: Provenance,
    pub stale: bool,
    pub updated_at: DateTime<Utc>,
}
