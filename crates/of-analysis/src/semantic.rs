//! Semantic classifier collaborator.
//!
//! Consulted only for ambiguity the deterministic rules leave behind. A real
//! implementation would call a language model; the pipeline treats every
//! answer as optional.

use crate::error::AnalysisResult;
use async_trait::async_trait;
use of_core::{
    ColumnFeature, ColumnRef, ColumnRole, ColumnSchema, RelationshipRole, SchemaSnapshot,
    SemanticType, TableSchema, VerifiedRelationship,
};
use of_db::ColumnStats;

/// Everything known about a column when the semantic classifier is asked.
#[derive(Debug, Clone)]
pub struct ColumnContext {
    pub column: ColumnRef,
    pub schema: ColumnSchema,
    pub stats: ColumnStats,
    pub samples: Vec<String>,
    /// Best deterministic guess, if any rule matched
    pub rule_guess: Option<ColumnFeature>,
}

/// Semantic classifier answer for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticVerdict {
    pub role: ColumnRole,
    pub semantic_type: SemanticType,
    pub confidence: f64,
    pub reasoning: String,
}

/// Business term proposed from schema and features.
#[derive(Debug, Clone, PartialEq)]
pub struct TermSuggestion {
    pub term: String,
    pub definition: String,
    pub tables: Vec<of_core::TableName>,
}

/// Language-model-backed classification. Every method may decline with
/// `Ok(None)` (or an empty list).
#[async_trait]
pub trait SemanticClassifier: Send + Sync {
    async fn classify_column(&self, context: &ColumnContext)
        -> AnalysisResult<Option<SemanticVerdict>>;

    async fn assign_role(
        &self,
        relationship: &VerifiedRelationship,
    ) -> AnalysisResult<Option<RelationshipRole>>;

    async fn describe_entity(
        &self,
        table: &TableSchema,
        features: &[ColumnFeature],
    ) -> AnalysisResult<Option<String>>;

    async fn discover_terms(
        &self,
        schema: &SchemaSnapshot,
        features: &[ColumnFeature],
    ) -> AnalysisResult<Vec<TermSuggestion>>;

    /// Classifier name for logging
    fn name(&self) -> &'static str;
}

/// Classifier with no opinion on anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSemanticClassifier;

#[async_trait]
impl SemanticClassifier for NoopSemanticClassifier {
    async fn classify_column(
        &self,
        _context: &ColumnContext,
    ) -> AnalysisResult<Option<SemanticVerdict>> {
        Ok(None)
    }

    async fn assign_role(
        &self,
        _relationship: &VerifiedRelationship,
    ) -> AnalysisResult<Option<RelationshipRole>> {
        Ok(None)
    }

    async fn describe_entity(
        &self,
        _table: &TableSchema,
        _features: &[ColumnFeature],
    ) -> AnalysisResult<Option<String>> {
        Ok(None)
    }

    async fn discover_terms(
        &self,
        _schema: &SchemaSnapshot,
        _features: &[ColumnFeature],
    ) -> AnalysisResult<Vec<TermSuggestion>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
