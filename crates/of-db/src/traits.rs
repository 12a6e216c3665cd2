//! Data source trait definition

use crate::error::DbResult;
use async_trait::async_trait;
use of_core::{ColumnRef, EnumValue, JoinStats, SchemaSnapshot};

/// Aggregate statistics for one column, computed over the full table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnStats {
    pub row_count: u64,
    pub null_count: u64,
    pub distinct_count: u64,
    /// Shortest rendered value, in characters
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    /// Smallest value rendered as text
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    /// Most frequent non-null values, descending by count
    pub top_values: Vec<EnumValue>,
}

impl ColumnStats {
    pub fn non_null_count(&self) -> u64 {
        self.row_count.saturating_sub(self.null_count)
    }

    /// Fraction of rows that are null; 0.0 for an empty table.
    pub fn null_rate(&self) -> f64 {
        if self.row_count == 0 {
            0.0
        } else {
            self.null_count as f64 / self.row_count as f64
        }
    }

    /// Whether every non-null value is distinct.
    pub fn is_unique(&self) -> bool {
        self.non_null_count() > 0 && self.distinct_count == self.non_null_count()
    }
}

/// Outcome of probing sampled source values against a target column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlapSample {
    /// Distinct non-null source values sampled
    pub sampled: u64,
    /// How many of those occur in the target
    pub matched: u64,
}

/// Read-only view of the database an ontology describes.
///
/// Implementations must be Send + Sync for async operation. Values are
/// compared as lower-cased text so that UUID and text encodings of the same
/// identifier match.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Enumerate tables, columns, types and primary keys
    async fn get_schema(&self) -> DbResult<SchemaSnapshot>;

    /// Full-table statistics for one column, with up to `top_values` frequent values
    async fn profile_column(&self, column: &ColumnRef, top_values: usize)
        -> DbResult<ColumnStats>;

    /// Reservoir sample of non-null values rendered as text
    async fn sample_values(&self, column: &ColumnRef, limit: usize) -> DbResult<Vec<String>>;

    /// Sample up to `sample_size` distinct source values and count how many
    /// are present in the target column
    async fn test_overlap(
        &self,
        source: &ColumnRef,
        target: &ColumnRef,
        sample_size: usize,
    ) -> DbResult<OverlapSample>;

    /// Join statistics over the complete data of both columns
    async fn verify_relationship(
        &self,
        source: &ColumnRef,
        target: &ColumnRef,
    ) -> DbResult<JoinStats>;

    /// Source type identifier for logging
    fn source_type(&self) -> &'static str;
}
