//! Error types for of-analysis

use of_core::{Classify, ColumnRef, ErrorClass};
use of_db::DbError;
use thiserror::Error;

/// Analysis errors
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Data source query failed (A001)
    #[error("[A001] Data source query for {column} failed: {source}")]
    Source {
        column: ColumnRef,
        #[source]
        source: DbError,
    },

    /// Semantic classifier call failed (A002)
    #[error("[A002] Semantic classifier failed ({class}): {message}")]
    Classifier { class: ErrorClass, message: String },

    /// Work was cancelled before completion (A003)
    #[error("[A003] Analysis cancelled")]
    Cancelled,

    /// Input did not satisfy a precondition (A004)
    #[error("[A004] Invalid analysis input: {0}")]
    InvalidInput(String),
}

/// Result type alias for AnalysisError
pub type AnalysisResult<T> = Result<T, AnalysisError>;

impl AnalysisError {
    pub fn source(column: &ColumnRef, source: DbError) -> Self {
        AnalysisError::Source {
            column: column.clone(),
            source,
        }
    }
}

impl Classify for AnalysisError {
    fn error_class(&self) -> ErrorClass {
        match self {
            AnalysisError::Source { source, .. } => source.error_class(),
            AnalysisError::Classifier { class, .. } => *class,
            AnalysisError::Cancelled => ErrorClass::Cancelled,
            AnalysisError::InvalidInput(_) => ErrorClass::Validation,
        }
    }
}
