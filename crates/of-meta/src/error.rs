//! Error types for the metadata store.

use of_core::{Classify, ErrorClass};
use thiserror::Error;

/// Metadata store errors.
#[derive(Error, Debug)]
pub enum MetaError {
    /// Failed to open or create the meta database (M001).
    #[error("[M001] Meta database connection failed: {0}")]
    ConnectionError(String),

    /// Schema migration failed (M002).
    #[error("[M002] Meta database migration failed: {0}")]
    MigrationError(String),

    /// SQL execution error inside the meta database (M003).
    #[error("[M003] Meta database query failed: {0}")]
    QueryError(String),

    /// Transaction management error (M004).
    #[error("[M004] Meta database transaction failed: {0}")]
    TransactionError(String),

    /// A stored value could not be decoded (M005).
    #[error("[M005] Corrupt {what} in meta database: {detail}")]
    Corrupt { what: &'static str, detail: String },

    /// Requested row does not exist in this ontology (M006).
    #[error("[M006] {what} '{key}' not found")]
    NotFound { what: &'static str, key: String },

    /// Another extraction run is still active for the ontology (M007).
    #[error("[M007] Extraction run '{run_id}' is already active for ontology {ontology_id}")]
    RunAlreadyActive { ontology_id: String, run_id: String },

    /// Review transition not allowed from the change's current status (M008).
    #[error("[M008] Cannot {action} change {id}: status is {status}")]
    InvalidTransition {
        id: i64,
        action: &'static str,
        status: String,
    },

    /// DuckDB driver error with preserved source chain (M009).
    #[error("[M009] DuckDB error")]
    DuckDb(#[source] duckdb::Error),
}

/// Result type alias for [`MetaError`].
pub type MetaResult<T> = Result<T, MetaError>;

impl From<duckdb::Error> for MetaError {
    fn from(err: duckdb::Error) -> Self {
        MetaError::DuckDb(err)
    }
}

impl From<serde_json::Error> for MetaError {
    fn from(err: serde_json::Error) -> Self {
        MetaError::Corrupt {
            what: "json payload",
            detail: err.to_string(),
        }
    }
}

impl Classify for MetaError {
    fn error_class(&self) -> ErrorClass {
        match self {
            MetaError::ConnectionError(msg) | MetaError::TransactionError(msg) => {
                match ErrorClass::from_message(msg) {
                    ErrorClass::Internal => ErrorClass::ResourceExhausted,
                    class => class,
                }
            }
            MetaError::QueryError(msg) => ErrorClass::from_message(msg),
            MetaError::DuckDb(err) => ErrorClass::from_message(&err.to_string()),
            MetaError::NotFound { .. }
            | MetaError::RunAlreadyActive { .. }
            | MetaError::InvalidTransition { .. } => ErrorClass::Validation,
            MetaError::MigrationError(_) | MetaError::Corrupt { .. } => ErrorClass::Internal,
        }
    }
}
