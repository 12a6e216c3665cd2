//! Error types for of-db

use of_core::{Classify, ErrorClass};
use thiserror::Error;

/// Data source operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Data source connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// Column not found (D004)
    #[error("[D004] Column not found: {0}")]
    ColumnNotFound(String),

    /// Mutex poisoned (D006)
    #[error("[D006] Data source mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Transient failure reported by the source (D008)
    #[error("[D008] Transient data source failure ({class}): {message}")]
    Transient { class: ErrorClass, message: String },
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured variants, so the message
        // is the only thing to classify on.
        let msg = err.to_string();
        if msg.contains("Table with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else if msg.contains("Referenced column") && msg.contains("not found") {
            DbError::ColumnNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}

impl Classify for DbError {
    fn error_class(&self) -> ErrorClass {
        match self {
            DbError::ConnectionError(_) => ErrorClass::Network,
            DbError::Transient { class, .. } => *class,
            DbError::TableNotFound(_) | DbError::ColumnNotFound(_) => ErrorClass::Validation,
            DbError::MutexPoisoned(_) => ErrorClass::Internal,
            DbError::ExecutionError(msg) => ErrorClass::from_message(msg),
        }
    }
}
