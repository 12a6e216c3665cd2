//! Meta database connection wrapper.
//!
//! [`MetaDb`] owns a DuckDB [`Connection`] and provides helpers for opening,
//! migrating, and transacting against the metadata store. Ontology data is
//! reached only through [`OntologyScope`].

use crate::error::{MetaError, MetaResult};
use crate::migration::run_migrations;
use crate::scope::OntologyScope;
use duckdb::Connection;
use of_core::OntologyId;
use std::path::Path;

/// Wrapper around a DuckDB connection to the metadata store.
///
/// Not `Sync`; callers that share it across tasks wrap it in a `Mutex`.
pub struct MetaDb {
    conn: Connection,
}

impl MetaDb {
    /// Open (or create) the meta database at `path` and run pending migrations.
    pub fn open(path: &Path) -> MetaResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MetaError::ConnectionError(format!("{e}: {}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| MetaError::ConnectionError(format!("{e}: {}", path.display())))?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Create an in-memory meta database with all migrations applied.
    pub fn open_memory() -> MetaResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| MetaError::ConnectionError(e.to_string()))?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Handle bound to one ontology.
    pub fn scope(&self, ontology_id: OntologyId) -> OntologyScope<'_> {
        OntologyScope::new(&self.conn, ontology_id)
    }

    /// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back on
    /// error.
    pub fn transaction<F, T>(&self, body: F) -> MetaResult<T>
    where
        F: FnOnce(&Connection) -> MetaResult<T>,
    {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| MetaError::TransactionError(format!("BEGIN failed: {e}")))?;

        let result = body(&self.conn);

        match &result {
            Ok(_) => {
                if let Err(commit_err) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(MetaError::TransactionError(format!(
                        "COMMIT failed: {commit_err}"
                    )));
                }
            }
            Err(_) => {
                let _ = self.conn.execute_batch("ROLLBACK");
            }
        }
        result
    }

    /// [`transaction`](Self::transaction) with an ontology-scoped handle.
    pub fn scoped_transaction<F, T>(&self, ontology_id: OntologyId, body: F) -> MetaResult<T>
    where
        F: FnOnce(&OntologyScope<'_>) -> MetaResult<T>,
    {
        self.transaction(|conn| body(&OntologyScope::new(conn, ontology_id)))
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
