//! Ontology-scoped access to the metadata store.

use duckdb::Connection;
use of_core::OntologyId;

/// Handle bound to one ontology.
///
/// Every statement issued through a scope filters or stamps `ontology_id`,
/// so one ontology's rows are unreachable from another's handle. Obtain one
/// with [`MetaDb::scope`](crate::MetaDb::scope) or inside
/// [`MetaDb::scoped_transaction`](crate::MetaDb::scoped_transaction).
pub struct OntologyScope<'a> {
    pub(crate) conn: &'a Connection,
    ontology_id: OntologyId,
    key: String,
}

impl<'a> OntologyScope<'a> {
    pub(crate) fn new(conn: &'a Connection, ontology_id: OntologyId) -> Self {
        Self {
            conn,
            ontology_id,
            key: ontology_id.to_string(),
        }
    }

    pub fn ontology_id(&self) -> OntologyId {
        self.ontology_id
    }

    /// Ontology id as bound into statements.
    pub(crate) fn key(&self) -> &str {
        &self.key
    }
}
