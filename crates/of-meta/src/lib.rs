//! Metadata store for Ontoforge.
//!
//! A DuckDB-backed store for ontology facts (entities, relationships, column
//! annotations, glossary terms) with provenance-aware merging, pending schema
//! changes, classifier output, schema snapshots and extraction run state.

pub mod connection;
pub mod ddl;
pub mod error;
pub mod merge;
pub mod migration;
pub mod pending;
pub mod records;
pub(crate) mod row_helpers;
pub mod runs;
pub mod scope;
pub mod store;

pub use connection::MetaDb;
pub use error::{MetaError, MetaResult};
pub use merge::{decide, MergeDecision, MergeOutcome, RetireReport};
pub use pending::PendingChanges;
pub use records::{
    ColumnAnnotation, Entity, GlossaryTerm, OntologyRecord, RecordKind, RecordLocation, Stored,
};
pub use scope::OntologyScope;
