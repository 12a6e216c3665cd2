//! of-core - Core library for Ontoforge
//!
//! Shared ontology types (schema snapshots, column features, relationships,
//! pending changes), provenance precedence, the centralized retry policy,
//! the extraction step DAG, run state, and configuration parsing used across
//! all Ontoforge crates.

pub mod cancel;
pub mod checksum;
pub mod config;
pub mod dag;
pub mod error;
pub mod features;
mod identifier;
pub mod ids;
mod literals;
pub mod pending_change;
pub mod provenance;
pub mod relationship;
pub mod retry;
pub mod run_state;
pub mod schema;
pub mod schema_diff;

pub use cancel::CancelFlag;
pub use checksum::compute_checksum;
pub use config::{AnalysisConfig, ClassifierConfig, Config, PoolConfig, TypePair};
pub use dag::{StepDag, StepKind};
pub use error::{CoreError, CoreResult};
pub use features::{
    ClassificationPath, ColumnFeature, ColumnRole, ConfidenceBand, EnumValue, FeatureDetails,
    FeatureFlags, IdentifierFormat, SemanticType, AUTO_APPLY_CONFIDENCE, FLAG_CONFIDENCE,
};
pub use ids::{ColumnName, ColumnRef, OntologyId, TableName};
pub use pending_change::{
    ChangeStatus, ChangeType, DetectedChange, PendingChange, SuggestedAction,
};
pub use provenance::Provenance;
pub use relationship::{
    Cardinality, JoinStats, RelationshipCandidate, RelationshipKey, RelationshipRole,
    VerifiedRelationship,
};
pub use retry::{Classify, ErrorClass, RetryDecision, RetryPolicy, RetryTracker};
pub use run_state::{ExtractionRun, RunStatus, RunSummary, StepProgress, StepState, StepStatus};
pub use schema::{ColumnSchema, SchemaSnapshot, TableSchema, TypeFamily};
pub use schema_diff::{diff_schemas, SchemaDiff};
