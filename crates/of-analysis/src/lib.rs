//! of-analysis - Column classification and relationship resolution for Ontoforge
//!
//! The classifier turns profiled columns into [`ColumnFeature`]s; the
//! resolver turns identifier features into data-verified relationships.
//! Both fan work out through a bounded [`WorkerPool`] and consult a
//! [`SemanticClassifier`] only where deterministic analysis runs out.
//!
//! [`ColumnFeature`]: of_core::ColumnFeature

pub mod classifier;
pub mod error;
pub mod pool;
pub mod resolver;
pub mod semantic;

pub use classifier::ColumnClassifier;
pub use error::{AnalysisError, AnalysisResult};
pub use pool::WorkerPool;
pub use resolver::{RelationshipResolver, ResolveReport};
pub use semantic::{
    ColumnContext, NoopSemanticClassifier, SemanticClassifier, SemanticVerdict, TermSuggestion,
};
