//! of-extract - Extraction workflow engine for Ontoforge
//!
//! Sequences profiling, classification, relationship discovery, enrichment,
//! terminology discovery and finalization for one ontology at a time, with
//! per-step persistence, centralized retries and resumption.

pub mod context;
pub mod engine;
pub mod error;
pub mod progress;
pub mod refresh;
pub mod step;
pub mod steps;

pub use context::StepContext;
pub use engine::{Engine, RunOutcome};
pub use error::{ExtractError, ExtractResult, StepError, StepResult};
pub use progress::{ProgressEvent, ProgressReporter};
pub use refresh::{apply_snapshot, RefreshOutcome, SchemaRefresher};
pub use step::ExtractionStep;
pub use steps::OntologySummary;
