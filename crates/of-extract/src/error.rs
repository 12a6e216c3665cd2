//! Error types for of-extract

use of_analysis::AnalysisError;
use of_core::{Classify, CoreError, ErrorClass, OntologyId, StepKind};
use of_db::DbError;
use of_meta::MetaError;
use thiserror::Error;

/// Failure of one step attempt. Its [`ErrorClass`] decides whether the
/// engine retries.
#[derive(Error, Debug)]
pub enum StepError {
    /// Required identifier or setting missing (X001)
    #[error("[X001] Step configuration error: {0}")]
    Configuration(String),

    /// An earlier step's output is missing from the store (X002)
    #[error("[X002] {step} needs {what}, which no earlier step stored")]
    MissingInput { step: StepKind, what: &'static str },

    /// Data source failure (X003)
    #[error("[X003] {0}")]
    Source(#[from] DbError),

    /// Metadata store failure (X004)
    #[error("[X004] {0}")]
    Meta(#[from] MetaError),

    /// Classifier or resolver failure (X005)
    #[error("[X005] {0}")]
    Analysis(#[from] AnalysisError),

    /// Run cancelled while the step was in flight (X006)
    #[error("[X006] Step cancelled")]
    Cancelled,

    /// Shared state lock poisoned (X007)
    #[error("[X007] Internal lock poisoned: {0}")]
    Poisoned(&'static str),

    /// Every column failed analysis; classified from the first failure (X008)
    #[error("[X008] All {count} columns failed analysis ({class}): {first}")]
    AllColumnsFailed {
        count: usize,
        class: ErrorClass,
        first: String,
    },
}

/// Result type alias for StepError
pub type StepResult<T> = Result<T, StepError>;

impl Classify for StepError {
    fn error_class(&self) -> ErrorClass {
        match self {
            StepError::Configuration(_) => ErrorClass::Configuration,
            StepError::MissingInput { .. } => ErrorClass::Validation,
            StepError::Source(e) => e.error_class(),
            StepError::Meta(e) => e.error_class(),
            StepError::Analysis(e) => e.error_class(),
            StepError::Cancelled => ErrorClass::Cancelled,
            StepError::Poisoned(_) => ErrorClass::Internal,
            StepError::AllColumnsFailed { class, .. } => *class,
        }
    }
}

/// Engine-level errors: the run could not be started, found or resumed.
/// A run that starts and then fails is reported through its outcome.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Another run of this ontology has not finished (X010)
    #[error("[X010] Ontology {ontology_id} already has an active run: {run_id}")]
    RunAlreadyActive {
        ontology_id: OntologyId,
        run_id: String,
    },

    /// No such run for this ontology (X011)
    #[error("[X011] Run '{run_id}' not found for ontology {ontology_id}")]
    RunNotFound {
        ontology_id: OntologyId,
        run_id: String,
    },

    /// Run cannot be resumed (X012)
    #[error("[X012] Run '{run_id}' cannot be resumed: {reason}")]
    NotResumable { run_id: String, reason: String },

    /// Metadata store failure outside any step (X013)
    #[error("[X013] {0}")]
    Meta(#[from] MetaError),

    /// Data source failure outside any step (X014)
    #[error("[X014] {0}")]
    Source(#[from] DbError),

    /// Step graph invalid (X015)
    #[error("[X015] {0}")]
    Dag(#[from] CoreError),

    /// Invalid identifier passed to the engine (X016)
    #[error("[X016] {0}")]
    Configuration(String),

    /// Shared state lock poisoned (X017)
    #[error("[X017] Internal lock poisoned: {0}")]
    Poisoned(&'static str),
}

/// Result type alias for ExtractError
pub type ExtractResult<T> = Result<T, ExtractError>;

impl Classify for ExtractError {
    fn error_class(&self) -> ErrorClass {
        match self {
            ExtractError::RunAlreadyActive { .. }
            | ExtractError::RunNotFound { .. }
            | ExtractError::NotResumable { .. } => ErrorClass::Validation,
            ExtractError::Meta(e) => e.error_class(),
            ExtractError::Source(e) => e.error_class(),
            ExtractError::Dag(_) | ExtractError::Configuration(_) => ErrorClass::Configuration,
            ExtractError::Poisoned(_) => ErrorClass::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_classes() {
        assert_eq!(
            StepError::Configuration("missing ontology id".into()).error_class(),
            ErrorClass::Configuration
        );
        assert_eq!(StepError::Cancelled.error_class(), ErrorClass::Cancelled);
        let transient = StepError::Source(DbError::Transient {
            class: ErrorClass::RateLimited,
            message: "slow down".into(),
        });
        assert!(transient.error_class().is_retryable());
    }

    #[test]
    fn test_error_codes_in_messages() {
        let err = ExtractError::NotResumable {
            run_id: "r1".into(),
            reason: "already succeeded".into(),
        };
        assert!(err.to_string().starts_with("[X012]"));
        let err = StepError::MissingInput {
            step: StepKind::Classification,
            what: "schema snapshot",
        };
        assert!(err.to_string().contains("classification"));
    }
}
