//! Error types for of-core

use thiserror::Error;

/// Core error type for Ontoforge
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Circular dependency between extraction steps
    #[error("[E004] Circular step dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// E005: Unknown extraction step name
    #[error("[E005] Unknown extraction step: {name}")]
    UnknownStep { name: String },

    /// E006: Empty identifier where a name is required
    #[error("[E006] Empty name in {context}")]
    EmptyName { context: String },

    /// E007: Malformed ontology identifier
    #[error("[E007] Invalid ontology id '{value}': {reason}")]
    InvalidOntologyId { value: String, reason: String },

    /// E008: Unknown enum literal read back from storage or config
    #[error("[E008] Unknown {kind} value '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E015: YAML parse error
    #[error("[E015] Config parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
