//! Configuration types and parsing for ontoforge.yml

use crate::error::{CoreError, CoreResult};
use crate::retry::RetryPolicy;
use crate::schema::TypeFamily;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration from ontoforge.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Data source the ontology describes
    #[serde(default)]
    pub source: SourceConfig,

    /// Metadata store location
    #[serde(default)]
    pub meta: MetaConfig,

    /// Retry policy injected into every extraction step
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Column classifier thresholds
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Relationship discovery settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Bounded worker pool for per-column sub-operations
    #[serde(default)]
    pub pool: PoolConfig,
}

/// Data source connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// DuckDB database path (or :memory:)
    #[serde(default = "default_memory_path")]
    pub path: String,

    /// Schema to enumerate (default: "main")
    #[serde(default = "default_schema")]
    pub schema: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_memory_path(),
            schema: default_schema(),
        }
    }
}

/// Metadata store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetaConfig {
    /// Path of the meta database file
    #[serde(default = "default_meta_path")]
    pub path: String,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            path: default_meta_path(),
        }
    }
}

/// Column classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Reservoir sample size per column
    pub sample_size: usize,
    /// Number of top values kept for enum distribution
    pub top_values: usize,
    /// Null rate above which a deletion-named timestamp is a soft-delete marker
    pub soft_delete_null_rate: f64,
    /// Maximum distinct values for a text column to be treated as an enum
    pub enum_max_distinct: u64,
    /// Whether to call the semantic classifier for residual ambiguity
    pub semantic_fallback: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            sample_size: 200,
            top_values: 20,
            soft_delete_null_rate: 0.9,
            enum_max_distinct: 20,
            semantic_fallback: true,
        }
    }
}

/// Pair of type families whose values may be compared for overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypePair(pub TypeFamily, pub TypeFamily);

/// Relationship discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Minimum sampled overlap for a candidate to be verified
    pub min_overlap: f64,
    /// Distinct source values sampled per candidate search
    pub overlap_sample_size: usize,
    /// Minimum full-data match rate for a verified relationship to be kept
    pub min_match_rate: f64,
    /// Sources with at most this many distinct values are low-cardinality
    pub low_cardinality_values: u64,
    /// Share of the target's distinct keys a low-cardinality source must reference
    pub min_target_coverage: f64,
    /// Cross-family pairs allowed in candidate search, in addition to identical families
    pub compatible_types: Vec<TypePair>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_overlap: 0.5,
            overlap_sample_size: 500,
            min_match_rate: 0.5,
            low_cardinality_values: 10,
            min_target_coverage: 0.1,
            compatible_types: vec![TypePair(TypeFamily::Text, TypeFamily::Uuid)],
        }
    }
}

impl AnalysisConfig {
    /// Whether values of `source` may be looked up in a `target` column.
    ///
    /// Identical families always qualify (`Other` never does); listed pairs
    /// qualify in either direction.
    pub fn types_compatible(&self, source: TypeFamily, target: TypeFamily) -> bool {
        if source == TypeFamily::Other || target == TypeFamily::Other {
            return false;
        }
        source == target
            || self
                .compatible_types
                .iter()
                .any(|TypePair(a, b)| (*a == source && *b == target) || (*a == target && *b == source))
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Concurrent sub-operations per step
    pub max_concurrency: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}

fn default_memory_path() -> String {
    ":memory:".to_string()
}

fn default_schema() -> String {
    "main".to_string()
}

fn default_meta_path() -> String {
    "target/ontology.duckdb".to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> CoreResult<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory
    /// Looks for ontoforge.yml or ontoforge.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("ontoforge.yml");
        let yaml_path = dir.join("ontoforge.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    fn validate(&self) -> CoreResult<()> {
        let invalid = |message: String| Err(CoreError::ConfigInvalid { message });

        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be at least 1".to_string());
        }
        if self.retry.same_error_threshold == 0 {
            return invalid("retry.same_error_threshold must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return invalid(format!("retry.jitter must be in [0, 1], got {}", self.retry.jitter));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return invalid("retry.base_delay_ms must not exceed retry.max_delay_ms".to_string());
        }
        for (name, value) in [
            ("analysis.min_overlap", self.analysis.min_overlap),
            ("analysis.min_match_rate", self.analysis.min_match_rate),
            ("analysis.min_target_coverage", self.analysis.min_target_coverage),
            (
                "classifier.soft_delete_null_rate",
                self.classifier.soft_delete_null_rate,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{name} must be in [0, 1], got {value}"));
            }
        }
        if self.classifier.sample_size == 0 || self.analysis.overlap_sample_size == 0 {
            return invalid("sample sizes must be positive".to_string());
        }
        if self.pool.max_concurrency == 0 {
            return invalid("pool.max_concurrency must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
