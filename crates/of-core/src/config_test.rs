use super::*;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_empty_config_uses_defaults() {
    let config = Config::from_yaml("{}").unwrap();
    assert_eq!(config.source.path, ":memory:");
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.same_error_threshold, 5);
    assert!((config.retry.jitter - 0.1).abs() < f64::EPSILON);
    assert!((config.analysis.min_overlap - 0.5).abs() < f64::EPSILON);
    assert_eq!(config.analysis.low_cardinality_values, 10);
    assert!((config.analysis.min_target_coverage - 0.1).abs() < f64::EPSILON);
    assert_eq!(config.pool.max_concurrency, 4);
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
source:
  path: warehouse.duckdb
  schema: app
meta:
  path: target/meta.duckdb
retry:
  max_attempts: 3
  base_delay_ms: 10
  max_delay_ms: 100
classifier:
  sample_size: 50
analysis:
  min_overlap: 0.6
  compatible_types:
    - [text, uuid]
    - [integer, text]
pool:
  max_concurrency: 2
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.source.schema, "app");
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.same_error_threshold, 5);
    assert_eq!(config.classifier.sample_size, 50);
    assert_eq!(config.classifier.top_values, 20);
    assert_eq!(config.analysis.compatible_types.len(), 2);
    assert!(config
        .analysis
        .types_compatible(TypeFamily::Text, TypeFamily::Integer));
}

#[test]
fn test_unknown_field_rejected() {
    assert!(Config::from_yaml("bogus: 1").is_err());
    assert!(Config::from_yaml("retry:\n  retries: 3\n").is_err());
}

#[test]
fn test_invalid_values_rejected() {
    let err = Config::from_yaml("analysis:\n  min_overlap: 1.5\n").unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    assert!(Config::from_yaml("retry:\n  max_attempts: 0\n").is_err());
    assert!(Config::from_yaml("pool:\n  max_concurrency: 0\n").is_err());
    assert!(Config::from_yaml("analysis:\n  min_target_coverage: 2.0\n").is_err());
}

#[test]
fn test_default_type_compatibility() {
    let analysis = AnalysisConfig::default();
    assert!(analysis.types_compatible(TypeFamily::Integer, TypeFamily::Integer));
    assert!(analysis.types_compatible(TypeFamily::Text, TypeFamily::Uuid));
    assert!(analysis.types_compatible(TypeFamily::Uuid, TypeFamily::Text));
    assert!(!analysis.types_compatible(TypeFamily::Integer, TypeFamily::Text));
    assert!(!analysis.types_compatible(TypeFamily::Other, TypeFamily::Other));
}

#[test]
fn test_load_missing_file() {
    let err = Config::load(Path::new("/nonexistent/ontoforge.yml")).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "source:\n  path: data.duckdb").unwrap();
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.source.path, "data.duckdb");
}
