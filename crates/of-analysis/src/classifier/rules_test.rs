use super::*;
use of_core::{ColumnName, ColumnRef, ColumnSchema, ConfidenceBand};
use of_db::ColumnStats;

fn profile(name: &str, data_type: &str, stats: ColumnStats, samples: &[&str]) -> ColumnProfile {
    let schema = ColumnSchema {
        name: ColumnName::new(name),
        data_type: data_type.into(),
        nullable: true,
        is_primary_key: false,
        ordinal: 1,
    };
    ColumnProfile {
        column: ColumnRef::new("t", name),
        family: schema.family(),
        schema,
        stats,
        samples: samples.iter().map(|s| s.to_string()).collect(),
    }
}

fn stats(rows: u64, nulls: u64, distinct: u64, min: &str, max: &str) -> ColumnStats {
    ColumnStats {
        row_count: rows,
        null_count: nulls,
        distinct_count: distinct,
        min_value: Some(min.into()),
        max_value: Some(max.into()),
        ..ColumnStats::default()
    }
}

fn top(values: &[(&str, u64)]) -> Vec<EnumValue> {
    values
        .iter()
        .map(|(v, c)| EnumValue {
            value: v.to_string(),
            count: *c,
        })
        .collect()
}

#[test]
fn test_soft_delete_with_high_null_rate() {
    let p = profile(
        "deleted_at",
        "TIMESTAMP",
        stats(100, 97, 3, "2024-01-01", "2024-03-01"),
        &[],
    );
    let m = classify(&p, &ClassifierConfig::default()).unwrap();
    assert_eq!(m.semantic_type, SemanticType::SoftDelete);
    assert!(m.confidence >= 0.9);
    assert_eq!(
        m.details,
        FeatureDetails::Timestamp {
            null_rate: 0.97,
            is_soft_delete: true
        }
    );
}

#[test]
fn test_soft_delete_name_with_low_null_rate_is_flagged() {
    let p = profile(
        "deleted_at",
        "TIMESTAMP",
        stats(100, 40, 60, "2024-01-01", "2024-03-01"),
        &[],
    );
    let m = classify(&p, &ClassifierConfig::default()).unwrap();
    assert_eq!(m.semantic_type, SemanticType::Timestamp);
    assert!(m.confidence < 0.9 && m.confidence >= 0.7);
    assert_eq!(
        m.details,
        FeatureDetails::Timestamp {
            null_rate: 0.4,
            is_soft_delete: true
        }
    );
}

#[test]
fn test_mostly_null_timestamp_without_deletion_name_is_plain_timestamp() {
    let p = profile(
        "shipped_at",
        "TIMESTAMP",
        stats(100, 97, 3, "2024-01-01", "2024-03-01"),
        &[],
    );
    let m = classify(&p, &ClassifierConfig::default()).unwrap();
    assert_eq!(m.semantic_type, SemanticType::Timestamp);
}

#[test]
fn test_primary_key_wins() {
    let mut p = profile("id", "INTEGER", stats(10, 0, 10, "1", "10"), &[]);
    p.schema.is_primary_key = true;
    let m = classify(&p, &ClassifierConfig::default()).unwrap();
    assert_eq!(m.role, ColumnRole::PrimaryKey);
    assert_eq!(m.semantic_type, SemanticType::SequentialId);
    assert_eq!(m.confidence, 1.0);
}

#[test]
fn test_rating_scales() {
    let mut s = stats(200, 0, 5, "1", "5");
    s.top_values = top(&[("5", 80), ("4", 60)]);
    let m = classify(&profile("stars", "INTEGER", s.clone(), &[]), &ClassifierConfig::default())
        .unwrap();
    assert_eq!(m.semantic_type, SemanticType::Rating);
    assert_eq!(m.details, FeatureDetails::Rating { min: 1, max: 5 });
    assert!(m.confidence >= 0.9);

    // unnamed columns on a scale are only flagged
    let m = classify(&profile("q7", "INTEGER", s, &[]), &ClassifierConfig::default()).unwrap();
    assert_eq!(m.semantic_type, SemanticType::Rating);
    assert!(m.confidence < 0.9);

    let ten = stats(200, 0, 11, "0", "10");
    let m = classify(&profile("nps", "INTEGER", ten, &[]), &ClassifierConfig::default()).unwrap();
    assert_eq!(m.details, FeatureDetails::Rating { min: 0, max: 10 });
}

#[test]
fn test_uuid_text_is_identifier() {
    let samples = [
        "6f1c2d8e-1a2b-4c3d-8e9f-0a1b2c3d4e5f",
        "7a1c2d8e-1a2b-4c3d-8e9f-0a1b2c3d4e5f",
        "8b1c2d8e-1a2b-4c3d-8e9f-0a1b2c3d4e5f",
    ];
    let p = profile("host_id", "VARCHAR", stats(3, 0, 3, "6f", "8b"), &samples);
    let m = classify(&p, &ClassifierConfig::default()).unwrap();
    assert_eq!(m.role, ColumnRole::Identifier);
    assert_eq!(m.semantic_type, SemanticType::Uuid);
    assert!(m.confidence >= 0.9);
}

#[test]
fn test_dense_unique_integers_are_sequential_ids() {
    let p = profile("seq", "BIGINT", stats(50, 0, 50, "100", "149"), &[]);
    let m = classify(&p, &ClassifierConfig::default()).unwrap();
    assert_eq!(m.semantic_type, SemanticType::SequentialId);
    assert_eq!(m.role, ColumnRole::Identifier);
}

#[test]
fn test_integer_reference_by_name_is_flagged_identifier() {
    let p = profile("user_id", "INTEGER", stats(500, 0, 40, "1", "40"), &[]);
    let m = classify(&p, &ClassifierConfig::default()).unwrap();
    assert_eq!(m.role, ColumnRole::Identifier);
    assert_eq!(ConfidenceBand::of(m.confidence), ConfidenceBand::Flag);
}

#[test]
fn test_currency_codes() {
    let mut s = stats(100, 0, 3, "EUR", "USD");
    s.top_values = top(&[("USD", 60), ("EUR", 30), ("GBP", 10)]);
    let p = profile("currency", "VARCHAR", s, &["USD", "EUR", "USD", "GBP"]);
    let m = classify(&p, &ClassifierConfig::default()).unwrap();
    assert_eq!(m.semantic_type, SemanticType::CurrencyCode);
}

#[test]
fn test_boolean_like_text() {
    let mut s = stats(100, 0, 2, "N", "Y");
    s.top_values = top(&[("Y", 70), ("N", 30)]);
    let m = classify(&profile("active", "VARCHAR", s, &["Y"]), &ClassifierConfig::default())
        .unwrap();
    assert_eq!(m.semantic_type, SemanticType::Boolean);
}

#[test]
fn test_low_cardinality_text_is_enum() {
    let mut s = stats(100, 0, 3, "cancelled", "open");
    s.top_values = top(&[("open", 50), ("closed", 40), ("cancelled", 10)]);
    let m = classify(&profile("status", "VARCHAR", s, &["open"]), &ClassifierConfig::default())
        .unwrap();
    assert_eq!(m.semantic_type, SemanticType::Enum);
    let FeatureDetails::Enum { values, total } = m.details else {
        panic!("enum details expected");
    };
    assert_eq!(total, 100);
    assert_eq!(values.len(), 3);
}

#[test]
fn test_free_text_falls_through() {
    let p = profile("bio", "VARCHAR", stats(100, 0, 100, "a", "z"), &["hello"]);
    let m = classify(&p, &ClassifierConfig::default()).unwrap();
    assert_eq!(m.semantic_type, SemanticType::Text);
    assert_eq!(ConfidenceBand::of(m.confidence), ConfidenceBand::FallThrough);
}
