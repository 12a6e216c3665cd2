use super::*;
use of_core::{Cardinality, Classify, ErrorClass};

const FIXTURE: &str = r#"
CREATE TABLE users (user_id INTEGER PRIMARY KEY, name VARCHAR, deleted_at TIMESTAMP);
INSERT INTO users VALUES
    (1, 'ada', NULL), (2, 'bob', NULL), (3, 'cy', '2024-01-01 00:00:00'), (4, 'dee', NULL);
CREATE TABLE orders (order_id INTEGER PRIMARY KEY, user_id INTEGER, status VARCHAR);
INSERT INTO orders VALUES
    (10, 1, 'open'), (11, 1, 'open'), (12, 2, 'closed'), (13, 3, 'open'), (14, 99, 'void'), (15, NULL, 'open');
"#;

fn fixture() -> DuckDbSource {
    let db = DuckDbSource::in_memory().unwrap();
    db.execute_batch(FIXTURE).unwrap();
    db
}

#[tokio::test]
async fn test_get_schema_reports_tables_columns_and_keys() {
    let db = fixture();
    let schema = db.get_schema().await.unwrap();

    assert_eq!(schema.tables.len(), 2);
    let users = schema.table("users").unwrap();
    let names: Vec<&str> = users.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["user_id", "name", "deleted_at"]);

    let pk = users.column("user_id").unwrap();
    assert!(pk.is_primary_key);
    assert!(!users.column("name").unwrap().is_primary_key);
    assert_eq!(users.column("deleted_at").unwrap().data_type, "TIMESTAMP");

    let pks: Vec<String> = schema
        .primary_keys()
        .into_iter()
        .map(|(r, _)| r.to_string())
        .collect();
    assert_eq!(pks, vec!["orders.order_id", "users.user_id"]);
}

#[tokio::test]
async fn test_get_schema_skips_views() {
    let db = fixture();
    db.execute_batch("CREATE VIEW open_orders AS SELECT * FROM orders WHERE status = 'open'")
        .unwrap();
    let schema = db.get_schema().await.unwrap();
    assert!(schema.table("open_orders").is_none());
}

#[tokio::test]
async fn test_profile_column_counts() {
    let db = fixture();
    let stats = db
        .profile_column(&ColumnRef::new("users", "deleted_at"), 5)
        .await
        .unwrap();
    assert_eq!(stats.row_count, 4);
    assert_eq!(stats.null_count, 3);
    assert_eq!(stats.distinct_count, 1);
    assert!((stats.null_rate() - 0.75).abs() < 1e-9);

    let status = db
        .profile_column(&ColumnRef::new("orders", "status"), 2)
        .await
        .unwrap();
    assert_eq!(status.top_values.len(), 2);
    assert_eq!(status.top_values[0].value, "open");
    assert_eq!(status.top_values[0].count, 4);
    assert_eq!(status.min_length, Some(4));
    assert_eq!(status.max_length, Some(6));
}

#[tokio::test]
async fn test_profile_column_on_empty_table() {
    let db = DuckDbSource::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
    let stats = db.profile_column(&ColumnRef::new("t", "x"), 3).await.unwrap();
    assert_eq!(stats.row_count, 0);
    assert_eq!(stats.null_rate(), 0.0);
    assert!(stats.min_value.is_none());
    assert!(stats.top_values.is_empty());
}

#[tokio::test]
async fn test_sample_values_excludes_nulls_and_respects_limit() {
    let db = fixture();
    let all = db
        .sample_values(&ColumnRef::new("orders", "user_id"), 100)
        .await
        .unwrap();
    assert_eq!(all.len(), 5);

    let few = db
        .sample_values(&ColumnRef::new("orders", "user_id"), 2)
        .await
        .unwrap();
    assert_eq!(few.len(), 2);
}

#[tokio::test]
async fn test_overlap_counts_distinct_matches() {
    let db = fixture();
    let overlap = db
        .test_overlap(
            &ColumnRef::new("orders", "user_id"),
            &ColumnRef::new("users", "user_id"),
            100,
        )
        .await
        .unwrap();
    // distinct source values: 1, 2, 3, 99
    assert_eq!(overlap.sampled, 4);
    assert_eq!(overlap.matched, 3);
}

#[tokio::test]
async fn test_overlap_matches_uuid_against_text() {
    let db = DuckDbSource::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE a (id UUID PRIMARY KEY);
         INSERT INTO a VALUES ('6f1c2d8e-0000-4000-8000-000000000001');
         CREATE TABLE b (a_id VARCHAR);
         INSERT INTO b VALUES ('6F1C2D8E-0000-4000-8000-000000000001');",
    )
    .unwrap();
    let overlap = db
        .test_overlap(&ColumnRef::new("b", "a_id"), &ColumnRef::new("a", "id"), 10)
        .await
        .unwrap();
    assert_eq!(overlap.sampled, 1);
    assert_eq!(overlap.matched, 1);
}

#[tokio::test]
async fn test_verify_relationship_stats() {
    let db = fixture();
    let stats = db
        .verify_relationship(
            &ColumnRef::new("orders", "user_id"),
            &ColumnRef::new("users", "user_id"),
        )
        .await
        .unwrap();
    assert_eq!(stats.source_rows, 5);
    assert_eq!(stats.matched_rows, 4);
    assert_eq!(stats.orphan_values, 1);
    assert_eq!(stats.max_rows_per_source_value, 2);
    assert_eq!(stats.max_rows_per_target_value, 1);
    assert_eq!(stats.source_values, 4);
    assert_eq!(stats.target_values, 4);
    assert!((stats.target_coverage() - 0.75).abs() < 1e-9);
    assert_eq!(stats.cardinality(), Cardinality::ManyToOne);
}

#[tokio::test]
async fn test_missing_table_is_a_validation_error() {
    let db = fixture();
    let err = db
        .profile_column(&ColumnRef::new("nope", "x"), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::TableNotFound(_)), "{err}");
    assert_eq!(err.error_class(), ErrorClass::Validation);
}

#[test]
fn test_transient_error_keeps_its_class() {
    let err = DbError::Transient {
        class: ErrorClass::RateLimited,
        message: "slow down".into(),
    };
    assert!(err.error_class().is_retryable());
}
