//! Integration tests for the metadata store through its public API.

use of_core::{
    diff_schemas, ClassificationPath, ColumnFeature, ColumnRef, ColumnRole, ColumnSchema,
    ColumnName, FeatureDetails, FeatureFlags, OntologyId, Provenance, SchemaSnapshot,
    SemanticType, TableName, TableSchema,
};
use of_meta::{ColumnAnnotation, Entity, MergeOutcome, MetaDb};
use std::collections::HashSet;

fn snapshot(columns: &[&str]) -> SchemaSnapshot {
    SchemaSnapshot::new([TableSchema {
        name: TableName::new("orders"),
        columns: columns
            .iter()
            .enumerate()
            .map(|(i, c)| ColumnSchema {
                name: ColumnName::new(*c),
                data_type: "INTEGER".into(),
                nullable: false,
                is_primary_key: i == 0,
                ordinal: i as u32 + 1,
            })
            .collect(),
    }])
}

fn feature(column: &str, role: ColumnRole) -> ColumnFeature {
    ColumnFeature {
        column: ColumnRef::new("orders", column),
        role,
        semantic_type: SemanticType::Numeric,
        confidence: 0.92,
        details: FeatureDetails::None,
        path: ClassificationPath::Rule,
        flags: FeatureFlags::default(),
        reasoning: "integer column".into(),
    }
}

/// Writes what one inference pass would write for the given schema.
fn inference_pass(db: &MetaDb, id: OntologyId, schema: &SchemaSnapshot) -> Vec<MergeOutcome> {
    db.scoped_transaction(id, |scope| {
        let mut outcomes = Vec::new();
        let mut observed = HashSet::new();
        for table in schema.tables.values() {
            outcomes.push(scope.upsert_entity(&Entity::for_table(table.name.clone()), Provenance::Inferred)?);
            for column in &table.columns {
                let col = ColumnRef {
                    table: table.name.clone(),
                    column: column.name.clone(),
                };
                observed.insert(col.to_string());
                let annotation = ColumnAnnotation::unclassified(col, Some(column.data_type.clone()));
                outcomes.push(scope.upsert_column_annotation(&annotation, Provenance::Inferred)?);
            }
        }
        scope.retire_unobserved::<ColumnAnnotation>(&observed)?;
        Ok(outcomes)
    })
    .unwrap()
}

#[test]
fn repeated_inference_passes_are_idempotent() {
    let db = MetaDb::open_memory().unwrap();
    let id = OntologyId::new_random();
    let schema = snapshot(&["order_id", "amount"]);

    let first = inference_pass(&db, id, &schema);
    assert!(first.iter().all(|o| *o == MergeOutcome::Inserted));

    let scope = db.scope(id);
    let before: Vec<_> = scope
        .list::<ColumnAnnotation>()
        .unwrap()
        .into_iter()
        .map(|s| (s.record, s.source, s.updated_at))
        .collect();

    let second = inference_pass(&db, id, &schema);
    assert!(second.iter().all(|o| *o == MergeOutcome::Unchanged));
    let after: Vec<_> = scope
        .list::<ColumnAnnotation>()
        .unwrap()
        .into_iter()
        .map(|s| (s.record, s.source, s.updated_at))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn manual_edit_survives_reinference() {
    let db = MetaDb::open_memory().unwrap();
    let id = OntologyId::new_random();
    let schema = snapshot(&["order_id", "amount"]);
    inference_pass(&db, id, &schema);

    let scope = db.scope(id);
    let mut curated = scope
        .get::<ColumnAnnotation>("orders.amount")
        .unwrap()
        .unwrap()
        .record;
    curated.description = Some("Order total in cents".into());
    curated.semantic_type = SemanticType::Monetary;
    scope
        .upsert_column_annotation(&curated, Provenance::Manual)
        .unwrap();

    inference_pass(&db, id, &schema);
    let stored = scope.get::<ColumnAnnotation>("orders.amount").unwrap().unwrap();
    assert_eq!(stored.record, curated);
    assert_eq!(stored.source, Provenance::Manual);
}

#[test]
fn snapshot_and_features_round_trip() {
    let db = MetaDb::open_memory().unwrap();
    let id = OntologyId::new_random();
    let scope = db.scope(id);
    assert!(scope.latest_snapshot().unwrap().is_none());

    let v1 = snapshot(&["order_id"]);
    let v2 = snapshot(&["order_id", "amount"]);
    scope.save_snapshot(&v1).unwrap();
    scope.save_snapshot(&v2).unwrap();
    let latest = scope.latest_snapshot().unwrap().unwrap();
    assert_eq!(latest, v2);
    assert!(diff_schemas(&latest, &v2).is_empty());

    scope
        .save_features(&[
            feature("order_id", ColumnRole::PrimaryKey),
            feature("amount", ColumnRole::Measure),
        ])
        .unwrap();
    // re-saving replaces rather than duplicates
    scope
        .save_features(&[feature("amount", ColumnRole::Measure)])
        .unwrap();
    let features = scope.load_features().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0].column.column, ColumnName::new("amount"));
}
