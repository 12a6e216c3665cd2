//! Tests for MetaDb connection, migration and scoping.

use crate::records::Entity;
use crate::MetaDb;
use of_core::{OntologyId, Provenance, TableName};

fn count(db: &MetaDb, sql: &str) -> i64 {
    db.conn()
        .query_row(sql, [], |row| row.get::<_, i64>(0))
        .unwrap()
}

#[test]
fn open_memory_applies_migrations() {
    let db = MetaDb::open_memory().unwrap();
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM of_meta.schema_version"),
        crate::ddl::MIGRATIONS.len() as i64
    );
}

#[test]
fn open_file_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("target").join("ontology.duckdb");
    let _db = MetaDb::open(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn reopen_does_not_rerun_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meta.duckdb");
    {
        let _db = MetaDb::open(&path).unwrap();
    }
    let db = MetaDb::open(&path).unwrap();
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM of_meta.schema_version"),
        crate::ddl::MIGRATIONS.len() as i64
    );
}

#[test]
fn transaction_rolls_back_on_error() {
    let db = MetaDb::open_memory().unwrap();
    let id = OntologyId::new_random();
    let result: crate::MetaResult<()> = db.scoped_transaction(id, |scope| {
        scope.upsert_entity(&Entity::for_table(TableName::new("users")), Provenance::Inferred)?;
        Err(crate::MetaError::QueryError("boom".into()))
    });
    assert!(result.is_err());
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM of_meta.ontology_records"),
        0
    );
}

#[test]
fn scopes_do_not_see_each_other() {
    let db = MetaDb::open_memory().unwrap();
    let a = OntologyId::new_random();
    let b = OntologyId::new_random();
    db.scope(a)
        .upsert_entity(&Entity::for_table(TableName::new("users")), Provenance::Manual)
        .unwrap();

    assert_eq!(db.scope(a).list::<Entity>().unwrap().len(), 1);
    assert!(db.scope(b).list::<Entity>().unwrap().is_empty());
    assert!(db.scope(b).get::<Entity>("users").unwrap().is_none());
}
