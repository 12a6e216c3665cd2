//! DuckDB data source implementation

use crate::error::{DbError, DbResult};
use crate::traits::{ColumnStats, DataSource, OverlapSample};
use async_trait::async_trait;
use duckdb::{params, Connection};
use of_core::{
    ColumnName, ColumnRef, ColumnSchema, EnumValue, JoinStats, SchemaSnapshot, TableName,
    TableSchema,
};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Seed for reservoir sampling so repeated runs draw the same values.
const SAMPLE_SEED: u32 = 42;

/// DuckDB-backed data source
pub struct DuckDbSource {
    conn: Mutex<Connection>,
    schema: String,
}

impl DuckDbSource {
    /// Create a new in-memory DuckDB source reading the `main` schema
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn, "main"))
    }

    /// Open a DuckDB database file
    pub fn from_path(path: &Path, schema: &str) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn, schema))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str, schema: &str) -> DbResult<Self> {
        if path == ":memory:" {
            let conn = Connection::open_in_memory()
                .map_err(|e| DbError::ConnectionError(e.to_string()))?;
            Ok(Self::from_connection(conn, schema))
        } else {
            Self::from_path(Path::new(path), schema)
        }
    }

    fn from_connection(conn: Connection, schema: &str) -> Self {
        Self {
            conn: Mutex::new(conn),
            schema: schema.to_string(),
        }
    }

    /// Schema this source enumerates
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Execute setup SQL (fixtures, demo data)
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Fully qualified, quoted table reference
    fn relation(&self, table: &TableName) -> String {
        format!("\"{}\".{}", self.schema.replace('"', "\"\""), table.quoted())
    }

    fn get_schema_sync(&self) -> DbResult<SchemaSnapshot> {
        let conn = self.lock()?;

        let mut pk_stmt = conn.prepare(
            "SELECT table_name, unnest(constraint_column_names) \
             FROM duckdb_constraints() \
             WHERE schema_name = ? AND constraint_type = 'PRIMARY KEY'",
        )?;
        let primary_keys: HashSet<(String, String)> = pk_stmt
            .query_map(params![self.schema], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<_, _>>()?;

        let mut col_stmt = conn.prepare(
            "SELECT c.table_name, c.column_name, c.data_type, c.is_nullable, c.ordinal_position \
             FROM information_schema.columns c \
             JOIN information_schema.tables t \
               ON t.table_schema = c.table_schema AND t.table_name = c.table_name \
             WHERE c.table_schema = ? AND t.table_type = 'BASE TABLE' \
             ORDER BY c.table_name, c.ordinal_position",
        )?;
        let rows = col_stmt
            .query_map(params![self.schema], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut tables: BTreeMap<String, Vec<ColumnSchema>> = BTreeMap::new();
        for (table, column, data_type, is_nullable, ordinal) in rows {
            let Some(column_name) = ColumnName::try_new(column.clone()) else {
                log::warn!("Skipping column with blank name in table '{}'", table);
                continue;
            };
            let is_primary_key = primary_keys.contains(&(table.clone(), column));
            tables.entry(table).or_default().push(ColumnSchema {
                name: column_name,
                data_type,
                nullable: is_nullable.eq_ignore_ascii_case("YES"),
                is_primary_key,
                ordinal: u32::try_from(ordinal).unwrap_or(u32::MAX),
            });
        }

        let tables = tables.into_iter().filter_map(|(name, columns)| {
            TableName::try_new(name).map(|name| TableSchema { name, columns })
        });
        Ok(SchemaSnapshot::new(tables))
    }

    fn profile_column_sync(&self, column: &ColumnRef, top_values: usize) -> DbResult<ColumnStats> {
        let conn = self.lock()?;
        let rel = self.relation(&column.table);
        let col = column.column.quoted();

        let sql = format!(
            "SELECT COUNT(*), COUNT({col}), COUNT(DISTINCT {col}), \
                    MIN(length(CAST({col} AS VARCHAR))), MAX(length(CAST({col} AS VARCHAR))), \
                    CAST(MIN({col}) AS VARCHAR), CAST(MAX({col}) AS VARCHAR) \
             FROM {rel}"
        );
        let mut stats = conn.query_row(&sql, [], |row| {
            let row_count = row.get::<_, i64>(0)?.max(0) as u64;
            let non_null = row.get::<_, i64>(1)?.max(0) as u64;
            Ok(ColumnStats {
                row_count,
                null_count: row_count.saturating_sub(non_null),
                distinct_count: row.get::<_, i64>(2)?.max(0) as u64,
                min_length: row.get::<_, Option<i64>>(3)?.map(|v| v.max(0) as u64),
                max_length: row.get::<_, Option<i64>>(4)?.map(|v| v.max(0) as u64),
                min_value: row.get(5)?,
                max_value: row.get(6)?,
                top_values: Vec::new(),
            })
        })?;

        if top_values > 0 {
            let sql = format!(
                "SELECT CAST({col} AS VARCHAR) AS v, COUNT(*) AS n \
                 FROM {rel} WHERE {col} IS NOT NULL \
                 GROUP BY 1 ORDER BY n DESC, v LIMIT {top_values}"
            );
            let mut stmt = conn.prepare(&sql)?;
            stats.top_values = stmt
                .query_map([], |row| {
                    Ok(EnumValue {
                        value: row.get(0)?,
                        count: row.get::<_, i64>(1)?.max(0) as u64,
                    })
                })?
                .collect::<Result<_, _>>()?;
        }

        Ok(stats)
    }

    fn sample_values_sync(&self, column: &ColumnRef, limit: usize) -> DbResult<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let conn = self.lock()?;
        let rel = self.relation(&column.table);
        let col = column.column.quoted();
        let sql = format!(
            "SELECT v FROM (SELECT CAST({col} AS VARCHAR) AS v FROM {rel} WHERE {col} IS NOT NULL) \
             USING SAMPLE reservoir({limit} ROWS) REPEATABLE ({SAMPLE_SEED})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<_, _>>()?;
        Ok(values)
    }

    fn test_overlap_sync(
        &self,
        source: &ColumnRef,
        target: &ColumnRef,
        sample_size: usize,
    ) -> DbResult<OverlapSample> {
        if sample_size == 0 {
            return Ok(OverlapSample::default());
        }
        let conn = self.lock()?;
        let src_rel = self.relation(&source.table);
        let src_col = source.column.quoted();
        let tgt_rel = self.relation(&target.table);
        let tgt_col = target.column.quoted();

        let sql = format!(
            "WITH s AS ( \
                SELECT v FROM ( \
                    SELECT DISTINCT lower(CAST({src_col} AS VARCHAR)) AS v \
                    FROM {src_rel} WHERE {src_col} IS NOT NULL \
                ) USING SAMPLE reservoir({sample_size} ROWS) REPEATABLE ({SAMPLE_SEED}) \
             ), t AS ( \
                SELECT DISTINCT lower(CAST({tgt_col} AS VARCHAR)) AS v \
                FROM {tgt_rel} WHERE {tgt_col} IS NOT NULL \
             ) \
             SELECT COUNT(*), COUNT(t.v) FROM s LEFT JOIN t ON s.v = t.v"
        );
        let (sampled, matched) = conn.query_row(&sql, [], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        Ok(OverlapSample {
            sampled: sampled.max(0) as u64,
            matched: matched.max(0) as u64,
        })
    }

    fn verify_relationship_sync(
        &self,
        source: &ColumnRef,
        target: &ColumnRef,
    ) -> DbResult<JoinStats> {
        let conn = self.lock()?;
        let src_rel = self.relation(&source.table);
        let src_col = source.column.quoted();
        let tgt_rel = self.relation(&target.table);
        let tgt_col = target.column.quoted();

        let sql = format!(
            "WITH sv AS ( \
                SELECT lower(CAST({src_col} AS VARCHAR)) AS v, COUNT(*) AS n \
                FROM {src_rel} WHERE {src_col} IS NOT NULL GROUP BY 1 \
             ), tv AS ( \
                SELECT lower(CAST({tgt_col} AS VARCHAR)) AS v, COUNT(*) AS n \
                FROM {tgt_rel} WHERE {tgt_col} IS NOT NULL GROUP BY 1 \
             ) \
             SELECT \
                CAST(COALESCE(SUM(sv.n), 0) AS BIGINT), \
                CAST(COALESCE(SUM(CASE WHEN tv.v IS NOT NULL THEN sv.n ELSE 0 END), 0) AS BIGINT), \
                CAST(COUNT(*) FILTER (WHERE tv.v IS NULL) AS BIGINT), \
                CAST(COALESCE(MAX(sv.n), 0) AS BIGINT), \
                CAST(COALESCE(MAX(tv.n), 0) AS BIGINT), \
                CAST(COUNT(*) AS BIGINT), \
                CAST((SELECT COUNT(*) FROM tv) AS BIGINT) \
             FROM sv LEFT JOIN tv ON sv.v = tv.v"
        );
        let stats = conn.query_row(&sql, [], |row| {
            Ok(JoinStats {
                source_rows: row.get::<_, i64>(0)?.max(0) as u64,
                matched_rows: row.get::<_, i64>(1)?.max(0) as u64,
                orphan_values: row.get::<_, i64>(2)?.max(0) as u64,
                max_rows_per_source_value: row.get::<_, i64>(3)?.max(0) as u64,
                max_rows_per_target_value: row.get::<_, i64>(4)?.max(0) as u64,
                source_values: row.get::<_, i64>(5)?.max(0) as u64,
                target_values: row.get::<_, i64>(6)?.max(0) as u64,
            })
        })?;
        Ok(stats)
    }
}

#[async_trait]
impl DataSource for DuckDbSource {
    async fn get_schema(&self) -> DbResult<SchemaSnapshot> {
        self.get_schema_sync()
    }

    async fn profile_column(
        &self,
        column: &ColumnRef,
        top_values: usize,
    ) -> DbResult<ColumnStats> {
        self.profile_column_sync(column, top_values)
    }

    async fn sample_values(&self, column: &ColumnRef, limit: usize) -> DbResult<Vec<String>> {
        self.sample_values_sync(column, limit)
    }

    async fn test_overlap(
        &self,
        source: &ColumnRef,
        target: &ColumnRef,
        sample_size: usize,
    ) -> DbResult<OverlapSample> {
        self.test_overlap_sync(source, target, sample_size)
    }

    async fn verify_relationship(
        &self,
        source: &ColumnRef,
        target: &ColumnRef,
    ) -> DbResult<JoinStats> {
        self.verify_relationship_sync(source, target)
    }

    fn source_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
