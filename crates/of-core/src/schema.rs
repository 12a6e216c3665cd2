//! Observed relational schema: tables, columns, normalized type families.

use crate::checksum::compute_checksum;
use crate::ids::{ColumnName, ColumnRef, TableName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Coarse type family used for rule selection and overlap compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFamily {
    Integer,
    Decimal,
    Float,
    Text,
    Uuid,
    Boolean,
    Timestamp,
    Date,
    Other,
}

impl TypeFamily {
    /// Classify a SQL type name as reported by `information_schema`.
    ///
    /// `DECIMAL(p,0)` / `NUMERIC(p,0)` are integers in everything but name.
    pub fn from_sql_type(data_type: &str) -> Self {
        let upper = data_type.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or("").trim();
        match base {
            "TINYINT" | "SMALLINT" | "INTEGER" | "INT" | "INT2" | "INT4" | "INT8" | "BIGINT"
            | "HUGEINT" | "UTINYINT" | "USMALLINT" | "UINTEGER" | "UBIGINT" | "UHUGEINT"
            | "SERIAL" | "BIGSERIAL" => TypeFamily::Integer,
            "DECIMAL" | "NUMERIC" => {
                if decimal_scale(&upper) == Some(0) {
                    TypeFamily::Integer
                } else {
                    TypeFamily::Decimal
                }
            }
            "REAL" | "FLOAT" | "FLOAT4" | "FLOAT8" | "DOUBLE" => TypeFamily::Float,
            "VARCHAR" | "TEXT" | "STRING" | "CHAR" | "BPCHAR" | "CHARACTER VARYING" => {
                TypeFamily::Text
            }
            "UUID" => TypeFamily::Uuid,
            "BOOLEAN" | "BOOL" => TypeFamily::Boolean,
            "DATE" => TypeFamily::Date,
            b if b.starts_with("TIMESTAMP") || b == "DATETIME" => TypeFamily::Timestamp,
            _ => TypeFamily::Other,
        }
    }

    /// Integer-like families.
    pub fn is_numeric(self) -> bool {
        matches!(self, TypeFamily::Integer | TypeFamily::Decimal | TypeFamily::Float)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, TypeFamily::Timestamp | TypeFamily::Date)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeFamily::Integer => "integer",
            TypeFamily::Decimal => "decimal",
            TypeFamily::Float => "float",
            TypeFamily::Text => "text",
            TypeFamily::Uuid => "uuid",
            TypeFamily::Boolean => "boolean",
            TypeFamily::Timestamp => "timestamp",
            TypeFamily::Date => "date",
            TypeFamily::Other => "other",
        }
    }
}

impl fmt::Display for TypeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn decimal_scale(upper: &str) -> Option<u32> {
    let inner = upper.split_once('(')?.1.trim_end_matches(')');
    let (_, scale) = inner.split_once(',')?;
    scale.trim().parse().ok()
}

/// One column as observed in the live schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: ColumnName,
    /// Raw type name as reported by the source (e.g. `VARCHAR`, `DECIMAL(12,2)`).
    pub data_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub ordinal: u32,
}

impl ColumnSchema {
    pub fn family(&self) -> TypeFamily {
        TypeFamily::from_sql_type(&self.data_type)
    }
}

/// One table as observed in the live schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: TableName,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary-key columns in ordinal order.
    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }
}

/// The full observed schema of a data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub tables: BTreeMap<TableName, TableSchema>,
}

impl SchemaSnapshot {
    pub fn new(tables: impl IntoIterator<Item = TableSchema>) -> Self {
        Self {
            tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    pub fn column(&self, column: &ColumnRef) -> Option<&ColumnSchema> {
        self.table(column.table.as_str())?
            .column(column.column.as_str())
    }

    /// Every column reference in table, then ordinal, order.
    pub fn column_refs(&self) -> Vec<ColumnRef> {
        self.tables
            .values()
            .flat_map(|t| {
                t.columns.iter().map(move |c| ColumnRef {
                    table: t.name.clone(),
                    column: c.name.clone(),
                })
            })
            .collect()
    }

    /// All primary-key columns across the schema.
    pub fn primary_keys(&self) -> Vec<(ColumnRef, &ColumnSchema)> {
        self.tables
            .values()
            .flat_map(|t| {
                t.primary_keys().map(move |c| {
                    (
                        ColumnRef {
                            table: t.name.clone(),
                            column: c.name.clone(),
                        },
                        c,
                    )
                })
            })
            .collect()
    }

    pub fn column_count(&self) -> usize {
        self.tables.values().map(|t| t.columns.len()).sum()
    }

    /// Stable content hash, used to short-circuit unchanged refreshes.
    pub fn fingerprint(&self) -> String {
        // BTreeMap ordering keeps the serialization deterministic.
        let json = serde_json::to_string(self).unwrap_or_default();
        compute_checksum(&json)
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
