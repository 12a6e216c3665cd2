//! Schema change detection between a recorded snapshot and a fresh one.
//!
//! Produces one [`DetectedChange`] per added/removed table and per
//! added/removed/modified column. Columns of added or removed tables are
//! covered by the table-level change and are not reported individually.

use crate::pending_change::{ChangeType, DetectedChange};
use crate::schema::SchemaSnapshot;

/// Result of diffing two schema snapshots.
#[derive(Debug, Clone, Default)]
pub struct SchemaDiff {
    pub changes: Vec<DetectedChange>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Highest severity of any change, 0 when empty.
    pub fn max_severity(&self) -> u8 {
        self.changes
            .iter()
            .map(|c| c.change_type.severity())
            .max()
            .unwrap_or(0)
    }

    /// Changes touching a specific table.
    pub fn changes_for_table(&self, table: &str) -> Vec<&DetectedChange> {
        self.changes.iter().filter(|c| c.table == table).collect()
    }

    pub fn destructive(&self) -> impl Iterator<Item = &DetectedChange> {
        self.changes.iter().filter(|c| c.change_type.is_destructive())
    }
}

/// Diff `previous` against `current`.
///
/// Output order is deterministic: tables in name order, removed tables first,
/// then per-table column changes in ordinal order.
pub fn diff_schemas(previous: &SchemaSnapshot, current: &SchemaSnapshot) -> SchemaDiff {
    let mut diff = SchemaDiff::default();

    for name in previous.tables.keys() {
        if !current.tables.contains_key(name) {
            diff.changes.push(DetectedChange {
                change_type: ChangeType::TableRemoved,
                table: name.clone(),
                column: None,
                old_value: None,
                new_value: None,
            });
        }
    }

    for (name, table) in &current.tables {
        let Some(prev_table) = previous.tables.get(name) else {
            diff.changes.push(DetectedChange {
                change_type: ChangeType::TableAdded,
                table: name.clone(),
                column: None,
                old_value: None,
                new_value: Some(format!("{} columns", table.columns.len())),
            });
            continue;
        };

        for prev_col in &prev_table.columns {
            if table.column(prev_col.name.as_str()).is_none() {
                diff.changes.push(DetectedChange {
                    change_type: ChangeType::ColumnRemoved,
                    table: name.clone(),
                    column: Some(prev_col.name.clone()),
                    old_value: Some(prev_col.data_type.clone()),
                    new_value: None,
                });
            }
        }

        for col in &table.columns {
            match prev_table.column(col.name.as_str()) {
                None => diff.changes.push(DetectedChange {
                    change_type: ChangeType::ColumnAdded,
                    table: name.clone(),
                    column: Some(col.name.clone()),
                    old_value: None,
                    new_value: Some(col.data_type.clone()),
                }),
                Some(prev_col) if !prev_col.data_type.eq_ignore_ascii_case(&col.data_type) => {
                    diff.changes.push(DetectedChange {
                        change_type: ChangeType::ColumnModified,
                        table: name.clone(),
                        column: Some(col.name.clone()),
                        old_value: Some(prev_col.data_type.clone()),
                        new_value: Some(col.data_type.clone()),
                    })
                }
                Some(_) => {}
            }
        }
    }

    diff
}

#[cfg(test)]
#[path = "schema_diff_test.rs"]
mod tests;
