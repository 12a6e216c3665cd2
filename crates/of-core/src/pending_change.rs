//! Detected schema deltas awaiting review (or already auto-applied).

use crate::ids::{ColumnName, TableName};
use crate::literals::storage_literals;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review state of a pending change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeStatus {
    Pending,
    Approved,
    Rejected,
    /// The schema change already happened; the row is informational.
    AutoApplied,
}

storage_literals!(ChangeStatus, "change status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    AutoApplied => "autoApplied",
});

/// Kind of schema delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeType {
    TableAdded,
    TableRemoved,
    ColumnAdded,
    ColumnRemoved,
    ColumnModified,
}

storage_literals!(ChangeType, "change type", {
    TableAdded => "tableAdded",
    TableRemoved => "tableRemoved",
    ColumnAdded => "columnAdded",
    ColumnRemoved => "columnRemoved",
    ColumnModified => "columnModified",
});

impl ChangeType {
    /// Drops are applied at detection time.
    pub fn is_destructive(self) -> bool {
        matches!(self, ChangeType::TableRemoved | ChangeType::ColumnRemoved)
    }

    /// Initial status of a freshly detected change of this type.
    pub fn initial_status(self) -> ChangeStatus {
        if self.is_destructive() {
            ChangeStatus::AutoApplied
        } else {
            ChangeStatus::Pending
        }
    }

    /// The ontology mutation a reviewer is asked to approve.
    pub fn suggested_action(self) -> Option<SuggestedAction> {
        match self {
            ChangeType::TableAdded => Some(SuggestedAction::CreateEntity),
            ChangeType::ColumnAdded => Some(SuggestedAction::CreateColumnAnnotation),
            ChangeType::ColumnModified => Some(SuggestedAction::UpdateColumnAnnotation),
            ChangeType::TableRemoved | ChangeType::ColumnRemoved => None,
        }
    }

    /// Higher is more disruptive to downstream consumers.
    pub fn severity(self) -> u8 {
        match self {
            ChangeType::TableRemoved => 5,
            ChangeType::ColumnRemoved => 4,
            ChangeType::ColumnModified => 3,
            ChangeType::TableAdded => 2,
            ChangeType::ColumnAdded => 1,
        }
    }
}

/// Ontology mutation proposed for an additive or ambiguous delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SuggestedAction {
    CreateEntity,
    CreateColumnAnnotation,
    UpdateColumnAnnotation,
}

storage_literals!(SuggestedAction, "suggested action", {
    CreateEntity => "createEntity",
    CreateColumnAnnotation => "createColumnAnnotation",
    UpdateColumnAnnotation => "updateColumnAnnotation",
});

/// A detected delta before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedChange {
    pub change_type: ChangeType,
    pub table: TableName,
    pub column: Option<ColumnName>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl DetectedChange {
    pub fn description(&self) -> String {
        let target = match &self.column {
            Some(c) => format!("{}.{}", self.table, c),
            None => self.table.to_string(),
        };
        match self.change_type {
            ChangeType::TableAdded => format!("Table '{}' was added", target),
            ChangeType::TableRemoved => format!("Table '{}' was removed", target),
            ChangeType::ColumnAdded => format!("Column '{}' was added", target),
            ChangeType::ColumnRemoved => format!("Column '{}' was removed", target),
            ChangeType::ColumnModified => format!(
                "Column '{}' type changed from '{}' to '{}'",
                target,
                self.old_value.as_deref().unwrap_or("?"),
                self.new_value.as_deref().unwrap_or("?")
            ),
        }
    }
}

/// A persisted pending change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    pub id: i64,
    #[serde(flatten)]
    pub change: DetectedChange,
    pub status: ChangeStatus,
    pub suggested_action: Option<SuggestedAction>,
    pub detected_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reject_reason: Option<String>,
}
