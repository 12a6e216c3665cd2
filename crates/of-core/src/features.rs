//! Column features produced by the classifier.

use crate::ids::{ColumnName, ColumnRef};
use crate::literals::storage_literals;
use serde::{Deserialize, Serialize};

/// Auto-apply threshold for deterministic rules.
pub const AUTO_APPLY_CONFIDENCE: f64 = 0.9;

/// Below this, a rule result falls through to semantic classification.
pub const FLAG_CONFIDENCE: f64 = 0.7;

/// Role a column plays within its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnRole {
    PrimaryKey,
    Identifier,
    Dimension,
    Measure,
    Temporal,
    Attribute,
    Unknown,
}

/// Semantic subtype assigned to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SemanticType {
    SoftDelete,
    Timestamp,
    Rating,
    Uuid,
    SequentialId,
    Enum,
    Boolean,
    Monetary,
    CurrencyCode,
    Text,
    Numeric,
    Unknown,
}

storage_literals!(ColumnRole, "column role", {
    PrimaryKey => "primaryKey",
    Identifier => "identifier",
    Dimension => "dimension",
    Measure => "measure",
    Temporal => "temporal",
    Attribute => "attribute",
    Unknown => "unknown",
});

storage_literals!(SemanticType, "semantic type", {
    SoftDelete => "softDelete",
    Timestamp => "timestamp",
    Rating => "rating",
    Uuid => "uuid",
    SequentialId => "sequentialId",
    Enum => "enum",
    Boolean => "boolean",
    Monetary => "monetary",
    CurrencyCode => "currencyCode",
    Text => "text",
    Numeric => "numeric",
    Unknown => "unknown",
});

/// How an identifier's values are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentifierFormat {
    Uuid,
    SequentialInteger,
    Opaque,
}

/// One value of an enum-like column and how often it occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub value: String,
    pub count: u64,
}

/// Type-specific feature bag, selected by an explicit discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FeatureDetails {
    None,
    #[serde(rename_all = "camelCase")]
    Timestamp { null_rate: f64, is_soft_delete: bool },
    #[serde(rename_all = "camelCase")]
    Enum { values: Vec<EnumValue>, total: u64 },
    #[serde(rename_all = "camelCase")]
    Identifier {
        format: IdentifierFormat,
        /// Candidate target suggested by cross-column analysis; advisory only.
        target_hint: Option<ColumnRef>,
    },
    #[serde(rename_all = "camelCase")]
    Monetary {
        /// Sibling column holding ISO-4217 codes, if any.
        currency_column: Option<ColumnName>,
    },
    #[serde(rename_all = "camelCase")]
    CurrencyCode {
        /// Amount columns priced in this currency column.
        amount_columns: Vec<ColumnName>,
    },
    #[serde(rename_all = "camelCase")]
    Rating { min: i64, max: i64 },
}

/// Which phase settled the classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassificationPath {
    /// Deterministic rule at or above the auto-apply threshold.
    Rule,
    /// Deterministic rule in the flag band; applied but marked for review.
    RuleFlagged,
    /// Semantic classifier answered.
    Semantic,
    /// Nothing was confident; best effort kept.
    Fallback,
}

/// Processing flags carried by a feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Applied with moderate confidence; a reviewer should look.
    pub needs_review: bool,
    /// Ambiguity remained after every phase; a question should be asked.
    pub needs_clarification: bool,
    /// Profiling or classification of this column failed.
    pub analysis_error: Option<String>,
}

/// Classifier output for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnFeature {
    pub column: ColumnRef,
    pub role: ColumnRole,
    pub semantic_type: SemanticType,
    pub confidence: f64,
    pub details: FeatureDetails,
    pub path: ClassificationPath,
    pub flags: FeatureFlags,
    /// Why the classification was made, kept for audit.
    pub reasoning: String,
}

impl ColumnFeature {
    /// A placeholder for a column whose analysis failed.
    pub fn failed(column: ColumnRef, error: impl Into<String>) -> Self {
        Self {
            column,
            role: ColumnRole::Unknown,
            semantic_type: SemanticType::Unknown,
            confidence: 0.0,
            details: FeatureDetails::None,
            path: ClassificationPath::Fallback,
            flags: FeatureFlags {
                needs_review: true,
                needs_clarification: false,
                analysis_error: Some(error.into()),
            },
            reasoning: "analysis failed".to_string(),
        }
    }

    /// Whether the resolver should consider this column as a reference source.
    pub fn is_identifier(&self) -> bool {
        self.role == ColumnRole::Identifier
    }
}

/// Confidence band of a deterministic rule result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    AutoApply,
    Flag,
    FallThrough,
}

impl ConfidenceBand {
    pub fn of(confidence: f64) -> Self {
        if confidence >= AUTO_APPLY_CONFIDENCE {
            ConfidenceBand::AutoApply
        } else if confidence >= FLAG_CONFIDENCE {
            ConfidenceBand::Flag
        } else {
            ConfidenceBand::FallThrough
        }
    }
}
