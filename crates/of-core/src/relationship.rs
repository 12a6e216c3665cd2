//! Relationship candidates and data-verified relationships.

use crate::ids::ColumnRef;
use crate::literals::storage_literals;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cardinality of a verified relationship, read source-to-target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "1:1")]
    OneToOne,
    #[serde(rename = "1:N")]
    OneToMany,
    #[serde(rename = "N:1")]
    ManyToOne,
    #[serde(rename = "N:M")]
    ManyToMany,
}

storage_literals!(Cardinality, "cardinality", {
    OneToOne => "1:1",
    OneToMany => "1:N",
    ManyToOne => "N:1",
    ManyToMany => "N:M",
});

impl Cardinality {
    /// Derive cardinality from observed multiplicities.
    ///
    /// `source_repeats`: some source value occurs on more than one source row.
    /// `target_repeats`: some matched value occurs on more than one target row.
    pub fn from_multiplicity(source_repeats: bool, target_repeats: bool) -> Self {
        match (source_repeats, target_repeats) {
            (false, false) => Cardinality::OneToOne,
            (true, false) => Cardinality::ManyToOne,
            (false, true) => Cardinality::OneToMany,
            (true, true) => Cardinality::ManyToMany,
        }
    }
}

/// Logical identity of a relationship: (source table, column, target table, column).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipKey {
    pub source: ColumnRef,
    pub target: ColumnRef,
}

impl fmt::Display for RelationshipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Output of the sampled overlap pass. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipCandidate {
    pub key: RelationshipKey,
    /// Distinct source values sampled.
    pub sampled: u64,
    /// Of those, how many exist in the target.
    pub matched: u64,
}

impl RelationshipCandidate {
    /// Fraction of sampled values found in the target, `0.0` for an empty sample.
    pub fn sampled_match_rate(&self) -> f64 {
        if self.sampled == 0 {
            0.0
        } else {
            self.matched as f64 / self.sampled as f64
        }
    }
}

/// Full-data join statistics between a source column and a target column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStats {
    /// Source rows with a non-null value.
    pub source_rows: u64,
    /// Of those, rows whose value exists in the target.
    pub matched_rows: u64,
    /// Distinct non-null source values absent from the target.
    pub orphan_values: u64,
    /// Largest number of source rows sharing one value.
    pub max_rows_per_source_value: u64,
    /// Largest number of target rows sharing one matched value.
    pub max_rows_per_target_value: u64,
    /// Distinct non-null source values.
    pub source_values: u64,
    /// Distinct non-null target values.
    pub target_values: u64,
}

impl JoinStats {
    pub fn match_rate(&self) -> f64 {
        if self.source_rows == 0 {
            0.0
        } else {
            self.matched_rows as f64 / self.source_rows as f64
        }
    }

    /// Fraction of the target's distinct values that some source row uses.
    pub fn target_coverage(&self) -> f64 {
        if self.target_values == 0 {
            0.0
        } else {
            let used = self.source_values.saturating_sub(self.orphan_values);
            (used as f64 / self.target_values as f64).min(1.0)
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        Cardinality::from_multiplicity(
            self.max_rows_per_source_value > 1,
            self.max_rows_per_target_value > 1,
        )
    }
}

/// Semantic role attached to a verified relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRole {
    pub label: String,
    pub confidence: f64,
    /// `true` when the label came from the semantic classifier rather than the column name.
    pub from_classifier: bool,
}

/// A relationship confirmed against complete data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedRelationship {
    pub key: RelationshipKey,
    pub cardinality: Cardinality,
    /// Fraction of non-null source rows matched, in `[0, 1]`.
    pub match_rate: f64,
    pub orphan_count: u64,
    pub role: Option<RelationshipRole>,
    pub confidence: f64,
}

impl VerifiedRelationship {
    /// Match rate as a percentage rounded to one decimal.
    pub fn match_rate_percent(&self) -> f64 {
        (self.match_rate * 1000.0).round() / 10.0
    }
}
