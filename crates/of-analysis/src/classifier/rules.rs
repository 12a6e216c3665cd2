//! Deterministic classification rules, tried before any semantic call.
//!
//! Rules are evaluated in a fixed order and the first match wins. Each
//! match carries its own confidence; gating happens in the caller.

use super::profile::{is_boolean_literal, is_currency_code, is_uuid, ColumnProfile};
use of_core::{
    ClassifierConfig, ColumnRole, EnumValue, FeatureDetails, IdentifierFormat, SemanticType,
    TypeFamily,
};
use regex::Regex;
use std::sync::OnceLock;

/// Known closed rating scales as (min, max).
pub const RATING_SCALES: &[(i64, i64)] = &[(1, 5), (0, 5), (1, 7), (1, 10), (0, 10)];

/// Fraction of samples that must fit a shape for the shape to count.
const SHAPE_THRESHOLD: f64 = 0.95;

/// Output of a matching rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub role: ColumnRole,
    pub semantic_type: SemanticType,
    pub confidence: f64,
    pub details: FeatureDetails,
    pub reasoning: String,
}

impl RuleMatch {
    fn new(
        role: ColumnRole,
        semantic_type: SemanticType,
        confidence: f64,
        details: FeatureDetails,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            role,
            semantic_type,
            confidence,
            details,
            reasoning: reasoning.into(),
        }
    }
}

fn soft_delete_name(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(is_)?(deleted|removed|archived|voided|trashed|cancell?ed)(_?(at|on|date|time|ts|timestamp))?$")
            .expect("valid regex")
    })
    .is_match(name)
}

fn rating_name(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(rating|score|stars|grade)").expect("valid regex"))
        .is_match(name)
}

fn identifier_name(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^id$|_id$|[a-z]Id$|_uuid$|_key$)").expect("valid regex"))
        .is_match(name)
}

/// Classify `profile` by the first matching rule.
pub fn classify(profile: &ColumnProfile, config: &ClassifierConfig) -> Option<RuleMatch> {
    primary_key(profile)
        .or_else(|| soft_delete(profile, config))
        .or_else(|| timestamp(profile))
        .or_else(|| boolean(profile))
        .or_else(|| uuid_identifier(profile))
        .or_else(|| sequential_identifier(profile))
        .or_else(|| named_identifier(profile))
        .or_else(|| rating(profile))
        .or_else(|| currency_code(profile))
        .or_else(|| enumeration(profile, config))
        .or_else(|| residual(profile))
}

fn identifier_format(profile: &ColumnProfile) -> IdentifierFormat {
    if profile.family == TypeFamily::Uuid || profile.sample_fraction(is_uuid) >= SHAPE_THRESHOLD {
        IdentifierFormat::Uuid
    } else if profile.family == TypeFamily::Integer {
        IdentifierFormat::SequentialInteger
    } else {
        IdentifierFormat::Opaque
    }
}

fn primary_key(profile: &ColumnProfile) -> Option<RuleMatch> {
    if !profile.schema.is_primary_key {
        return None;
    }
    let format = identifier_format(profile);
    let semantic_type = match format {
        IdentifierFormat::Uuid => SemanticType::Uuid,
        IdentifierFormat::SequentialInteger => SemanticType::SequentialId,
        IdentifierFormat::Opaque => SemanticType::Text,
    };
    Some(RuleMatch::new(
        ColumnRole::PrimaryKey,
        semantic_type,
        1.0,
        FeatureDetails::Identifier {
            format,
            target_hint: None,
        },
        "declared primary key",
    ))
}

fn soft_delete(profile: &ColumnProfile, config: &ClassifierConfig) -> Option<RuleMatch> {
    if !profile.family.is_temporal() || !soft_delete_name(profile.name()) {
        return None;
    }
    let null_rate = profile.stats.null_rate();
    let details = FeatureDetails::Timestamp {
        null_rate,
        is_soft_delete: true,
    };
    if null_rate > config.soft_delete_null_rate {
        Some(RuleMatch::new(
            ColumnRole::Temporal,
            SemanticType::SoftDelete,
            0.95,
            details,
            format!(
                "deletion-style timestamp name with {:.1}% nulls",
                null_rate * 100.0
            ),
        ))
    } else {
        // too many deleted rows for a soft-delete marker; keep the hint for review
        Some(RuleMatch::new(
            ColumnRole::Temporal,
            SemanticType::Timestamp,
            0.75,
            details,
            format!(
                "deletion-style timestamp name but only {:.1}% nulls",
                null_rate * 100.0
            ),
        ))
    }
}

fn timestamp(profile: &ColumnProfile) -> Option<RuleMatch> {
    if !profile.family.is_temporal() {
        return None;
    }
    Some(RuleMatch::new(
        ColumnRole::Temporal,
        SemanticType::Timestamp,
        0.95,
        FeatureDetails::Timestamp {
            null_rate: profile.stats.null_rate(),
            is_soft_delete: false,
        },
        format!("{} column", profile.schema.data_type),
    ))
}

fn boolean(profile: &ColumnProfile) -> Option<RuleMatch> {
    if profile.family == TypeFamily::Boolean {
        return Some(RuleMatch::new(
            ColumnRole::Dimension,
            SemanticType::Boolean,
            0.95,
            FeatureDetails::None,
            "boolean column",
        ));
    }
    let two_valued = profile.stats.distinct_count == 2
        && matches!(profile.family, TypeFamily::Integer | TypeFamily::Text)
        && profile.stats.top_values.len() == 2
        && profile
            .stats
            .top_values
            .iter()
            .all(|v| is_boolean_literal(&v.value));
    two_valued.then(|| {
        RuleMatch::new(
            ColumnRole::Dimension,
            SemanticType::Boolean,
            0.85,
            FeatureDetails::None,
            "two distinct boolean-like values",
        )
    })
}

fn uuid_identifier(profile: &ColumnProfile) -> Option<RuleMatch> {
    let (confidence, why) = match profile.family {
        TypeFamily::Uuid => (0.95, "UUID column"),
        TypeFamily::Text if profile.sample_fraction(is_uuid) >= SHAPE_THRESHOLD => {
            (0.92, "text values shaped like UUIDs")
        }
        _ => return None,
    };
    Some(RuleMatch::new(
        ColumnRole::Identifier,
        SemanticType::Uuid,
        confidence,
        FeatureDetails::Identifier {
            format: IdentifierFormat::Uuid,
            target_hint: None,
        },
        why,
    ))
}

fn rating(profile: &ColumnProfile) -> Option<RuleMatch> {
    if profile.family != TypeFamily::Integer || profile.stats.is_unique() {
        return None;
    }
    let (min, max) = profile.integer_range()?;
    // smallest known scale that covers the observed range and whose top is used
    let (scale_min, scale_max) = RATING_SCALES
        .iter()
        .copied()
        .filter(|&(lo, hi)| lo <= min && max <= hi && max >= hi - 1)
        .min_by_key(|&(lo, hi)| hi - lo)?;
    let named = rating_name(profile.name());
    Some(RuleMatch::new(
        ColumnRole::Measure,
        SemanticType::Rating,
        if named { 0.92 } else { 0.75 },
        FeatureDetails::Rating {
            min: scale_min,
            max: scale_max,
        },
        format!("integer values within the {scale_min}-{scale_max} scale"),
    ))
}

fn sequential_identifier(profile: &ColumnProfile) -> Option<RuleMatch> {
    if profile.family != TypeFamily::Integer || !profile.stats.is_unique() {
        return None;
    }
    let (min, max) = profile.integer_range()?;
    let span = max.checked_sub(min)?.checked_add(1)?;
    let dense = span > 1 && u64::try_from(span).ok()? == profile.stats.distinct_count;
    dense.then(|| {
        RuleMatch::new(
            ColumnRole::Identifier,
            SemanticType::SequentialId,
            0.85,
            FeatureDetails::Identifier {
                format: IdentifierFormat::SequentialInteger,
                target_hint: None,
            },
            "dense unique integer sequence",
        )
    })
}

fn named_identifier(profile: &ColumnProfile) -> Option<RuleMatch> {
    if !matches!(profile.family, TypeFamily::Integer | TypeFamily::Text)
        || !identifier_name(profile.name())
    {
        return None;
    }
    let format = identifier_format(profile);
    Some(RuleMatch::new(
        ColumnRole::Identifier,
        match format {
            IdentifierFormat::SequentialInteger => SemanticType::SequentialId,
            _ => SemanticType::Text,
        },
        0.8,
        FeatureDetails::Identifier {
            format,
            target_hint: None,
        },
        "identifier-style name; reference target decided by data",
    ))
}

fn currency_code(profile: &ColumnProfile) -> Option<RuleMatch> {
    if profile.family != TypeFamily::Text || profile.stats.distinct_count == 0 {
        return None;
    }
    let top_ok = !profile.stats.top_values.is_empty()
        && profile
            .stats
            .top_values
            .iter()
            .all(|v| is_currency_code(&v.value));
    if !top_ok || profile.sample_fraction(is_currency_code) < SHAPE_THRESHOLD {
        return None;
    }
    Some(RuleMatch::new(
        ColumnRole::Dimension,
        SemanticType::CurrencyCode,
        0.95,
        FeatureDetails::CurrencyCode {
            amount_columns: Vec::new(),
        },
        "ISO-4217 currency codes",
    ))
}

fn enumeration(profile: &ColumnProfile, config: &ClassifierConfig) -> Option<RuleMatch> {
    let stats = &profile.stats;
    let non_null = stats.non_null_count();
    let repeats = non_null >= stats.distinct_count.saturating_mul(2);
    if stats.distinct_count == 0 || stats.distinct_count > config.enum_max_distinct || !repeats {
        return None;
    }
    let confidence = match profile.family {
        TypeFamily::Text => 0.9,
        TypeFamily::Integer => 0.72,
        _ => return None,
    };
    let values: Vec<EnumValue> = stats.top_values.clone();
    Some(RuleMatch::new(
        ColumnRole::Dimension,
        SemanticType::Enum,
        confidence,
        FeatureDetails::Enum {
            values,
            total: non_null,
        },
        format!("{} distinct values over {} rows", stats.distinct_count, non_null),
    ))
}

fn residual(profile: &ColumnProfile) -> Option<RuleMatch> {
    match profile.family {
        TypeFamily::Decimal | TypeFamily::Float => Some(RuleMatch::new(
            ColumnRole::Measure,
            SemanticType::Numeric,
            0.7,
            FeatureDetails::None,
            "fractional numeric column",
        )),
        TypeFamily::Integer => Some(RuleMatch::new(
            ColumnRole::Measure,
            SemanticType::Numeric,
            0.6,
            FeatureDetails::None,
            "integer column without identifier or scale shape",
        )),
        TypeFamily::Text => Some(RuleMatch::new(
            ColumnRole::Attribute,
            SemanticType::Text,
            0.55,
            FeatureDetails::None,
            "free text",
        )),
        _ => None,
    }
}

#[cfg(test)]
#[path = "rules_test.rs"]
mod tests;
