//! Cross-column analysis, run once every column of a schema is classified.

use of_core::{
    AnalysisConfig, ClassificationPath, ColumnFeature, ColumnRef, ColumnRole, ColumnSchema,
    FeatureDetails, SchemaSnapshot, SemanticType, TypeFamily, AUTO_APPLY_CONFIDENCE,
};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Widest decimal scale still read as a currency amount.
const MAX_AMOUNT_SCALE: u32 = 4;

fn amount_name(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(amount|amt|price|total|cost|fee|balance|revenue|subtotal|tax|paid|charge|salary|discount|refund|payment|spend|budget)")
            .expect("valid regex")
    })
    .is_match(name)
}

/// `DECIMAL(p,s)` scale, if declared.
fn decimal_scale(data_type: &str) -> Option<u32> {
    let (_, args) = data_type.split_once('(')?;
    let (_, scale) = args.trim_end_matches(')').split_once(',')?;
    scale.trim().parse().ok()
}

/// A measure that reads as money: amount-style name and a numeric type that
/// can hold currency values.
fn is_amount(column: &ColumnSchema) -> bool {
    if !amount_name(column.name.as_str()) {
        return false;
    }
    match column.family() {
        TypeFamily::Decimal => {
            decimal_scale(&column.data_type).map_or(true, |scale| scale <= MAX_AMOUNT_SCALE)
        }
        TypeFamily::Integer | TypeFamily::Float => true,
        _ => false,
    }
}

/// Pair amount columns with a sibling currency column and hint
/// self-referential identifiers.
pub fn apply(schema: &SchemaSnapshot, features: &mut [ColumnFeature], analysis: &AnalysisConfig) {
    let mut by_table: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, f) in features.iter().enumerate() {
        by_table
            .entry(f.column.table.to_string())
            .or_default()
            .push(i);
    }
    for indices in by_table.values() {
        pair_currency(schema, features, indices);
    }
    hint_self_references(schema, features, analysis);
}

/// Only amount-like measures are paired; other measures keep their flags.
fn pair_currency(schema: &SchemaSnapshot, features: &mut [ColumnFeature], indices: &[usize]) {
    let Some(&currency_idx) = indices
        .iter()
        .find(|&&i| features[i].semantic_type == SemanticType::CurrencyCode)
    else {
        return;
    };
    let currency_column = features[currency_idx].column.column.clone();

    let amounts: Vec<usize> = indices
        .iter()
        .copied()
        .filter(|&i| {
            let f = &features[i];
            f.role == ColumnRole::Measure
                && f.semantic_type == SemanticType::Numeric
                && f.flags.analysis_error.is_none()
                && schema.column(&f.column).is_some_and(is_amount)
        })
        .collect();
    if amounts.is_empty() {
        return;
    }

    let mut amount_columns = Vec::with_capacity(amounts.len());
    for i in amounts {
        let f = &mut features[i];
        f.semantic_type = SemanticType::Monetary;
        f.confidence = f.confidence.max(AUTO_APPLY_CONFIDENCE);
        f.details = FeatureDetails::Monetary {
            currency_column: Some(currency_column.clone()),
        };
        f.path = ClassificationPath::Rule;
        f.flags.needs_review = false;
        f.flags.needs_clarification = false;
        f.reasoning = format!("amount priced in sibling currency column {currency_column}");
        amount_columns.push(f.column.column.clone());
    }
    features[currency_idx].details = FeatureDetails::CurrencyCode { amount_columns };
}

fn hint_self_references(
    schema: &SchemaSnapshot,
    features: &mut [ColumnFeature],
    analysis: &AnalysisConfig,
) {
    for f in features.iter_mut() {
        if f.role != ColumnRole::Identifier {
            continue;
        }
        let FeatureDetails::Identifier { target_hint, .. } = &mut f.details else {
            continue;
        };
        if target_hint.is_some() {
            continue;
        }
        let Some(table) = schema.table(f.column.table.as_str()) else {
            continue;
        };
        let Some(source) = table.column(f.column.column.as_str()) else {
            continue;
        };
        let pks: Vec<_> = table.primary_keys().collect();
        let [pk] = pks.as_slice() else {
            continue;
        };
        if pk.name != source.name && analysis.types_compatible(source.family(), pk.family()) {
            *target_hint = Some(ColumnRef {
                table: table.name.clone(),
                column: pk.name.clone(),
            });
        }
    }
}
