//! Candidate search: which primary keys might a source column reference.

use crate::error::{AnalysisError, AnalysisResult};
use of_core::{
    AnalysisConfig, ColumnFeature, ColumnRef, RelationshipCandidate, RelationshipKey,
    SchemaSnapshot, SemanticType, TypeFamily,
};
use of_db::DataSource;

/// Source columns eligible for relationship discovery: not a primary key,
/// analysed without error, and able to hold key values.
///
/// Identifier-role columns always qualify. So do integer, UUID and text
/// columns the classifier left as plain numbers, enums or text, since a
/// reference without an identifier-style name is still a reference.
pub fn source_columns<'f>(
    schema: &SchemaSnapshot,
    features: &'f [ColumnFeature],
) -> Vec<&'f ColumnFeature> {
    features
        .iter()
        .filter(|f| f.flags.analysis_error.is_none())
        .filter(|f| {
            schema
                .column(&f.column)
                .is_some_and(|c| !c.is_primary_key && may_hold_keys(f, c.family()))
        })
        .collect()
}

fn may_hold_keys(feature: &ColumnFeature, family: TypeFamily) -> bool {
    if feature.is_identifier() {
        return true;
    }
    matches!(
        family,
        TypeFamily::Integer | TypeFamily::Uuid | TypeFamily::Text
    ) && matches!(
        feature.semantic_type,
        SemanticType::Numeric
            | SemanticType::Enum
            | SemanticType::Text
            | SemanticType::Uuid
            | SemanticType::SequentialId
            | SemanticType::Unknown
    )
}

/// Every (source, primary key) pair whose type families may be compared.
///
/// Targets are single-column primary keys in any table, including the
/// source's own table, but never the source column itself.
pub fn candidate_pairs(
    schema: &SchemaSnapshot,
    sources: &[&ColumnFeature],
    config: &AnalysisConfig,
) -> Vec<RelationshipKey> {
    let targets: Vec<(ColumnRef, of_core::TypeFamily)> = schema
        .tables
        .values()
        .filter_map(|t| {
            let pks: Vec<_> = t.primary_keys().collect();
            match pks.as_slice() {
                [pk] => Some((
                    ColumnRef {
                        table: t.name.clone(),
                        column: pk.name.clone(),
                    },
                    pk.family(),
                )),
                _ => None,
            }
        })
        .collect();

    let mut pairs = Vec::new();
    for source in sources {
        let Some(source_schema) = schema.column(&source.column) else {
            continue;
        };
        let source_family = source_schema.family();
        for (target, target_family) in &targets {
            if *target == source.column || !config.types_compatible(source_family, *target_family) {
                continue;
            }
            pairs.push(RelationshipKey {
                source: source.column.clone(),
                target: target.clone(),
            });
        }
    }
    pairs
}

/// Probe sampled source values against the target.
pub async fn test_candidate(
    data: &dyn DataSource,
    key: RelationshipKey,
    sample_size: usize,
) -> AnalysisResult<RelationshipCandidate> {
    let overlap = data
        .test_overlap(&key.source, &key.target, sample_size)
        .await
        .map_err(|e| AnalysisError::source(&key.source, e))?;
    Ok(RelationshipCandidate {
        key,
        sampled: overlap.sampled,
        matched: overlap.matched,
    })
}
