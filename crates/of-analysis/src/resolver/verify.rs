//! Full-data verification of a candidate.

use crate::error::{AnalysisError, AnalysisResult};
use of_core::{AnalysisConfig, JoinStats, RelationshipCandidate, VerifiedRelationship};
use of_db::DataSource;

/// Join the candidate's columns over complete data.
///
/// Returns `None` when the full match rate is below `min_match_rate`, or when
/// a low-cardinality source touches too little of the target to be a
/// reference rather than a coincidence of small numbers.
pub async fn verify_candidate(
    data: &dyn DataSource,
    candidate: &RelationshipCandidate,
    config: &AnalysisConfig,
) -> AnalysisResult<Option<VerifiedRelationship>> {
    let key = &candidate.key;
    let stats = data
        .verify_relationship(&key.source, &key.target)
        .await
        .map_err(|e| AnalysisError::source(&key.source, e))?;

    let match_rate = stats.match_rate();
    if stats.source_rows == 0 || match_rate < config.min_match_rate {
        log::debug!(
            "Rejected {}: {:.1}% of {} rows matched",
            key,
            match_rate * 100.0,
            stats.source_rows
        );
        return Ok(None);
    }
    if is_coincidental(&stats, config) {
        log::debug!(
            "Rejected {}: {} distinct values cover {:.1}% of {} target keys",
            key,
            stats.source_values,
            stats.target_coverage() * 100.0,
            stats.target_values
        );
        return Ok(None);
    }

    Ok(Some(VerifiedRelationship {
        key: key.clone(),
        cardinality: stats.cardinality(),
        match_rate,
        orphan_count: stats.orphan_values,
        role: None,
        confidence: confidence(match_rate, candidate.sampled_match_rate()),
    }))
}

/// A handful of distinct values lands inside almost any key range, so such
/// sources must also reference a fair share of the target.
fn is_coincidental(stats: &JoinStats, config: &AnalysisConfig) -> bool {
    stats.source_values <= config.low_cardinality_values
        && stats.target_coverage() < config.min_target_coverage
}

/// Weighted toward the full-data match rate; sampling only corroborates.
fn confidence(match_rate: f64, sampled_rate: f64) -> f64 {
    (0.8 * match_rate + 0.2 * sampled_rate).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(source_values: u64, target_values: u64) -> JoinStats {
        JoinStats {
            source_rows: 300,
            matched_rows: 300,
            source_values,
            target_values,
            max_rows_per_source_value: 100,
            max_rows_per_target_value: 1,
            ..JoinStats::default()
        }
    }

    #[test]
    fn test_few_values_against_large_key_space_are_coincidental() {
        let config = AnalysisConfig::default();
        // status codes 1..3 against 100 user ids
        assert!(is_coincidental(&stats(3, 100), &config));
        // the same codes against their own 3-row lookup table
        assert!(!is_coincidental(&stats(3, 3), &config));
        // many distinct values are never judged by coverage
        assert!(!is_coincidental(&stats(40, 10_000), &config));
    }

    #[test]
    fn test_coverage_guard_can_be_disabled() {
        let config = AnalysisConfig {
            min_target_coverage: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(!is_coincidental(&stats(3, 100), &config));
    }

    #[test]
    fn test_confidence_tracks_match_rate() {
        assert_eq!(confidence(1.0, 1.0), 1.0);
        assert!(confidence(0.998, 0.99) > 0.99);
        assert!(confidence(0.6, 0.9) < confidence(0.9, 0.6));
    }
}
