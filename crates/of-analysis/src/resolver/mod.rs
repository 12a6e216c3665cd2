//! Relationship resolver.
//!
//! Existence is decided by data alone: sampled overlap narrows candidates,
//! full-data verification confirms them. Names only ever contribute a weak
//! role label to a relationship that already verified.

pub mod candidates;
pub mod role;
pub mod verify;

use crate::error::{AnalysisError, AnalysisResult};
use crate::pool::WorkerPool;
use crate::semantic::SemanticClassifier;
use of_core::{AnalysisConfig, ColumnFeature, RelationshipKey, SchemaSnapshot, VerifiedRelationship};
use of_db::DataSource;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Result of one discovery pass.
#[derive(Debug, Default)]
pub struct ResolveReport {
    pub relationships: Vec<VerifiedRelationship>,
    /// Candidates that passed overlap but failed full verification.
    pub rejected: Vec<RelationshipKey>,
    /// Candidates whose queries failed; siblings are unaffected.
    pub errors: Vec<(RelationshipKey, String)>,
}

pub struct RelationshipResolver {
    source: Arc<dyn DataSource>,
    semantic: Arc<dyn SemanticClassifier>,
    config: AnalysisConfig,
    pool: WorkerPool,
}

impl RelationshipResolver {
    pub fn new(
        source: Arc<dyn DataSource>,
        semantic: Arc<dyn SemanticClassifier>,
        config: AnalysisConfig,
        pool: WorkerPool,
    ) -> Self {
        Self {
            source,
            semantic,
            config,
            pool,
        }
    }

    /// Discover and verify relationships for the identifier columns in `features`.
    ///
    /// Only cancellation is returned as an error.
    pub async fn resolve(
        &self,
        schema: &SchemaSnapshot,
        features: &[ColumnFeature],
        on_progress: &(dyn Fn(usize, usize) + Sync),
    ) -> AnalysisResult<ResolveReport> {
        let sources = candidates::source_columns(schema, features);
        let pairs = candidates::candidate_pairs(schema, &sources, &self.config);
        log::info!(
            "Testing {} candidate pairs from {} identifier columns",
            pairs.len(),
            sources.len()
        );

        let mut report = ResolveReport::default();
        let total = pairs.len();
        let done = AtomicUsize::new(0);
        let done = &done;
        let data = self.source.as_ref();
        let sample_size = self.config.overlap_sample_size;

        let tested = self
            .pool
            .map(pairs, move |key| async move {
                let result = candidates::test_candidate(data, key.clone(), sample_size).await;
                on_progress(done.fetch_add(1, Ordering::SeqCst) + 1, total);
                (key, result)
            })
            .await?;

        let mut retained = Vec::new();
        for (key, result) in tested {
            match result {
                Ok(candidate) if candidate.sampled_match_rate() >= self.config.min_overlap => {
                    retained.push(candidate)
                }
                Ok(_) => {}
                Err(e) => record_error(&mut report, key, e)?,
            }
        }

        let total = total + retained.len();
        let config = &self.config;
        let semantic = self.semantic.as_ref();
        let verified = self
            .pool
            .map(retained, move |candidate| async move {
                let result = match verify::verify_candidate(data, &candidate, config).await {
                    Ok(Some(mut relationship)) => {
                        relationship.role = role::assign_role(semantic, &relationship).await;
                        Ok(Some(relationship))
                    }
                    other => other,
                };
                on_progress(done.fetch_add(1, Ordering::SeqCst) + 1, total);
                (candidate.key, result)
            })
            .await?;

        for (key, result) in verified {
            match result {
                Ok(Some(relationship)) => {
                    log::info!(
                        "Verified {} ({}, {:.1}% matched)",
                        relationship.key,
                        relationship.cardinality,
                        relationship.match_rate_percent()
                    );
                    report.relationships.push(relationship);
                }
                Ok(None) => report.rejected.push(key),
                Err(e) => record_error(&mut report, key, e)?,
            }
        }

        report.relationships.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(report)
    }
}

fn record_error(
    report: &mut ResolveReport,
    key: RelationshipKey,
    error: AnalysisError,
) -> AnalysisResult<()> {
    if matches!(error, AnalysisError::Cancelled) {
        return Err(error);
    }
    log::warn!("Relationship check {} failed: {}", key, error);
    report.errors.push((key, error.to_string()));
    Ok(())
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
