use crate::context::StepContext;
use crate::error::StepResult;
use crate::step::ExtractionStep;
use async_trait::async_trait;
use of_analysis::RelationshipResolver;
use of_core::{Provenance, StepKind, VerifiedRelationship};
use std::collections::HashSet;

/// Searches and verifies relationships, then merges them into the store.
pub struct RelationshipDiscoveryStep;

#[async_trait]
impl ExtractionStep for RelationshipDiscoveryStep {
    fn kind(&self) -> StepKind {
        StepKind::RelationshipDiscovery
    }

    async fn execute(&self, ctx: &StepContext) -> StepResult<String> {
        ctx.require_identifiers(self.kind())?;
        let schema = ctx.snapshot(self.kind())?;
        let features = ctx.features(self.kind())?;

        let resolver = RelationshipResolver::new(
            ctx.source.clone(),
            ctx.semantic.clone(),
            ctx.config.analysis.clone(),
            ctx.pool.clone(),
        );
        let progress = ctx.progress.counter(self.kind());
        let report = resolver.resolve(&schema, &features, &progress).await?;

        let clean = report.errors.is_empty();
        ctx.with_store(|scope| {
            for relationship in &report.relationships {
                scope.upsert_relationship(relationship, Provenance::Inferred)?;
            }
            if clean {
                let observed: HashSet<String> = report
                    .relationships
                    .iter()
                    .map(|r| r.key.to_string())
                    .collect();
                scope.retire_unobserved::<VerifiedRelationship>(&observed)?;
            } else {
                log::warn!(
                    "{} relationship checks failed; keeping previously inferred relationships",
                    report.errors.len()
                );
            }
            Ok(())
        })?;

        Ok(format!(
            "{} relationships verified, {} rejected, {} checks failed",
            report.relationships.len(),
            report.rejected.len(),
            report.errors.len()
        ))
    }
}
