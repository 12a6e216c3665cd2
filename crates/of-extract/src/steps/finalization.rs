use crate::context::StepContext;
use crate::error::StepResult;
use crate::step::ExtractionStep;
use async_trait::async_trait;
use of_core::{ChangeStatus, StepKind, VerifiedRelationship};
use of_meta::{ColumnAnnotation, Entity, GlossaryTerm, MetaResult, OntologyRecord, OntologyScope};

/// Record counts of an ontology after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OntologySummary {
    pub entities: usize,
    pub relationships: usize,
    pub annotations: usize,
    pub terms: usize,
    /// Curated records no longer backed by observed schema or data.
    pub stale: usize,
    pub pending_changes: usize,
}

impl OntologySummary {
    pub fn collect(scope: &OntologyScope<'_>) -> MetaResult<Self> {
        fn count<R: OntologyRecord>(scope: &OntologyScope<'_>, stale: &mut usize) -> MetaResult<usize> {
            let records = scope.list::<R>()?;
            *stale += records.iter().filter(|r| r.stale).count();
            Ok(records.len())
        }
        let mut stale = 0;
        Ok(Self {
            entities: count::<Entity>(scope, &mut stale)?,
            relationships: count::<VerifiedRelationship>(scope, &mut stale)?,
            annotations: count::<ColumnAnnotation>(scope, &mut stale)?,
            terms: count::<GlossaryTerm>(scope, &mut stale)?,
            stale,
            pending_changes: scope.pending().list(Some(ChangeStatus::Pending))?.len(),
        })
    }
}

/// Summarizes the ontology and flags what needs a human.
pub struct FinalizationStep;

#[async_trait]
impl ExtractionStep for FinalizationStep {
    fn kind(&self) -> StepKind {
        StepKind::Finalization
    }

    async fn execute(&self, ctx: &StepContext) -> StepResult<String> {
        ctx.require_identifiers(self.kind())?;
        let summary = ctx.with_store(OntologySummary::collect)?;
        if summary.stale > 0 {
            log::warn!(
                "{} curated records of ontology {} are stale and need review",
                summary.stale,
                ctx.ontology_id
            );
        }
        if summary.pending_changes > 0 {
            log::info!("{} schema changes await review", summary.pending_changes);
        }
        ctx.progress.report(self.kind(), 1, 1, None)?;
        Ok(format!(
            "{} entities, {} relationships, {} annotations, {} terms",
            summary.entities, summary.relationships, summary.annotations, summary.terms
        ))
    }
}
