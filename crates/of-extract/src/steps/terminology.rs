use crate::context::StepContext;
use crate::error::StepResult;
use crate::step::ExtractionStep;
use async_trait::async_trait;
use of_core::{Provenance, StepKind};
use of_meta::{GlossaryTerm, OntologyRecord};
use std::collections::HashSet;

/// Asks the semantic classifier for business terms. Optional: the engine
/// skips it once retries are exhausted.
pub struct TerminologyStep;

#[async_trait]
impl ExtractionStep for TerminologyStep {
    fn kind(&self) -> StepKind {
        StepKind::TerminologyDiscovery
    }

    async fn execute(&self, ctx: &StepContext) -> StepResult<String> {
        ctx.require_identifiers(self.kind())?;
        let schema = ctx.snapshot(self.kind())?;
        let features = ctx.features(self.kind())?;
        ctx.check_cancelled()?;

        let suggestions = ctx.semantic.discover_terms(&schema, &features).await?;
        let terms: Vec<GlossaryTerm> = suggestions
            .into_iter()
            .filter(|s| !s.term.trim().is_empty())
            .map(|s| GlossaryTerm {
                term: s.term.trim().to_string(),
                definition: s.definition,
                tables: s.tables,
            })
            .collect();
        ctx.progress
            .report(self.kind(), terms.len() as u64, terms.len() as u64, None)?;

        if terms.is_empty() {
            return Ok(format!("{} suggested no terms", ctx.semantic.name()));
        }
        ctx.with_store(|scope| {
            for term in &terms {
                scope.upsert_term(term, Provenance::Inferred)?;
            }
            let observed: HashSet<String> = terms.iter().map(|t| t.record_key()).collect();
            scope.retire_unobserved::<GlossaryTerm>(&observed)?;
            Ok(())
        })?;
        Ok(format!("{} glossary terms", terms.len()))
    }
}
