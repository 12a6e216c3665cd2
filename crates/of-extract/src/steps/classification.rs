use crate::context::StepContext;
use crate::error::{StepError, StepResult};
use crate::step::ExtractionStep;
use async_trait::async_trait;
use of_analysis::ColumnClassifier;
use of_core::{ErrorClass, Provenance, StepKind};
use of_meta::ColumnAnnotation;
use std::collections::HashSet;

/// Classifies every column and records features plus inferred annotations.
pub struct ClassificationStep;

#[async_trait]
impl ExtractionStep for ClassificationStep {
    fn kind(&self) -> StepKind {
        StepKind::Classification
    }

    async fn execute(&self, ctx: &StepContext) -> StepResult<String> {
        ctx.require_identifiers(self.kind())?;
        let schema = ctx.snapshot(self.kind())?;

        let classifier = ColumnClassifier::new(
            ctx.source.clone(),
            ctx.semantic.clone(),
            ctx.config.classifier.clone(),
            ctx.config.analysis.clone(),
            ctx.pool.clone(),
        );
        let progress = ctx.progress.counter(self.kind());
        let features = classifier.classify_schema(&schema, &progress).await?;

        let failed: Vec<&str> = features
            .iter()
            .filter_map(|f| f.flags.analysis_error.as_deref())
            .collect();
        if !features.is_empty() && failed.len() == features.len() {
            return Err(StepError::AllColumnsFailed {
                count: failed.len(),
                class: ErrorClass::from_message(failed[0]),
                first: failed[0].to_string(),
            });
        }

        let written = ctx.with_store(|scope| {
            scope.save_features(&features)?;
            let mut written = 0;
            for feature in features.iter().filter(|f| f.flags.analysis_error.is_none()) {
                let data_type = schema.column(&feature.column).map(|c| c.data_type.clone());
                let annotation = ColumnAnnotation::from_feature(feature, data_type);
                if scope
                    .upsert_column_annotation(&annotation, Provenance::Inferred)?
                    .wrote()
                {
                    written += 1;
                }
            }
            // failed columns still count as observed so a transient failure
            // never retires their annotation
            let observed: HashSet<String> =
                features.iter().map(|f| f.column.to_string()).collect();
            scope.retire_unobserved::<ColumnAnnotation>(&observed)?;
            Ok(written)
        })?;

        let review = features.iter().filter(|f| f.flags.needs_review).count();
        Ok(format!(
            "{} columns classified, {} annotations written, {} need review, {} failed",
            features.len(),
            written,
            review,
            failed.len()
        ))
    }
}
