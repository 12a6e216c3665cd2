use crate::context::StepContext;
use crate::error::{StepError, StepResult};
use crate::refresh::{apply_snapshot, RefreshOutcome};
use crate::step::ExtractionStep;
use async_trait::async_trait;
use of_core::StepKind;

/// Captures the live schema. The first run stores it as the baseline; later
/// runs record any drift as pending changes before moving the baseline.
pub struct ProfilingStep;

#[async_trait]
impl ExtractionStep for ProfilingStep {
    fn kind(&self) -> StepKind {
        StepKind::Profiling
    }

    async fn execute(&self, ctx: &StepContext) -> StepResult<String> {
        ctx.require_identifiers(self.kind())?;
        ctx.check_cancelled()?;

        let schema = ctx.source.get_schema().await?;
        if schema.tables.is_empty() {
            return Err(StepError::Configuration(format!(
                "{} data source exposes no tables",
                ctx.source.source_type()
            )));
        }
        let outcome = ctx.with_store(|scope| apply_snapshot(scope, &schema))?;
        ctx.progress.report(
            self.kind(),
            1,
            1,
            Some(format!("{} tables", schema.tables.len())),
        )?;

        let drift = match &outcome {
            RefreshOutcome::Baseline => "baseline stored".to_string(),
            RefreshOutcome::Unchanged => "schema unchanged".to_string(),
            RefreshOutcome::Changed(changes) => format!("{} schema changes recorded", changes.len()),
        };
        Ok(format!(
            "{} tables, {} columns; {}",
            schema.tables.len(),
            schema.column_count(),
            drift
        ))
    }
}
