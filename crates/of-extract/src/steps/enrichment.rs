use crate::context::StepContext;
use crate::error::StepResult;
use crate::step::ExtractionStep;
use async_trait::async_trait;
use of_core::{ColumnFeature, Provenance, StepKind, TableSchema};
use of_meta::Entity;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One entity per table, described by the semantic classifier when it can.
pub struct EnrichmentStep;

#[async_trait]
impl ExtractionStep for EnrichmentStep {
    fn kind(&self) -> StepKind {
        StepKind::Enrichment
    }

    async fn execute(&self, ctx: &StepContext) -> StepResult<String> {
        ctx.require_identifiers(self.kind())?;
        let schema = ctx.snapshot(self.kind())?;
        let features = ctx.features(self.kind())?;

        let tables: Vec<TableSchema> = schema.tables.values().cloned().collect();
        let total = tables.len();
        let done = AtomicUsize::new(0);
        let progress = ctx.progress.counter(self.kind());
        let (done, features, progress) = (&done, &features, &progress);
        let semantic = ctx.semantic.as_ref();

        let described = ctx
            .pool
            .map(tables, move |table| async move {
                let table_features: Vec<ColumnFeature> = features
                    .iter()
                    .filter(|f| f.column.table == table.name)
                    .cloned()
                    .collect();
                let description = match semantic.describe_entity(&table, &table_features).await {
                    Ok(description) => description,
                    Err(e) => {
                        log::warn!("Could not describe table '{}': {}", table.name, e);
                        None
                    }
                };
                progress(done.fetch_add(1, Ordering::SeqCst) + 1, total);
                (table.name, description)
            })
            .await?;

        let written = ctx.with_store(|scope| {
            let mut written = 0;
            for (table, description) in &described {
                let mut entity = Entity::for_table(table.clone());
                entity.description = match description {
                    Some(d) => Some(d.clone()),
                    // keep an earlier description rather than erase it
                    None => scope
                        .get::<Entity>(table.as_str())?
                        .and_then(|stored| stored.record.description),
                };
                if scope.upsert_entity(&entity, Provenance::Inferred)?.wrote() {
                    written += 1;
                }
            }
            let observed: HashSet<String> = described.iter().map(|(t, _)| t.to_string()).collect();
            scope.retire_unobserved::<Entity>(&observed)?;
            Ok(written)
        })?;

        let with_description = described.iter().filter(|(_, d)| d.is_some()).count();
        Ok(format!(
            "{} entities ({} described), {} written",
            described.len(),
            with_description,
            written
        ))
    }
}
