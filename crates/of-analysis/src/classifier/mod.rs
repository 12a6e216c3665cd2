//! Column feature classifier.
//!
//! Profiles each column, applies deterministic rules, consults the semantic
//! classifier only for residual ambiguity, then runs cross-column analysis.
//! One column's failure is recorded on that column and never aborts its
//! siblings.

pub mod cross_column;
pub mod profile;
pub mod rules;

use crate::error::AnalysisResult;
use crate::pool::WorkerPool;
use crate::semantic::{ColumnContext, SemanticClassifier};
use of_core::{
    AnalysisConfig, ClassificationPath, ClassifierConfig, ColumnFeature, ColumnRef, ColumnRole,
    ColumnSchema, ConfidenceBand, FeatureDetails, FeatureFlags, SchemaSnapshot, SemanticType,
    AUTO_APPLY_CONFIDENCE, FLAG_CONFIDENCE,
};
use of_db::DataSource;
use profile::{profile_column, ColumnProfile};
use rules::RuleMatch;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct ColumnClassifier {
    source: Arc<dyn DataSource>,
    semantic: Arc<dyn SemanticClassifier>,
    config: ClassifierConfig,
    analysis: AnalysisConfig,
    pool: WorkerPool,
}

impl ColumnClassifier {
    pub fn new(
        source: Arc<dyn DataSource>,
        semantic: Arc<dyn SemanticClassifier>,
        config: ClassifierConfig,
        analysis: AnalysisConfig,
        pool: WorkerPool,
    ) -> Self {
        Self {
            source,
            semantic,
            config,
            analysis,
            pool,
        }
    }

    /// Classify every column of `schema`.
    ///
    /// `on_progress(completed, total)` is called as columns finish. The only
    /// error is cancellation; per-column failures are carried in the
    /// returned features.
    pub async fn classify_schema(
        &self,
        schema: &SchemaSnapshot,
        on_progress: &(dyn Fn(usize, usize) + Sync),
    ) -> AnalysisResult<Vec<ColumnFeature>> {
        let columns: Vec<(ColumnRef, ColumnSchema)> = schema
            .tables
            .values()
            .flat_map(|t| {
                t.columns.iter().map(|c| {
                    (
                        ColumnRef {
                            table: t.name.clone(),
                            column: c.name.clone(),
                        },
                        c.clone(),
                    )
                })
            })
            .collect();
        let total = columns.len();
        let done = AtomicUsize::new(0);
        let done = &done;

        let mut features = self
            .pool
            .map(columns, move |(column, col_schema)| async move {
                let feature = self.classify_column(column, col_schema).await;
                on_progress(done.fetch_add(1, Ordering::SeqCst) + 1, total);
                feature
            })
            .await?;

        cross_column::apply(schema, &mut features, &self.analysis);
        Ok(features)
    }

    /// Classify one column. Never fails: errors become `analysis_error`.
    pub async fn classify_column(&self, column: ColumnRef, schema: ColumnSchema) -> ColumnFeature {
        let profile =
            match profile_column(self.source.as_ref(), column.clone(), schema, &self.config).await
            {
                Ok(profile) => profile,
                Err(e) => {
                    log::warn!(
                        "Profiling failed for table '{}' column '{}': {}",
                        column.table,
                        column.column,
                        e
                    );
                    return ColumnFeature::failed(column, e.to_string());
                }
            };

        let guess = rules::classify(&profile, &self.config);
        match guess.as_ref().map(|m| ConfidenceBand::of(m.confidence)) {
            Some(ConfidenceBand::AutoApply) => {
                feature_from_rule(&profile, guess, ClassificationPath::Rule, FeatureFlags::default())
            }
            Some(ConfidenceBand::Flag) => feature_from_rule(
                &profile,
                guess,
                ClassificationPath::RuleFlagged,
                FeatureFlags {
                    needs_review: true,
                    ..FeatureFlags::default()
                },
            ),
            Some(ConfidenceBand::FallThrough) | None => self.resolve_ambiguity(profile, guess).await,
        }
    }

    async fn resolve_ambiguity(&self, profile: ColumnProfile, guess: Option<RuleMatch>) -> ColumnFeature {
        let unresolved = FeatureFlags {
            needs_review: true,
            needs_clarification: true,
            analysis_error: None,
        };
        if !self.config.semantic_fallback {
            return feature_from_rule(&profile, guess, ClassificationPath::Fallback, unresolved);
        }

        let context = ColumnContext {
            column: profile.column.clone(),
            schema: profile.schema.clone(),
            stats: profile.stats.clone(),
            samples: profile.samples.clone(),
            rule_guess: guess.clone().map(|m| {
                feature_from_rule(&profile, Some(m), ClassificationPath::Fallback, FeatureFlags::default())
            }),
        };
        match self.semantic.classify_column(&context).await {
            Ok(Some(verdict)) => {
                let details = match &guess {
                    Some(m) if m.semantic_type == verdict.semantic_type => m.details.clone(),
                    _ => FeatureDetails::None,
                };
                ColumnFeature {
                    column: profile.column,
                    role: verdict.role,
                    semantic_type: verdict.semantic_type,
                    confidence: verdict.confidence.clamp(0.0, 1.0),
                    details,
                    path: ClassificationPath::Semantic,
                    flags: FeatureFlags {
                        needs_review: verdict.confidence < AUTO_APPLY_CONFIDENCE,
                        needs_clarification: verdict.confidence < FLAG_CONFIDENCE,
                        analysis_error: None,
                    },
                    reasoning: verdict.reasoning,
                }
            }
            Ok(None) => feature_from_rule(&profile, guess, ClassificationPath::Fallback, unresolved),
            Err(e) => {
                log::warn!(
                    "Semantic classifier '{}' failed for table '{}' column '{}': {}",
                    self.semantic.name(),
                    profile.column.table,
                    profile.column.column,
                    e
                );
                feature_from_rule(&profile, guess, ClassificationPath::Fallback, unresolved)
            }
        }
    }
}

fn feature_from_rule(
    profile: &ColumnProfile,
    rule: Option<RuleMatch>,
    path: ClassificationPath,
    flags: FeatureFlags,
) -> ColumnFeature {
    let rule = rule.unwrap_or_else(|| RuleMatch {
        role: ColumnRole::Unknown,
        semantic_type: SemanticType::Unknown,
        confidence: 0.0,
        details: FeatureDetails::None,
        reasoning: format!("no rule matched {}", profile.schema.data_type),
    });
    ColumnFeature {
        column: profile.column.clone(),
        role: rule.role,
        semantic_type: rule.semantic_type,
        confidence: rule.confidence,
        details: rule.details,
        path,
        flags,
        reasoning: rule.reasoning,
    }
}

#[cfg(test)]
#[path = "classifier_test.rs"]
mod tests;
