//! Column profiling: full-table statistics plus a reservoir sample.

use crate::error::{AnalysisError, AnalysisResult};
use of_core::{ClassifierConfig, ColumnRef, ColumnSchema, TypeFamily};
use of_db::{ColumnStats, DataSource};
use regex::Regex;
use std::sync::OnceLock;

/// Statistics and sample values for one column.
#[derive(Debug, Clone)]
pub struct ColumnProfile {
    pub column: ColumnRef,
    pub schema: ColumnSchema,
    pub family: TypeFamily,
    pub stats: ColumnStats,
    pub samples: Vec<String>,
}

impl ColumnProfile {
    pub fn name(&self) -> &str {
        self.column.column.as_str()
    }

    /// Fraction of sampled values satisfying `pred`; 0.0 without samples.
    pub fn sample_fraction(&self, pred: impl Fn(&str) -> bool) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let hits = self.samples.iter().filter(|v| pred(v)).count();
        hits as f64 / self.samples.len() as f64
    }

    /// Observed integer range, when min and max parse as integers.
    pub fn integer_range(&self) -> Option<(i64, i64)> {
        let min = self.stats.min_value.as_deref()?.trim().parse().ok()?;
        let max = self.stats.max_value.as_deref()?.trim().parse().ok()?;
        Some((min, max))
    }
}

pub async fn profile_column(
    source: &dyn DataSource,
    column: ColumnRef,
    schema: ColumnSchema,
    config: &ClassifierConfig,
) -> AnalysisResult<ColumnProfile> {
    let stats = source
        .profile_column(&column, config.top_values)
        .await
        .map_err(|e| AnalysisError::source(&column, e))?;
    let samples = source
        .sample_values(&column, config.sample_size)
        .await
        .map_err(|e| AnalysisError::source(&column, e))?;
    Ok(ColumnProfile {
        family: schema.family(),
        column,
        schema,
        stats,
        samples,
    })
}

pub fn is_uuid(value: &str) -> bool {
    static UUID: OnceLock<Regex> = OnceLock::new();
    UUID.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
            .expect("valid uuid pattern")
    })
    .is_match(value.trim())
}

/// Active ISO-4217 codes most commonly seen in transactional data.
const ISO_4217: &[&str] = &[
    "AED", "ARS", "AUD", "BRL", "CAD", "CHF", "CLP", "CNY", "COP", "CZK", "DKK", "EGP", "EUR",
    "GBP", "HKD", "HUF", "IDR", "ILS", "INR", "ISK", "JPY", "KES", "KRW", "MAD", "MXN", "MYR",
    "NGN", "NOK", "NZD", "PEN", "PHP", "PKR", "PLN", "QAR", "RON", "RUB", "SAR", "SEK", "SGD",
    "THB", "TRY", "TWD", "UAH", "USD", "VND", "ZAR",
];

pub fn is_currency_code(value: &str) -> bool {
    let v = value.trim();
    v.len() == 3 && ISO_4217.contains(&v.to_ascii_uppercase().as_str())
}

pub fn is_boolean_literal(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "false" | "t" | "f" | "yes" | "no" | "y" | "n" | "0" | "1"
    )
}
