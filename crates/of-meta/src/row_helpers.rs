//! Shared helpers for encoding and decoding stored values.

use crate::error::{MetaError, MetaResult};
use chrono::{DateTime, Utc};
use std::str::FromStr;

/// Current time as stored in the meta database.
pub(crate) fn now_text() -> String {
    Utc::now().to_rfc3339()
}

pub(crate) fn parse_time(what: &'static str, text: &str) -> MetaResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| MetaError::Corrupt {
            what,
            detail: format!("{text}: {e}"),
        })
}

pub(crate) fn parse_opt_time(
    what: &'static str,
    text: Option<&str>,
) -> MetaResult<Option<DateTime<Utc>>> {
    text.map(|t| parse_time(what, t)).transpose()
}

/// Parse a stored storage literal (status, source, kind) back into its enum.
pub(crate) fn parse_literal<T>(what: &'static str, text: &str) -> MetaResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    text.parse().map_err(|e: T::Err| MetaError::Corrupt {
        what,
        detail: e.to_string(),
    })
}
