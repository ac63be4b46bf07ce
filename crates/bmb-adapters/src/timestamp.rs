//! Source timestamps arrive in several textual layouts depending on the
//! exporter version; the target wants one canonical UTC form.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use thiserror::Error;

/// One accepted source layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampLayout {
    /// `chrono` format string carrying an explicit numeric offset.
    WithOffset(&'static str),
    /// RFC 3339, including the `Z` suffix.
    Rfc3339,
    /// `chrono` format string without zone information; read as UTC.
    AssumeUtc(&'static str),
}

/// Layouts tried in order; the first successful parse wins.
pub const SOURCE_LAYOUTS: &[TimestampLayout] = &[
    TimestampLayout::WithOffset("%Y-%m-%dT%H:%M:%S%.f%z"),
    TimestampLayout::Rfc3339,
    TimestampLayout::AssumeUtc("%Y-%m-%d %H:%M:%S%.f"),
    TimestampLayout::AssumeUtc("%Y-%m-%dT%H:%M:%S%.f"),
];

/// Canonical output layout: UTC, millisecond precision, literal `Z`.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    /// Absent, blank, or in no known layout. Callers treat this as "no timestamp".
    #[error("cannot parse timestamp {0:?}")]
    ParseFailure(String),
}

impl TimestampLayout {
    fn parse(self, raw: &str) -> Option<DateTime<Utc>> {
        match self {
            Self::WithOffset(fmt) => DateTime::parse_from_str(raw, fmt)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::Rfc3339 => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::AssumeUtc(fmt) => NaiveDateTime::parse_from_str(raw, fmt)
                .ok()
                .map(|naive| naive.and_utc()),
        }
    }
}

/// Parses with [`SOURCE_LAYOUTS`]. Sub-millisecond digits are dropped so the
/// result survives a trip through [`format_instant`] unchanged.
pub fn parse_timestamp(raw: Option<&str>) -> Result<DateTime<Utc>, TimestampError> {
    parse_with_layouts(raw, SOURCE_LAYOUTS)
}

pub fn parse_with_layouts(
    raw: Option<&str>,
    layouts: &[TimestampLayout],
) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(TimestampError::ParseFailure(String::new()));
    }
    layouts
        .iter()
        .find_map(|layout| layout.parse(trimmed))
        .map(|dt| dt.trunc_subsecs(3))
        .ok_or_else(|| TimestampError::ParseFailure(trimmed.to_string()))
}

pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.format(CANONICAL_FORMAT).to_string()
}

/// First candidate that parses; `None` when every candidate fails.
pub fn first_parsable<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<DateTime<Utc>> {
    for candidate in candidates {
        match parse_timestamp(candidate) {
            Ok(instant) => return Some(instant),
            Err(err) => {
                if candidate.is_some_and(|c| !c.trim().is_empty()) {
                    tracing::debug!(error = %err, "timestamp fallback");
                }
            }
        }
    }
    None
}
