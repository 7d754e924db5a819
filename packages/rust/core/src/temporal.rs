//! Creation/publication dates and coverage duration from time coverage bounds.
//!
//! Explicit `date_created` / `date_published` attributes always win over
//! values derived from `time_coverage_start`. Anything that fails to parse
//! resolves to `None`; nothing here returns an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use erddap_iso_shared::AttributeTable;
use tracing::debug;

use crate::lookup::global;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

/// Naive timestamp layouts tried after RFC 3339. Interpreted as UTC.
const NAIVE_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Where a resolved date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrigin {
    /// Declared by a `date_*` attribute.
    Explicit,
    /// Derived from `time_coverage_start`.
    CoverageStart,
}

/// A date value tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDate {
    pub value: String,
    pub origin: DateOrigin,
}

impl ResolvedDate {
    pub fn explicit(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            origin: DateOrigin::Explicit,
        }
    }

    pub fn derived(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            origin: DateOrigin::CoverageStart,
        }
    }

    pub fn is_explicit(&self) -> bool {
        self.origin == DateOrigin::Explicit
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// Resolved temporal fields for one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemporalExtent {
    /// Coverage start as published.
    pub begin: Option<String>,
    /// Coverage end as published.
    pub end: Option<String>,
    pub creation: Option<ResolvedDate>,
    pub publication: Option<ResolvedDate>,
    /// ISO 8601 duration of the coverage window.
    pub duration: Option<String>,
}

/// Resolve dates and duration from raw attribute values.
pub fn resolve(
    coverage_start: Option<&str>,
    coverage_end: Option<&str>,
    date_created: Option<&str>,
    date_published: Option<&str>,
) -> TemporalExtent {
    let start = coverage_start.and_then(parse_timestamp);
    let end = coverage_end.and_then(parse_timestamp);
    let derived = start.map(|ts| ResolvedDate::derived(iso_date(&ts)));

    TemporalExtent {
        begin: coverage_start.map(String::from),
        end: coverage_end.map(String::from),
        creation: date_created.map(ResolvedDate::explicit).or_else(|| derived.clone()),
        publication: date_published.map(ResolvedDate::explicit).or(derived),
        duration: match (start, end) {
            (Some(start), Some(end)) => iso_duration(end - start),
            _ => None,
        },
    }
}

/// Resolve from a dataset's `NC_GLOBAL` attributes.
pub fn resolve_from_table(table: &AttributeTable) -> TemporalExtent {
    resolve(
        global(table, "time_coverage_start"),
        global(table, "time_coverage_end"),
        global(table, "date_created"),
        global(table, "date_published"),
    )
}

/// Parse an ISO 8601 timestamp or bare date as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    debug!(value = raw, "unparsable timestamp");
    None
}

/// `YYYY-MM-DD` form of a timestamp.
pub fn iso_date(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// Format a non-negative span as an ISO 8601 duration (`P10DT6H`).
///
/// Negative spans have no ISO 8601 form and resolve to `None`.
/// Sub-second precision is dropped.
pub fn iso_duration(span: TimeDelta) -> Option<String> {
    let total = span.num_seconds();
    if total < 0 {
        debug!(seconds = total, "coverage end precedes start");
        return None;
    }

    let days = total / SECS_PER_DAY;
    let hours = (total % SECS_PER_DAY) / SECS_PER_HOUR;
    let minutes = (total % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = total % SECS_PER_MINUTE;

    if total == 0 {
        return Some("PT0S".into());
    }

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 {
            out.push_str(&format!("{seconds}S"));
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_day_coverage() {
        let extent = resolve(
            Some("2020-01-01T00:00:00Z"),
            Some("2020-01-11T00:00:00Z"),
            None,
            None,
        );
        assert_eq!(extent.duration.as_deref(), Some("P10D"));
        assert_eq!(extent.creation, Some(ResolvedDate::derived("2020-01-01")));
        assert_eq!(extent.publication, Some(ResolvedDate::derived("2020-01-01")));
        assert!(!extent.publication.unwrap().is_explicit());
    }

    #[test]
    fn missing_end_gives_no_duration() {
        let extent = resolve(Some("2020-01-01T00:00:00Z"), None, None, None);
        assert_eq!(extent.duration, None);
        assert_eq!(extent.creation.as_ref().map(ResolvedDate::as_str), Some("2020-01-01"));
        assert_eq!(extent.end, None);
    }

    #[test]
    fn unparsable_bounds_absorbed() {
        let extent = resolve(Some("last tuesday"), Some("2020-01-11T00:00:00Z"), None, None);
        assert_eq!(extent.duration, None);
        assert_eq!(extent.creation, None);
        assert_eq!(extent.begin.as_deref(), Some("last tuesday"));
    }

    #[test]
    fn explicit_dates_win() {
        let extent = resolve(
            Some("2020-01-01T00:00:00Z"),
            Some("2020-02-01T00:00:00Z"),
            Some("2019-12-15"),
            Some("2020-03-01T08:00:00Z"),
        );
        assert_eq!(extent.creation, Some(ResolvedDate::explicit("2019-12-15")));
        assert_eq!(
            extent.publication,
            Some(ResolvedDate::explicit("2020-03-01T08:00:00Z"))
        );
    }

    #[test]
    fn mixed_duration_components() {
        let span = TimeDelta::days(2) + TimeDelta::hours(3) + TimeDelta::seconds(5);
        assert_eq!(iso_duration(span).as_deref(), Some("P2DT3H5S"));
        assert_eq!(iso_duration(TimeDelta::minutes(90)).as_deref(), Some("PT1H30M"));
        assert_eq!(iso_duration(TimeDelta::zero()).as_deref(), Some("PT0S"));
        assert_eq!(iso_duration(TimeDelta::days(-1)), None);
    }

    #[test]
    fn timestamp_layouts() {
        let expected = parse_timestamp("2021-06-01T12:30:00Z").unwrap();
        assert_eq!(parse_timestamp("2021-06-01T12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2021-06-01 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2021-06-01T14:30:00+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2021-06-01").map(|ts| iso_date(&ts)).as_deref(),
            Some("2021-06-01")
        );
        assert_eq!(parse_timestamp(""), None);
    }
}
