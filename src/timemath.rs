//! Date-math parsing and time bound translation
//!
//! Dashboard time bounds arrive as strings: the literal `now`, a relative
//! expression like `now-5m`, an absolute RFC 3339 timestamp, a naive
//! `YYYY-MM-DDTHH:MM:SS` timestamp (treated as UTC), or epoch milliseconds.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

use crate::error::{DatasourceError, Result};

/// A dashboard time range, both bounds still in expression form
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    /// Start bound expression
    pub from: String,
    /// End bound expression
    pub to: String,
}

impl TimeRange {
    /// Create a time range from two bound expressions
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Translate one time bound into a UTC ISO-8601 string.
///
/// The literal `now` is the open-bound sentinel and translates to `None`,
/// meaning "let the server use its current time". Anything else must parse
/// as a date-math expression.
pub fn translate_time(bound: &str) -> Result<Option<String>> {
    if bound == "now" {
        return Ok(None);
    }
    let instant = parse_expression(bound, Utc::now())?;
    Ok(Some(instant.to_rfc3339_opts(SecondsFormat::Millis, true)))
}

/// Resolve a date-math expression against the given wall-clock instant.
fn parse_expression(expr: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let expr = expr.trim();

    if expr == "now" {
        return Ok(now);
    }

    if let Some(rest) = expr.strip_prefix("now") {
        return apply_offset(rest, now)
            .ok_or_else(|| DatasourceError::TimeParse(expr.to_string()));
    }

    // Epoch milliseconds
    if expr.chars().all(|c| c.is_ascii_digit()) {
        let millis: i64 = expr
            .parse()
            .map_err(|_| DatasourceError::TimeParse(expr.to_string()))?;
        return DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| DatasourceError::TimeParse(expr.to_string()));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(expr) {
        return Ok(parsed.with_timezone(&Utc));
    }

    // Naive timestamps (Python isoformat and the space-separated variant)
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(expr, format) {
            return Ok(parsed.and_utc());
        }
    }

    if let Ok(parsed) = NaiveDate::parse_from_str(expr, "%Y-%m-%d") {
        return Ok(parsed.and_time(NaiveTime::MIN).and_utc());
    }

    Err(DatasourceError::TimeParse(expr.to_string()))
}

/// Apply a `±<n><unit>` suffix to `now`. Returns `None` on grammar errors.
fn apply_offset(suffix: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let mut chars = suffix.chars();
    let sign = match chars.next()? {
        '-' => -1,
        '+' => 1,
        _ => return None,
    };

    let rest: &str = chars.as_str();
    let unit = rest.chars().last()?;
    let count: i64 = rest[..rest.len() - unit.len_utf8()].parse().ok()?;

    let seconds = count * unit_seconds(unit)?;
    Some(now + Duration::seconds(sign * seconds))
}

fn unit_seconds(unit: char) -> Option<i64> {
    match unit {
        's' => Some(1),
        'm' => Some(60),
        'h' => Some(3600),
        'd' => Some(86400),
        'w' => Some(604800),
        _ => None,
    }
}
