//! Query-string construction
//!
//! Builds the sparse `key=value` query string for a target, expands
//! `{a,b,c}` template groups into the cartesian set of concrete queries,
//! and rewrites interval-literal periods into seconds.
//!
//! Values are used verbatim: the backend takes unescaped `key:value`
//! dimension filters, so no percent-encoding is applied here.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::target::{Repository, Target, WILDCARD};

/// First `{opt1,opt2,...}` group in a query string (no nesting)
static TEMPLATE_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").unwrap());

/// The `period=<value>` parameter, value running to the next separator
static PERIOD_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"period=[^&]*").unwrap());

/// Interval literal: integer count followed by a unit
static INTERVAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)([smhdw])$").unwrap());

/// Build the query string for a target and a translated time pair.
///
/// Bounds of `None` (the "now" sentinel) and empty values are omitted
/// entirely, so the backend falls back to its own defaults.
pub fn build_query(target: &Target, start: Option<&str>, end: Option<&str>) -> String {
    let mut params: Vec<(&str, String)> = vec![
        ("start_time", start.unwrap_or_default().to_string()),
        ("end_time", end.unwrap_or_default().to_string()),
    ];

    match target.repository {
        Some(Repository::Metrics) => {
            params.push(("metric_name", target.metric.clone()));
            params.push(("dimensions", dimensions_param(target)));
            params.push(("group_by", groups_param(target)));
            params.push(("statistics", target.aggregator.clone()));
            params.push(("period", target.period.clone()));
        }
        Some(Repository::Logs) => {
            params.push(("dimensions", dimensions_param(target)));
        }
        None => {}
    }

    params
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// Comma-joined `key:value` dimension filters, wildcards excluded
fn dimensions_param(target: &Target) -> String {
    target
        .dimensions
        .iter()
        .filter(|d| d.value != WILDCARD)
        .map(|d| format!("{}:{}", d.key, d.value))
        .collect::<Vec<_>>()
        .join(",")
}

/// Comma-joined grouping keys
fn groups_param(target: &Target) -> String {
    target
        .groups
        .iter()
        .map(|g| g.key.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Expand `{a,b,c}` template groups into concrete query strings.
///
/// The leftmost group is split on `,`; every occurrence of the whole
/// bracketed token is substituted with each option in turn and the result
/// expanded recursively, yielding the cartesian product of all groups in
/// depth-first, option order. Unterminated brackets never match and pass
/// through unchanged.
pub fn expand_templated_queries(query: &str) -> Vec<String> {
    let Some(group) = TEMPLATE_GROUP.find(query) else {
        return vec![query.to_string()];
    };

    let token = group.as_str();
    let options = &token[1..token.len() - 1];

    let mut expanded = Vec::new();
    for option in options.split(',') {
        expanded.extend(expand_templated_queries(&query.replace(token, option)));
    }
    expanded
}

/// Rewrite the first `period=` parameter's interval literal into seconds.
///
/// Values that are not interval literals (already numeric, or garbage)
/// leave the query string untouched.
pub fn normalize_period(query: &str) -> String {
    let Some(param) = PERIOD_PARAM.find(query) else {
        return query.to_string();
    };

    let value = &param.as_str()["period=".len()..];
    match interval_to_seconds(value) {
        Some(seconds) => query.replacen(param.as_str(), &format!("period={}", seconds), 1),
        None => query.to_string(),
    }
}

/// Convert an interval literal like "5m" into seconds
pub fn interval_to_seconds(interval: &str) -> Option<u64> {
    let captures = INTERVAL.captures(interval)?;
    let count: u64 = captures[1].parse().ok()?;

    let unit = match &captures[2] {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        "w" => 604800,
        _ => return None,
    };
    Some(count * unit)
}
