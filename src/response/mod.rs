//! Tabular response decoding and reshaping
//!
//! Every pgmon endpoint answers with the same `{columns, rows}` tabular
//! shape; this module reshapes it into suggestion lists, time-series
//! frames, or flattened log documents.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DatasourceError, Result};
use crate::target::Target;

/// Raw tabular payload returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularResponse {
    /// Ordered, distinct column names
    pub columns: Vec<String>,

    /// Rows of cells positionally aligned to `columns`
    pub rows: Vec<Vec<Value>>,
}

/// One rendered time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesResult {
    /// Display name for the series
    pub target: String,

    /// `(value, epoch-millisecond timestamp)` pairs in row order
    pub datapoints: Vec<(Value, i64)>,
}

/// Flattened log documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Always "docs"
    pub target: String,

    /// Always "docs"; tells the frontend to render a table
    #[serde(rename = "type")]
    pub kind: String,

    /// One column-name → value map per row
    pub datapoints: Vec<serde_json::Map<String, Value>>,
}

/// One frame of query output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryData {
    /// A metrics time series
    Series(SeriesResult),
    /// A table of log documents
    Documents(DocumentResult),
}

/// Flatten a tabular response into its first column, in row order.
///
/// Used for suggestion and template-variable lookups, where the backend
/// returns single-column name/value lists.
pub fn convert_list_data(data: &TabularResponse) -> Vec<Value> {
    data.rows
        .iter()
        .filter_map(|row| row.first().cloned())
        .collect()
}

/// Render a list cell for a suggestion entry
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reshape a statistics response into one series per dimension group.
///
/// Precondition: the backend returns rows pre-sorted by their `dimensions`
/// cell. Grouping is a single pass over adjacent equal cells and never
/// sorts, so equal cells separated by a different one produce two distinct
/// series with the same name.
///
/// The response must carry `dimensions` and `timestamp` columns plus one
/// named after the target's aggregator.
pub fn convert_metrics_data(target: &Target, data: &TabularResponse) -> Result<Vec<SeriesResult>> {
    let index = column_index(&data.columns);
    let dimensions_col = require_column(&index, "dimensions")?;
    let timestamp_col = require_column(&index, "timestamp")?;
    let value_col = require_column(&index, &target.aggregator)?;

    let mut series: Vec<SeriesResult> = Vec::new();
    let mut current_key: Option<&Value> = None;

    for row in &data.rows {
        let key = row.get(dimensions_col).unwrap_or(&Value::Null);
        if current_key != Some(key) {
            let mut name = dimension_label(key);
            if name.is_empty() {
                name = target.metric.clone();
            }
            series.push(SeriesResult {
                target: name,
                datapoints: Vec::new(),
            });
            current_key = Some(key);
        }

        let value = row.get(value_col).cloned().unwrap_or(Value::Null);
        let timestamp = timestamp_millis(row.get(timestamp_col).unwrap_or(&Value::Null))?;
        if let Some(current) = series.last_mut() {
            current.datapoints.push((value, timestamp));
        }
    }

    Ok(series)
}

/// Zip each row with the column names into a document map
pub fn convert_logs_data(data: &TabularResponse) -> DocumentResult {
    let datapoints = data
        .rows
        .iter()
        .map(|row| {
            data.columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect()
        })
        .collect();

    DocumentResult {
        target: "docs".into(),
        kind: "docs".into(),
        datapoints,
    }
}

fn column_index(columns: &[String]) -> HashMap<&str, usize> {
    columns
        .iter()
        .enumerate()
        .map(|(index, name)| (name.as_str(), index))
        .collect()
}

fn require_column(index: &HashMap<&str, usize>, name: &str) -> Result<usize> {
    index
        .get(name)
        .copied()
        .ok_or_else(|| DatasourceError::Conversion(format!("column not found: {}", name)))
}

/// Space-joined display label for a dimension-group cell
fn dimension_label(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(dimension_label)
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(map) => map
            .values()
            .map(dimension_label)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

/// Decode a timestamp cell into epoch milliseconds.
///
/// The backend serves Python `isoformat()` strings without a zone suffix;
/// those are taken as UTC. RFC 3339 strings and numeric epoch milliseconds
/// are accepted as well.
fn timestamp_millis(value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| DatasourceError::Conversion(format!("invalid timestamp: {}", n))),
        Value::String(s) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
                return Ok(parsed.timestamp_millis());
            }
            for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(parsed) = NaiveDateTime::parse_from_str(s, format) {
                    return Ok(parsed.and_utc().timestamp_millis());
                }
            }
            Err(DatasourceError::Conversion(format!(
                "invalid timestamp: {}",
                s
            )))
        }
        other => Err(DatasourceError::Conversion(format!(
            "invalid timestamp: {}",
            other
        ))),
    }
}
