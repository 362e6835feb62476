//! Query target model
//!
//! A `Target` is the user-authored query specification assembled by the
//! query editor: repository kind, metric, dimension filters, grouping and
//! aggregation settings. The pipeline treats targets as read-only input.

use serde::{Deserialize, Serialize};

/// Dimension value meaning "match anything, omit from the filter"
pub const WILDCARD: &str = "*";

/// Backend data kind selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Repository {
    /// Numeric time series
    Metrics,
    /// Structured log records
    Logs,
}

impl Repository {
    /// URL path segment for this repository
    pub fn path_segment(&self) -> &'static str {
        match self {
            Repository::Metrics => "metrics",
            Repository::Logs => "logs",
        }
    }
}

impl std::str::FromStr for Repository {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metrics" => Ok(Repository::Metrics),
            "logs" => Ok(Repository::Logs),
            _ => Err(format!("unknown repository: {}", s)),
        }
    }
}

/// A key/value filter attached to a metric or log query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    /// Dimension name
    #[serde(default)]
    pub key: String,

    /// Dimension value; [`WILDCARD`] omits the dimension from the filter
    #[serde(default)]
    pub value: String,
}

impl Dimension {
    /// Create a dimension filter
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A series-grouping key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Dimension name to group by
    #[serde(default)]
    pub key: String,
}

impl Group {
    /// Create a grouping key
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// A user-authored query specification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    /// Which repository to query; `None` until the user picks one
    pub repository: Option<Repository>,

    /// Metric name, required for Metrics queries
    pub metric: String,

    /// Statistic to compute (e.g. "avg", "max")
    pub aggregator: String,

    /// Aggregation period in seconds, or an interval literal like "5m"
    pub period: String,

    /// Dimension filters, in editor order
    pub dimensions: Vec<Dimension>,

    /// Series grouping keys, in editor order
    pub groups: Vec<Group>,

    /// Excluded from execution when set (panel row toggled off)
    pub hide: bool,

    /// Transient validation message; empty when the target is valid
    #[serde(skip)]
    pub error: String,
}

impl Target {
    /// Re-check the target and record the first violation in `error`.
    ///
    /// Later checks overwrite earlier ones, so the message reflects the
    /// last failing rule in form order.
    pub fn validate(&mut self) {
        self.error.clear();

        if self.repository.is_none() {
            self.error = "No repository specified".into();
        }

        if self.repository == Some(Repository::Metrics) {
            if self.metric.is_empty() {
                self.error = "No metric specified".into();
            }
            if self.period.is_empty() {
                self.error = "You must supply a period for obtaining Metrics".into();
            }
        }

        for dimension in &self.dimensions {
            if dimension.key.is_empty() {
                self.error = "One or more dimensions is missing a key".into();
                break;
            }
            if dimension.value.is_empty() {
                self.error = "One or more dimensions is missing a value".into();
                break;
            }
        }
    }

    /// Whether the target passed its last validation
    pub fn is_valid(&self) -> bool {
        self.error.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics_target() -> Target {
        Target {
            repository: Some(Repository::Metrics),
            metric: "cpu_usage".into(),
            aggregator: "avg".into(),
            period: "300".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_missing_repository() {
        let mut target = Target::default();
        target.validate();
        assert_eq!(target.error, "No repository specified");
        assert!(!target.is_valid());
    }

    #[test]
    fn test_validate_metrics_missing_metric() {
        let mut target = metrics_target();
        target.metric.clear();
        target.validate();
        assert_eq!(target.error, "No metric specified");
    }

    #[test]
    fn test_validate_metrics_missing_period() {
        let mut target = metrics_target();
        target.period.clear();
        target.validate();
        assert_eq!(target.error, "You must supply a period for obtaining Metrics");
    }

    #[test]
    fn test_validate_dimension_missing_key() {
        let mut target = metrics_target();
        target.dimensions.push(Dimension::new("", "db-01"));
        target.validate();
        assert_eq!(target.error, "One or more dimensions is missing a key");
    }

    #[test]
    fn test_validate_dimension_missing_value() {
        let mut target = metrics_target();
        target.dimensions.push(Dimension::new("hostname", ""));
        target.validate();
        assert_eq!(target.error, "One or more dimensions is missing a value");
    }

    #[test]
    fn test_validate_logs_needs_no_metric() {
        let mut target = Target {
            repository: Some(Repository::Logs),
            ..Default::default()
        };
        target.validate();
        assert!(target.is_valid());
    }

    #[test]
    fn test_validate_clears_stale_error() {
        let mut target = metrics_target();
        target.error = "No repository specified".into();
        target.validate();
        assert!(target.is_valid());
    }

    #[test]
    fn test_repository_from_str() {
        assert_eq!("metrics".parse::<Repository>(), Ok(Repository::Metrics));
        assert_eq!("Logs".parse::<Repository>(), Ok(Repository::Logs));
        assert!("traces".parse::<Repository>().is_err());
    }

    #[test]
    fn test_target_deserialize_defaults() {
        let target: Target =
            serde_json::from_str(r#"{"repository": "Metrics", "metric": "cpu_usage"}"#).unwrap();
        assert_eq!(target.repository, Some(Repository::Metrics));
        assert!(target.dimensions.is_empty());
        assert!(!target.hide);
    }
}
