//! pgmon datasource adapter
//!
//! Translates dashboard queries into HTTP requests against the pgmon
//! metrics/logs API and reshapes the tabular JSON responses into the
//! time-series and document frames a dashboarding frontend expects.
//!
//! # Usage
//!
//! ```ignore
//! use pgmon_datasource::{Datasource, DatasourceConfig, QueryRequest, Target, TimeRange};
//!
//! let config = DatasourceConfig::new("http://localhost:8080", "pgmon");
//! let datasource = Datasource::new(&config)?;
//!
//! let request = QueryRequest {
//!     range: TimeRange::new("now-1h", "now"),
//!     targets: vec![target],
//! };
//! let frames = datasource.query(&request).await?;
//! ```

pub mod config;
pub mod editor;
pub mod error;
pub mod query;
pub mod response;
pub mod target;
pub mod timemath;

// Re-exports
pub use config::DatasourceConfig;
pub use editor::QueryEditor;
pub use error::{DatasourceError, Result};
pub use query::{build_query, expand_templated_queries, normalize_period};
pub use response::{
    convert_list_data, convert_logs_data, convert_metrics_data, DocumentResult, QueryData,
    SeriesResult, TabularResponse,
};
pub use target::{Dimension, Group, Repository, Target, WILDCARD};
pub use timemath::{translate_time, TimeRange};

use std::time::Duration;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::response::value_text;

/// One dashboard refresh: a time range plus the panel's targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Time range shared by every target
    pub range: TimeRange,

    /// Targets to execute; invalid or hidden ones are skipped
    pub targets: Vec<Target>,
}

/// Client for one configured pgmon backend
#[derive(Clone)]
pub struct Datasource {
    client: reqwest::Client,
    config: DatasourceConfig,
}

impl std::fmt::Debug for Datasource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datasource")
            .field("url", &self.config.url)
            .field("name", &self.config.name)
            .finish()
    }
}

impl Datasource {
    /// Create a new datasource from config
    pub fn new(config: &DatasourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DatasourceError::Connection(format!("client setup failed: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Create from a URL directly
    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        let config = DatasourceConfig::new(url, "pgmon");
        Self::new(&config)
    }

    /// Execute a dashboard query.
    ///
    /// Targets carrying a validation error, hidden targets, and targets
    /// without a repository are excluded rather than sent. Each remaining
    /// target's query string is built, period-normalized, and expanded;
    /// one GET is issued per expanded query. The fan-out completes as a
    /// single joined batch, so one failed request fails the whole query.
    pub async fn query(&self, request: &QueryRequest) -> Result<Vec<QueryData>> {
        let from = translate_time(&request.range.from)?;
        let to = translate_time(&request.range.to)?;

        let mut pending = Vec::new();
        for target in &request.targets {
            if !target.error.is_empty() {
                warn!(error = %target.error, "skipping invalid target");
                continue;
            }
            if target.hide {
                continue;
            }
            let Some(repository) = target.repository else {
                continue;
            };

            let built = build_query(target, from.as_deref(), to.as_deref());
            let built = normalize_period(&built);
            for expanded in expand_templated_queries(&built) {
                pending.push(self.execute_target(target, repository, expanded));
            }
        }

        let results = try_join_all(pending).await?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Test the connection by round-tripping the metric-names endpoint
    pub async fn health_check(&self) -> Result<()> {
        self.metric_names().await.map(|_| ())
    }

    // =========================================================================
    // Suggestion queries
    // =========================================================================

    /// List the known metric names
    pub async fn metric_names(&self) -> Result<Vec<String>> {
        self.list_request("/metrics/names", &[]).await
    }

    /// List the dimension names recorded for a metric
    pub async fn metric_dimension_names(&self, metric: &str) -> Result<Vec<String>> {
        self.list_request("/metrics/dimension_names", &[("metric_name", metric)])
            .await
    }

    /// List the values of one dimension within a metric
    pub async fn metric_dimension_values(
        &self,
        metric: &str,
        dimension: &str,
    ) -> Result<Vec<String>> {
        self.list_request(
            "/metrics/dimension_values",
            &[("metric_name", metric), ("dimension_name", dimension)],
        )
        .await
    }

    /// List the dimension names recorded against log entries
    pub async fn log_dimension_names(&self) -> Result<Vec<String>> {
        self.list_request("/logs/dimension_names", &[]).await
    }

    /// List the values of one log dimension
    pub async fn log_dimension_values(&self, dimension: &str) -> Result<Vec<String>> {
        self.list_request("/logs/dimension_values", &[("dimension_name", dimension)])
            .await
    }

    /// Resolve a `<repository>:<dimension>` template-variable query into
    /// the dimension's values.
    pub async fn metric_find_query(&self, query: &str) -> Result<Vec<String>> {
        let (repository, dimension) = query.split_once(':').ok_or_else(|| {
            DatasourceError::InvalidQuery(format!(
                "expected <repository>:<dimension>, got '{}'",
                query
            ))
        })?;
        let repository: Repository = repository.parse().map_err(DatasourceError::InvalidQuery)?;

        self.list_request(
            &format!("/{}/dimension_values", repository.path_segment()),
            &[("dimension_name", dimension)],
        )
        .await
    }

    // =========================================================================
    // Transport
    // =========================================================================

    async fn execute_target(
        &self,
        target: &Target,
        repository: Repository,
        query: String,
    ) -> Result<Vec<QueryData>> {
        match repository {
            Repository::Metrics => {
                let data = self
                    .request(&format!("/metrics/statistics?{}", query), &[])
                    .await?;
                let series = convert_metrics_data(target, &data)?;
                debug!(series = series.len(), query = %query, "metrics query executed");
                Ok(series.into_iter().map(QueryData::Series).collect())
            }
            Repository::Logs => {
                let data = self.request(&format!("/logs/list?{}", query), &[]).await?;
                let docs = convert_logs_data(&data);
                debug!(rows = docs.datapoints.len(), query = %query, "logs query executed");
                Ok(vec![QueryData::Documents(docs)])
            }
        }
    }

    async fn list_request(&self, path: &str, params: &[(&str, &str)]) -> Result<Vec<String>> {
        let data = self.request(path, params).await?;
        Ok(convert_list_data(&data).iter().map(value_text).collect())
    }

    /// Perform one GET against the backend and decode the tabular body
    async fn request(&self, path: &str, params: &[(&str, &str)]) -> Result<TabularResponse> {
        let mut request = self.client.get(format!("{}{}", self.config.url, path));

        if !params.is_empty() {
            request = request.query(params);
        }
        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request
            .send()
            .await
            .map_err(|e| DatasourceError::Connection(format!("pgmon connection failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DatasourceError::Backend { status, body });
        }

        response.json::<TabularResponse>().await.map_err(|e| {
            DatasourceError::Serialization(format!("failed to decode tabular response: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datasource_debug_omits_credentials() {
        let config =
            DatasourceConfig::new("http://monitor:8080", "prod").with_credentials("u", "hunter2");
        let datasource = Datasource::new(&config).unwrap();
        let debug = format!("{:?}", datasource);
        assert!(debug.contains("http://monitor:8080"));
        assert!(debug.contains("prod"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_from_url() {
        let datasource = Datasource::from_url("http://localhost:8080").unwrap();
        assert_eq!(datasource.config.name, "pgmon");
    }

    #[tokio::test]
    async fn test_query_rejects_bad_time_range() {
        let datasource = Datasource::from_url("http://localhost:8080").unwrap();
        let request = QueryRequest {
            range: TimeRange::new("whenever", "now"),
            targets: vec![],
        };
        assert!(matches!(
            datasource.query(&request).await,
            Err(DatasourceError::TimeParse(_))
        ));
    }

    #[tokio::test]
    async fn test_query_with_no_runnable_targets_is_empty() {
        // Invalid, hidden, and repository-less targets are all skipped, so
        // no HTTP request is ever issued.
        let datasource = Datasource::from_url("http://localhost:8080").unwrap();

        let mut invalid = Target {
            repository: Some(Repository::Metrics),
            ..Default::default()
        };
        invalid.validate();

        let hidden = Target {
            repository: Some(Repository::Logs),
            hide: true,
            ..Default::default()
        };

        let request = QueryRequest {
            range: TimeRange::new("now-1h", "now"),
            targets: vec![invalid, hidden, Target::default()],
        };

        let frames = datasource.query(&request).await.unwrap();
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn test_metric_find_query_malformed() {
        let datasource = Datasource::from_url("http://localhost:8080").unwrap();
        assert!(matches!(
            datasource.metric_find_query("hostname").await,
            Err(DatasourceError::InvalidQuery(_))
        ));
        assert!(matches!(
            datasource.metric_find_query("traces:hostname").await,
            Err(DatasourceError::InvalidQuery(_))
        ));
    }

    // =========================================================================
    // Integration Tests (require running pgmon service)
    // =========================================================================

    /// Integration tests that require a running pgmon HTTP service.
    /// Run with: cargo test -- --ignored
    #[tokio::test]
    #[ignore = "requires running pgmon service"]
    async fn test_health_check() {
        let datasource = Datasource::from_url("http://localhost:8080").unwrap();
        let result = datasource.health_check().await;
        assert!(result.is_ok(), "health check failed: {:?}", result);
    }

    #[tokio::test]
    #[ignore = "requires running pgmon service"]
    async fn test_metric_names() {
        let datasource = Datasource::from_url("http://localhost:8080").unwrap();
        let names = datasource.metric_names().await.unwrap();
        assert!(!names.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires running pgmon service"]
    async fn test_metrics_query_round_trip() {
        let datasource = Datasource::from_url("http://localhost:8080").unwrap();

        let mut target = Target {
            repository: Some(Repository::Metrics),
            metric: "cpu_usage".into(),
            aggregator: "avg".into(),
            period: "5m".into(),
            ..Default::default()
        };
        target.validate();

        let request = QueryRequest {
            range: TimeRange::new("now-1h", "now"),
            targets: vec![target],
        };

        let frames = datasource.query(&request).await.unwrap();
        assert!(frames
            .iter()
            .all(|frame| matches!(frame, QueryData::Series(_))));
    }
}
