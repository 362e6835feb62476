//! Query editor component
//!
//! Plain stand-in for the host framework's query-editing controller: it
//! owns the Target being edited and exposes the suggestion lookups the
//! editor form's typeahead fields call into. No inheritance, no UI state.

use crate::error::Result;
use crate::target::{Dimension, Group, Repository, Target};
use crate::Datasource;

/// Aggregator applied when the user has not picked one
const DEFAULT_AGGREGATOR: &str = "avg";

/// Period applied when the user has not supplied one, in seconds
const DEFAULT_PERIOD: &str = "300";

/// Editing component for a single query target
#[derive(Debug)]
pub struct QueryEditor<'a> {
    datasource: &'a Datasource,

    /// The target under edit
    pub target: Target,

    /// Dashboard template-variable names, offered alongside dimension values
    template_variables: Vec<String>,
}

impl<'a> QueryEditor<'a> {
    /// Wrap a target for editing, applying form defaults and validating
    pub fn new(datasource: &'a Datasource, mut target: Target) -> Self {
        if target.aggregator.is_empty() {
            target.aggregator = DEFAULT_AGGREGATOR.into();
        }
        if target.period.is_empty() {
            target.period = DEFAULT_PERIOD.into();
        }
        target.validate();

        Self {
            datasource,
            target,
            template_variables: Vec::new(),
        }
    }

    /// Offer dashboard template variables in dimension-value suggestions
    pub fn with_template_variables(mut self, names: Vec<String>) -> Self {
        self.template_variables = names;
        self
    }

    /// Suggest metric names for the metric field
    pub async fn suggest_metrics(&self) -> Result<Vec<String>> {
        self.datasource.metric_names().await
    }

    /// Suggest dimension keys for the current repository
    pub async fn suggest_dimension_keys(&self) -> Result<Vec<String>> {
        match self.target.repository {
            Some(Repository::Logs) => self.datasource.log_dimension_names().await,
            Some(Repository::Metrics) if !self.target.metric.is_empty() => {
                self.datasource
                    .metric_dimension_names(&self.target.metric)
                    .await
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Suggest values for the dimension currently being edited, prefixed
    /// with the dashboard's `$variable` names
    pub async fn suggest_dimension_values(&self, dimension_key: &str) -> Result<Vec<String>> {
        if dimension_key.is_empty() {
            return Ok(Vec::new());
        }

        let values = match self.target.repository {
            Some(Repository::Logs) => self.datasource.log_dimension_values(dimension_key).await?,
            Some(Repository::Metrics) if !self.target.metric.is_empty() => {
                self.datasource
                    .metric_dimension_values(&self.target.metric, dimension_key)
                    .await?
            }
            _ => return Ok(Vec::new()),
        };

        let mut suggestions: Vec<String> = self
            .template_variables
            .iter()
            .map(|name| format!("${}", name))
            .collect();
        suggestions.extend(values);
        Ok(suggestions)
    }

    /// Add an empty dimension row
    pub fn add_dimension(&mut self) {
        self.target.dimensions.push(Dimension::default());
    }

    /// Remove a dimension row and re-validate
    pub fn remove_dimension(&mut self, index: usize) {
        if index < self.target.dimensions.len() {
            self.target.dimensions.remove(index);
        }
        self.target.validate();
    }

    /// Add an empty grouping row
    pub fn add_group(&mut self) {
        self.target.groups.push(Group::default());
    }

    /// Remove a grouping row and re-validate
    pub fn remove_group(&mut self, index: usize) {
        if index < self.target.groups.len() {
            self.target.groups.remove(index);
        }
        self.target.validate();
    }
}
