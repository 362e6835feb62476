//! Datasource error types

use thiserror::Error;

/// Result type for datasource operations
pub type Result<T> = std::result::Result<T, DatasourceError>;

/// Errors that can occur while querying the pgmon backend
#[derive(Debug, Error)]
pub enum DatasourceError {
    /// Connection failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// Backend returned a non-success status
    #[error("backend error ({status}): {body}")]
    Backend {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        body: String,
    },

    /// Response could not be reshaped into the expected output
    #[error("response conversion failed: {0}")]
    Conversion(String),

    /// Time bound expression could not be parsed
    #[error("invalid time expression: {0}")]
    TimeParse(String),

    /// Malformed lookup query (e.g. a template-variable query)
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DatasourceError {
    fn from(err: serde_json::Error) -> Self {
        DatasourceError::Serialization(err.to_string())
    }
}
