//! Datasource configuration

use serde::{Deserialize, Serialize};

/// Connection settings for a pgmon backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasourceConfig {
    /// pgmon HTTP URL (e.g., "http://localhost:8080")
    pub url: String,

    /// Display name for this datasource instance
    pub name: String,

    /// Username for authentication (optional)
    pub username: Option<String>,

    /// Password for authentication (optional)
    pub password: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".into(),
            name: "pgmon".into(),
            username: None,
            password: None,
            timeout_secs: 30,
        }
    }
}

impl DatasourceConfig {
    /// Create a new config with URL and display name
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set authentication credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = DatasourceConfig::default();
        assert_eq!(config.url, "http://localhost:8080");
        assert_eq!(config.name, "pgmon");
        assert!(config.username.is_none());
        assert!(config.password.is_none());
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_config_new() {
        let config = DatasourceConfig::new("http://monitor:8080", "staging");
        assert_eq!(config.url, "http://monitor:8080");
        assert_eq!(config.name, "staging");
    }

    #[test]
    fn test_config_with_credentials() {
        let config = DatasourceConfig::default().with_credentials("admin", "secret");
        assert_eq!(config.username, Some("admin".to_string()));
        assert_eq!(config.password, Some("secret".to_string()));
    }
}
