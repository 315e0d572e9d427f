//! Configuration surfaces for the orchestrators and the REST client
//!
//! Everything here is a plain value passed in by the embedder; the crate
//! holds no global configuration state.

use serde::{Deserialize, Serialize};

/// Options recognized by the fetch-based orchestrators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Hits per page; backend default applies if omitted
    pub hits_per_page: Option<u32>,
    /// Page to request; defaults to 0
    pub page: Option<u32>,
    /// Issue requests even for an empty query
    pub immediate: bool,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set hits per page
    pub fn with_hits_per_page(mut self, hits_per_page: u32) -> Self {
        self.hits_per_page = Some(hits_per_page);
        self
    }

    /// Set the requested page
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Disable empty-query gating
    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    /// Whether a request should be issued for this query value
    pub fn enabled_for(&self, query: &str) -> bool {
        self.immediate || !query.is_empty()
    }
}

/// Settings for the REST search client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of the search backend
    pub base_url: String,
    /// Application identifier sent with every request
    pub app_id: Option<String>,
    /// API key sent with every request
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub request_timeout: f64,
    /// Maximum idle connections per host
    pub pool_maxsize: usize,
    /// Verify TLS certificates
    pub verify_ssl: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7700".to_string(),
            app_id: None,
            api_key: None,
            request_timeout: 5.0,
            pool_maxsize: 10,
            verify_ssl: true,
        }
    }
}

impl ClientSettings {
    /// Create settings pointing at a backend URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set credentials
    pub fn with_credentials(
        mut self,
        app_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        self.app_id = Some(app_id.into());
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout in seconds
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.request_timeout = seconds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gating() {
        let options = SearchOptions::new();
        assert!(!options.enabled_for(""));
        assert!(options.enabled_for("shoe"));

        let options = SearchOptions::new().immediate();
        assert!(options.enabled_for(""));
    }

    #[test]
    fn test_options_builder() {
        let options = SearchOptions::new().with_hits_per_page(5).with_page(2);
        assert_eq!(options.hits_per_page, Some(5));
        assert_eq!(options.page, Some(2));
        assert!(!options.immediate);
    }

    #[test]
    fn test_client_settings_defaults() {
        let settings = ClientSettings::new("https://search.example.com");
        assert_eq!(settings.base_url, "https://search.example.com");
        assert!(settings.api_key.is_none());
        assert!(settings.verify_ssl);
    }
}
