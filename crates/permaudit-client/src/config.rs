//! Connection configuration

use permaudit_core::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Where and how to reach the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Cloud pod name (e.g. `10ax`) or full server URL
    pub url: String,
    /// REST API version
    pub api_version: String,
    /// Site content URL; empty for the default site
    pub site: String,
    /// Per-request timeout
    pub timeout_seconds: u64,
    /// Page size requested from listing endpoints
    pub page_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_version: "3.23".to_string(),
            site: String::new(),
            timeout_seconds: 30,
            page_size: 1000,
        }
    }
}

impl ServerConfig {
    /// Server root: full URLs are used as given, pod names expand to the
    /// hosted cloud domain.
    pub fn server_url(&self) -> String {
        if self.url.starts_with("http") {
            self.url.trim_end_matches('/').to_string()
        } else {
            format!("https://{}.online.tableau.com", self.url)
        }
    }

    /// Versioned REST API root
    pub fn api_url(&self) -> String {
        format!("{}/api/{}", self.server_url(), self.api_version)
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(AuditError::invalid("server url must be set"));
        }
        if self.api_version.trim().is_empty() {
            return Err(AuditError::invalid("api version must be set"));
        }
        if self.timeout_seconds == 0 || self.timeout_seconds > 3600 {
            return Err(AuditError::invalid(
                "server timeout must be between 1 and 3600 seconds",
            ));
        }
        if self.page_size == 0 {
            return Err(AuditError::invalid("page size must be positive"));
        }
        Ok(())
    }
}

/// Personal access token used to sign in
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Token name
    pub token_name: String,
    /// Token secret
    pub token_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token_name", &self.token_name)
            .field("token_secret", &"<redacted>")
            .finish()
    }
}
