//! Configuration file loading and validation

use permaudit_client::{Credentials, ServerConfig};
use permaudit_core::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the token secret
pub const TOKEN_SECRET_ENV: &str = "PERMAUDIT_TOKEN_SECRET";

/// Environment variable overriding the token name
pub const TOKEN_NAME_ENV: &str = "PERMAUDIT_TOKEN_NAME";

/// `~/.permaudit/config.toml`, or a relative path when no home directory exists
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".permaudit")
        .join("config.toml")
}

/// Sign-in settings. The secret is never read from the file.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Personal access token name
    pub token_name: String,
    #[serde(skip)]
    token_secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_name", &self.token_name)
            .field("token_secret", &self.token_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory export files are written to
    pub output_dir: PathBuf,
    /// Resources processed at once
    pub concurrency: usize,
    /// Timeout around each individual fetch
    pub fetch_timeout_seconds: u64,
    /// Also write the group membership file
    pub include_group_members: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            concurrency: 4,
            fetch_timeout_seconds: 60,
            include_group_members: false,
        }
    }
}

impl ExportConfig {
    /// Fetch timeout as a duration
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

/// Complete tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote service connection
    pub server: ServerConfig,
    /// Sign-in settings
    pub auth: AuthConfig,
    /// Export settings
    pub export: ExportConfig,
}

impl AppConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            AuditError::io(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::parse(&text)
            .map_err(|e| AuditError::invalid(format!("{}: {e}", path.display())))
    }

    /// Parse TOML text
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| AuditError::invalid(format!("failed to parse config: {e}")))
    }

    /// Pick up the token secret and name override from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Same as [`AppConfig::apply_env`] with an explicit variable lookup
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup(TOKEN_NAME_ENV).filter(|v| !v.is_empty()) {
            self.auth.token_name = name;
        }
        if let Some(secret) = lookup(TOKEN_SECRET_ENV).filter(|v| !v.is_empty()) {
            self.auth.token_secret = Some(secret);
        }
    }

    /// Credentials for sign-in
    pub fn credentials(&self) -> Result<Credentials> {
        if self.auth.token_name.is_empty() {
            return Err(AuditError::invalid(format!(
                "token name missing: set [auth] token_name or {TOKEN_NAME_ENV}"
            )));
        }
        let token_secret = self.auth.token_secret.clone().ok_or_else(|| {
            AuditError::invalid(format!("token secret missing: set {TOKEN_SECRET_ENV}"))
        })?;
        Ok(Credentials {
            token_name: self.auth.token_name.clone(),
            token_secret,
        })
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        if self.export.concurrency == 0 {
            return Err(AuditError::invalid("export concurrency must be at least 1"));
        }
        if self.export.fetch_timeout_seconds == 0 || self.export.fetch_timeout_seconds > 3600 {
            return Err(AuditError::invalid(
                "fetch timeout must be between 1 and 3600 seconds",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
[server]
url = "10ax"
site = "finance"

[auth]
token_name = "audit-bot"

[export]
output_dir = "/tmp/exports"
concurrency = 8
"#;

    #[test]
    fn test_parse_fills_defaults() {
        let config = AppConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.server.site, "finance");
        assert_eq!(config.server.api_version, "3.23");
        assert_eq!(config.server.timeout_seconds, 30);
        assert_eq!(config.export.concurrency, 8);
        assert_eq!(config.export.fetch_timeout_seconds, 60);
        assert!(!config.export.include_group_members);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.auth.token_name, "audit-bot");
    }

    #[test]
    fn test_malformed_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nurl = ").unwrap();
        assert_matches!(AppConfig::load(&path), Err(AuditError::Invalid { .. }));
    }

    #[test]
    fn test_secret_comes_from_environment_only() {
        let text = SAMPLE.replace(
            "token_name = \"audit-bot\"",
            "token_name = \"audit-bot\"\ntoken_secret = \"from-file\"",
        );
        let mut config = AppConfig::parse(&text).unwrap();
        assert_matches!(config.credentials(), Err(AuditError::Invalid { .. }));

        let env: HashMap<&str, &str> =
            [(TOKEN_SECRET_ENV, "s3cret"), (TOKEN_NAME_ENV, "override")].into();
        config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));
        let creds = config.credentials().unwrap();
        assert_eq!(creds.token_name, "override");
        assert_eq!(creds.token_secret, "s3cret");
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn test_validation_bounds() {
        let mut config = AppConfig::parse(SAMPLE).unwrap();
        config.export.concurrency = 0;
        assert_matches!(config.validate(), Err(AuditError::Invalid { .. }));

        config.export.concurrency = 1;
        config.export.fetch_timeout_seconds = 3601;
        assert_matches!(config.validate(), Err(AuditError::Invalid { .. }));

        config.export.fetch_timeout_seconds = 3600;
        assert!(config.validate().is_ok());

        config.server.url.clear();
        assert!(config.validate().is_err());
    }
}
