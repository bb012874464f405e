//! Client configuration: application identity and transport settings.
//!
//! Loaded from a TOML file of the form:
//!
//! ```toml
//! api_url = "https://keyauth.win/api/1.2/"
//! timeout_secs = 30
//!
//! [app]
//! name = "MyApp"
//! owner_id = "abc123"
//! version = "1.0"
//! ```

use crate::error::{LicenseError, LicenseResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default KeyAuth API endpoint.
pub const DEFAULT_API_URL: &str = "https://keyauth.win/api/1.2/";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = "KeyAuth";

/// Fixed application identity registered with the licensing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    /// Application name.
    pub name: String,
    /// Owner ID, the application secret issued by the vendor.
    pub owner_id: String,
    /// Application version string.
    pub version: String,
}

impl AppIdentity {
    /// Creates an identity from its three parts.
    pub fn new(
        name: impl Into<String>,
        owner_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            owner_id: owner_id.into(),
            version: version.into(),
        }
    }
}

/// Licensing client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub app: AppIdentity,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Permits a plain `http://` endpoint. Only local test servers need this.
    #[serde(default)]
    pub allow_insecure_http: bool,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl ClientConfig {
    /// Creates a config for `app` with default transport settings.
    pub fn new(app: AppIdentity) -> Self {
        Self {
            app,
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            allow_insecure_http: false,
        }
    }

    /// Loads and validates a config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] if the file cannot be read, is not
    /// valid TOML, or fails [`ClientConfig::validate`].
    pub fn load_from(path: impl AsRef<Path>) -> LicenseResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LicenseError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&contents)?;
        info!("Loaded licensing config from {:?}", path);
        Ok(config)
    }

    /// Parses and validates a config from TOML text.
    pub fn from_toml(contents: &str) -> LicenseResult<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| LicenseError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the identity and transport settings are usable.
    pub fn validate(&self) -> LicenseResult<()> {
        let required = [
            ("app.name", &self.app.name),
            ("app.owner_id", &self.app.owner_id),
            ("app.version", &self.app.version),
            ("api_url", &self.api_url),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(LicenseError::Config(format!("{field} must not be empty")));
            }
        }
        if !self.allow_insecure_http && !self.api_url.starts_with("https://") {
            return Err(LicenseError::Config(format!(
                "api_url must use https: {}",
                self.api_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(LicenseError::Config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> AppIdentity {
        AppIdentity::new("MyApp", "owner", "1.0")
    }

    #[test]
    fn new_uses_defaults() {
        let cfg = ClientConfig::new(identity());
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.user_agent, "KeyAuth");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut cfg = ClientConfig::new(identity());
        cfg.timeout_secs = 0;
        assert!(matches!(cfg.validate(), Err(LicenseError::Config(_))));
    }

    #[test]
    fn plain_http_needs_opt_in() {
        let mut cfg = ClientConfig::new(identity());
        cfg.api_url = "http://127.0.0.1:8080/".to_string();
        assert!(matches!(cfg.validate(), Err(LicenseError::Config(_))));

        cfg.allow_insecure_http = true;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn blank_owner_id_is_rejected() {
        let cfg = ClientConfig::new(AppIdentity::new("MyApp", "  ", "1.0"));
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("app.owner_id"));
    }
}
