//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Connect + read budget applied to every request. Not overridable.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable read by [`ClientConfig::from_env`].
pub const BASE_URL_ENV: &str = "PAYGATE_BASE_URL";

/// Validated construction-time configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: Url,
    timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme `{}`", parsed.scheme())));
        }
        if parsed.cannot_be_a_base() || parsed.host_str().is_none() {
            return Err(invalid("url has no host".to_string()));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(invalid("url must not carry a query or fragment".to_string()));
        }
        Ok(Self {
            base_url: parsed,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var(BASE_URL_ENV).map_err(|_| ConfigError::MissingEnv(BASE_URL_ENV))?;
        Self::new(&raw)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Join a registry path (always starting with `/`) onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base())
    }
}
