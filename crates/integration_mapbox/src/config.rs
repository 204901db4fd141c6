//! Mapbox client configuration

use std::env;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable holding the default access token
pub const API_KEY_ENV: &str = "MAPBOX_API_KEY";

/// Configuration for [`MapboxClient`](crate::MapboxClient)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapboxConfig {
    /// Base URL of the Mapbox API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Distances API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Access token; falls back to `MAPBOX_API_KEY` when unset
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Request timeout of the default transport, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.mapbox.com".to_string()
}

fn default_api_version() -> String {
    "v1".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for MapboxConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl MapboxConfig {
    /// Default configuration with the access token read from `MAPBOX_API_KEY`
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_key: env::var(API_KEY_ENV)
                .ok()
                .filter(|key| !key.is_empty())
                .map(SecretString::from),
            ..Self::default()
        }
    }

    /// Create a configuration pointing at a mock server
    #[must_use]
    pub fn for_testing(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: Some(SecretString::from("test-token".to_string())),
            timeout_secs: 5,
            ..Self::default()
        }
    }

    /// Set the access token
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Parse the base URL
    pub(crate) fn parsed_base_url(&self) -> Result<Url, String> {
        let url = Url::parse(&self.base_url).map_err(|e| format!("invalid base_url: {e}"))?;
        if url.cannot_be_a_base() {
            return Err(format!("base_url cannot be a base: {}", self.base_url));
        }
        Ok(url)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        self.parsed_base_url()?;

        if self.api_version.trim().is_empty() {
            return Err("api_version must not be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        Ok(())
    }
}
