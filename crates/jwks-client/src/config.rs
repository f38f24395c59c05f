//! Key source configuration.
//!
//! Transport settings are an explicit value handed to
//! [`KeySource::connect`](crate::KeySource::connect). They are fixed for the
//! lifetime of the key source.
//!
//! # Example (TOML)
//!
//! ```toml
//! request_timeout = "30s"
//! insecure = false
//! allow_http = false
//! max_response_size = 1048576
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Transport configuration for a [`KeySource`](crate::KeySource).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeySourceConfig {
    /// Upper bound on the total round trip of one fetch (default: 30 seconds).
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Skip TLS certificate verification.
    /// Only meant for testing against endpoints with self-signed certificates.
    pub insecure: bool,

    /// Whether to allow HTTP (non-HTTPS) endpoints.
    /// This should only be enabled for testing.
    pub allow_http: bool,

    /// Maximum response size in bytes (default: 1 MB).
    pub max_response_size: usize,
}

impl Default for KeySourceConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30), // 30 seconds
            insecure: false,
            allow_http: false,
            max_response_size: 1024 * 1024, // 1 MB
        }
    }
}

impl KeySourceConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Disables TLS certificate verification.
    ///
    /// # Warning
    ///
    /// This should only be used for testing.
    #[must_use]
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Allows HTTP (non-HTTPS) endpoints.
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Sets the maximum response size.
    #[must_use]
    pub fn with_max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the request timeout or the
    /// response size limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "request_timeout must be > 0".to_string(),
            ));
        }

        if self.max_response_size == 0 {
            return Err(ConfigError::InvalidValue(
                "max_response_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// The configuration sources could not be read or merged.
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

pub mod loader {
    use std::path::PathBuf;

    use config::{Config, Environment, File};

    use super::{ConfigError, KeySourceConfig};

    /// Prefix for environment overrides, e.g. `JWKS__REQUEST_TIMEOUT=5s`.
    pub const ENV_PREFIX: &str = "JWKS";

    /// Loads a [`KeySourceConfig`] from an optional TOML file and
    /// `JWKS__*` environment variables.
    ///
    /// A missing file is skipped. Environment variables take precedence over
    /// the file. The result is validated before it is returned.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source cannot be parsed and
    /// `ConfigError::InvalidValue` if the merged values fail validation.
    pub fn load_config(path: Option<&str>) -> Result<KeySourceConfig, ConfigError> {
        let mut builder = Config::builder();
        if let Some(p) = path {
            let pathbuf = PathBuf::from(p);
            if pathbuf.exists() {
                builder = builder.add_source(File::from(pathbuf));
            } else {
                tracing::debug!("Config file {} not found, skipping", p);
            }
        }
        // Environment variable overrides, e.g., JWKS__INSECURE=true
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| ConfigError::Load(format!("config build error: {e}")))?;
        let merged: KeySourceConfig = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::Load(format!("config deserialize error: {e}")))?;
        merged.validate()?;
        Ok(merged)
    }
}
