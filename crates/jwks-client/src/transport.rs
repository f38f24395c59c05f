//! Key-set document transport.
//!
//! [`Transport`] is the narrow capability the key source needs from the
//! network: fetch the raw bytes behind an endpoint. [`HttpTransport`] is the
//! reqwest-backed implementation used by [`KeySource::connect`].
//!
//! # Security Considerations
//!
//! - Only HTTPS endpoints are allowed unless `allow_http` is configured
//! - TLS certificates are verified unless `insecure` is configured
//! - A total request timeout prevents hanging on slow endpoints
//! - Response size is limited
//!
//! [`KeySource::connect`]: crate::KeySource::connect

use async_trait::async_trait;
use url::Url;

use crate::JwksResult;
use crate::config::KeySourceConfig;
use crate::error::JwksError;

/// Fetches raw key-set documents.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches the document behind `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns a fetch-kind error on connection failure, timeout, non-success
    /// status or oversized response.
    async fn fetch(&self, endpoint: &Url) -> JwksResult<Vec<u8>>;
}

/// HTTP(S) transport built on `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client with timeout and TLS settings applied.
    http_client: reqwest::Client,
    /// Configuration.
    config: KeySourceConfig,
}

impl HttpTransport {
    /// Creates a transport from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: KeySourceConfig) -> JwksResult<Self> {
        config.validate()?;

        if config.insecure {
            tracing::warn!("TLS certificate verification is disabled for JWKS fetching");
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| JwksError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Creates a transport with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_defaults() -> JwksResult<Self> {
        Self::new(KeySourceConfig::default())
    }

    /// The configuration this transport was built with.
    pub fn config(&self) -> &KeySourceConfig {
        &self.config
    }

    /// Validates that the endpoint uses an allowed scheme.
    pub fn validate_scheme(&self, endpoint: &Url) -> JwksResult<()> {
        let scheme = endpoint.scheme();

        if scheme == "https" {
            return Ok(());
        }

        if scheme == "http" && self.config.allow_http {
            return Ok(());
        }

        Err(JwksError::InvalidScheme(scheme.to_string()))
    }

    fn map_request_error(&self, endpoint: &Url, err: reqwest::Error) -> JwksError {
        tracing::warn!("Failed to fetch JWKS from {}: {}", endpoint, err);
        if err.is_timeout() {
            JwksError::Timeout(self.config.request_timeout)
        } else {
            JwksError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, endpoint: &Url) -> JwksResult<Vec<u8>> {
        self.validate_scheme(endpoint)?;

        tracing::debug!("Fetching JWKS from {}", endpoint);

        let response = self
            .http_client
            .get(endpoint.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.map_request_error(endpoint, e))?;

        // Check status
        if !response.status().is_success() {
            tracing::warn!(
                "JWKS endpoint {} returned status {}",
                endpoint,
                response.status()
            );
            return Err(JwksError::HttpStatus(response.status().as_u16()));
        }

        // Check content length
        let max_size = self.config.max_response_size;
        if let Some(len) = response.content_length()
            && len > max_size as u64
        {
            return Err(JwksError::ResponseTooLarge { max_size });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_request_error(endpoint, e))?;

        // Content-Length may be absent (chunked responses)
        if body.len() > max_size {
            return Err(JwksError::ResponseTooLarge { max_size });
        }

        Ok(body.to_vec())
    }
}
