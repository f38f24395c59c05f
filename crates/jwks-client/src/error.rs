//! Error types for key-set fetching and key resolution.
//!
//! Errors fall into three groups:
//!
//! - **fetch** errors: the endpoint could not be reached or returned a
//!   document that could not be decoded. These are transient from the
//!   caller's point of view and may be retried later.
//! - **not found**: the endpoint was reached, returned a valid document, and
//!   the requested key ID is not in it. Retrying will not help.
//! - **configuration** errors: the client could not be built at all.

use std::time::Duration;

use crate::config::ConfigError;

/// Errors that can occur while fetching key sets or resolving keys.
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    /// A network error occurred while fetching the key set.
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The endpoint returned a non-success status code.
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),

    /// The response exceeded the maximum allowed size.
    #[error("Response exceeds maximum size of {max_size} bytes")]
    ResponseTooLarge {
        /// The maximum allowed size.
        max_size: usize,
    },

    /// The response body is not a valid key-set document.
    #[error("Failed to decode key set: {0}")]
    Decode(String),

    /// A key in the document could not be turned into usable key material.
    #[error("Invalid key '{kid}': {reason}")]
    InvalidKey {
        /// ID of the offending key.
        kid: String,
        /// Why the key was rejected.
        reason: String,
    },

    /// The key ID is not present in the key set, even after a refresh.
    #[error("unrecognized key id")]
    KeyNotFound {
        /// The key ID that was requested.
        kid: String,
    },

    /// The endpoint scheme is not allowed (must be HTTPS unless configured).
    #[error("Invalid URL scheme '{0}': only HTTPS is allowed")]
    InvalidScheme(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// The supplied configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl JwksError {
    /// Creates a `KeyNotFound` error for the given key ID.
    #[must_use]
    pub fn key_not_found(kid: impl Into<String>) -> Self {
        Self::KeyNotFound { kid: kid.into() }
    }

    /// Creates an `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(kid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            kid: kid.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the key ID is absent from an authoritative key set.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }

    /// Returns `true` if this is a transport or decode failure.
    ///
    /// Callers may retry these later.
    #[must_use]
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout(_)
                | Self::HttpStatus(_)
                | Self::ResponseTooLarge { .. }
                | Self::Decode(_)
                | Self::InvalidKey { .. }
        )
    }

    /// Returns `true` if the client could not be built from its configuration.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidScheme(_) | Self::Client(_) | Self::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = JwksError::key_not_found("missing");
        assert_eq!(err.to_string(), "unrecognized key id");

        let err = JwksError::Network("connection refused".to_string());
        assert_eq!(err.to_string(), "Network error: connection refused");

        let err = JwksError::HttpStatus(503);
        assert_eq!(err.to_string(), "HTTP error: status 503");

        let err = JwksError::ResponseTooLarge { max_size: 1024 };
        assert_eq!(
            err.to_string(),
            "Response exceeds maximum size of 1024 bytes"
        );

        let err = JwksError::invalid_key("k1", "bad modulus");
        assert_eq!(err.to_string(), "Invalid key 'k1': bad modulus");

        let err = JwksError::InvalidScheme("ftp".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid URL scheme 'ftp': only HTTPS is allowed"
        );
    }

    #[test]
    fn test_error_predicates() {
        assert!(JwksError::key_not_found("x").is_not_found());
        assert!(!JwksError::key_not_found("x").is_fetch_error());

        assert!(JwksError::Network("x".to_string()).is_fetch_error());
        assert!(JwksError::Timeout(Duration::from_secs(1)).is_fetch_error());
        assert!(JwksError::HttpStatus(500).is_fetch_error());
        assert!(JwksError::Decode("x".to_string()).is_fetch_error());
        assert!(JwksError::invalid_key("k", "r").is_fetch_error());
        assert!(!JwksError::Decode("x".to_string()).is_not_found());

        assert!(JwksError::InvalidScheme("http".to_string()).is_config_error());
        assert!(JwksError::Client("x".to_string()).is_config_error());
        assert!(
            JwksError::from(ConfigError::InvalidValue("x".to_string())).is_config_error()
        );
        assert!(!JwksError::Network("x".to_string()).is_config_error());
    }
}
