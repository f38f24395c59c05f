//! # jwks-client
//!
//! Client-side cache for public keys published by a JSON Web Key Set
//! endpoint.
//!
//! Token verification code asks a [`KeySource`] for the key behind a `kid`.
//! Known keys are served from memory; an unknown `kid` triggers one refresh
//! of the whole key set before the lookup is given up as
//! [`JwksError::KeyNotFound`].
//!
//! ## Modules
//!
//! - [`source`] - Key resolution and refresh policy
//! - [`cache`] - Concurrent kid to key storage
//! - [`decoder`] - Key-set document decoding
//! - [`transport`] - Fetching documents over HTTP(S)
//! - [`config`] - Transport configuration and loading
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```ignore
//! use jwks_client::{KeySource, KeySourceConfig};
//! use url::Url;
//!
//! let endpoint = Url::parse("https://auth.example.com/.well-known/jwks.json")?;
//! let source = KeySource::connect(endpoint, KeySourceConfig::default()).await?;
//!
//! match source.resolve(kid).await {
//!     Ok(key) => verify(token, key.decoding_key()),
//!     Err(e) if e.is_not_found() => reject(token),
//!     Err(e) => retry_later(e),
//! }
//! ```

pub mod cache;
pub mod config;
pub mod decoder;
pub mod error;
pub mod source;
pub mod transport;

pub use cache::KeyCache;
pub use config::{ConfigError, KeySourceConfig};
pub use decoder::{JwkSetDecoder, KeySetDecoder, KeyType, PublicKey};
pub use error::JwksError;
pub use source::{KeySource, KeySourceStats};
pub use transport::{HttpTransport, Transport};

/// Type alias for key-set operation results.
pub type JwksResult<T> = Result<T, JwksError>;
