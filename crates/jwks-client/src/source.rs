//! Key resolution backed by a remote key-set endpoint.
//!
//! [`KeySource`] owns an endpoint, a [`Transport`] to reach it, a
//! [`KeySetDecoder`] to parse what comes back and a [`KeyCache`] holding the
//! result.
//!
//! # Lookup policy
//!
//! - Construction fetches the key set once; if that fails, no key source is
//!   returned.
//! - [`KeySource::resolve`] answers from the cache when it can, without any
//!   network access.
//! - On a miss it refreshes the whole key set once and looks again. A key ID
//!   that is still absent is reported as [`JwksError::KeyNotFound`].
//! - Refreshes merge into the cache. Keys that disappear from the document
//!   stay resolvable.
//!
//! # Concurrent misses
//!
//! Refreshes are serialized. A caller that missed while another refresh was
//! in flight re-checks the cache after that refresh completes instead of
//! issuing a fetch of its own, so a burst of misses for a newly rotated key
//! costs a single round trip.
//!
//! # Example
//!
//! ```ignore
//! use jwks_client::{KeySource, KeySourceConfig};
//! use url::Url;
//!
//! let endpoint = Url::parse("https://auth.example.com/.well-known/jwks.json")?;
//! let source = KeySource::connect(endpoint, KeySourceConfig::default()).await?;
//!
//! let key = source.resolve("2011-04-29").await?;
//! let token = jsonwebtoken::decode::<Claims>(jwt, key.decoding_key(), &validation)?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use url::Url;

use crate::JwksResult;
use crate::cache::KeyCache;
use crate::config::KeySourceConfig;
use crate::decoder::{JwkSetDecoder, KeySetDecoder};
use crate::error::JwksError;
use crate::transport::{HttpTransport, Transport};

/// Counters describing how a key source has been used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySourceStats {
    /// Lookups answered from the cache.
    pub hits: u64,

    /// Lookups that missed the cache.
    pub misses: u64,

    /// Successful refreshes, including the initial fetch.
    pub refreshes: u64,

    /// Refreshes that failed.
    pub failed_refreshes: u64,

    /// Number of keys currently cached.
    pub cached_keys: usize,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    failed_refreshes: AtomicU64,
}

/// Resolves key IDs to keys published at a key-set endpoint.
///
/// Share one instance (e.g. behind an `Arc`) between all verification paths;
/// every method takes `&self`.
pub struct KeySource<D: KeySetDecoder = JwkSetDecoder> {
    /// Key-set endpoint.
    endpoint: Url,
    /// Fetches raw documents from the endpoint.
    transport: Arc<dyn Transport>,
    /// Parses fetched documents.
    decoder: D,
    /// Resolved keys by kid.
    cache: KeyCache<D::Key>,
    /// Serializes refreshes.
    refresh_gate: Mutex<()>,
    /// Number of completed refreshes; bumped after the cache is populated.
    generation: AtomicU64,
    counters: Counters,
}

impl KeySource<JwkSetDecoder> {
    /// Connects to a JSON Web Key Set endpoint over HTTP(S).
    ///
    /// The key set is fetched before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid or the endpoint scheme is not allowed
    /// - The initial fetch fails (network error, timeout, bad status)
    /// - The document cannot be decoded
    pub async fn connect(endpoint: Url, config: KeySourceConfig) -> JwksResult<Self> {
        let transport = HttpTransport::new(config)?;
        transport.validate_scheme(&endpoint)?;

        Self::with_parts(endpoint, Arc::new(transport), JwkSetDecoder).await
    }
}

impl<D: KeySetDecoder> KeySource<D> {
    /// Creates a key source from an explicit transport and decoder.
    ///
    /// Like [`KeySource::connect`], the key set is fetched before this returns.
    ///
    /// # Errors
    ///
    /// Returns the fetch or decode error of the initial refresh.
    pub async fn with_parts(
        endpoint: Url,
        transport: Arc<dyn Transport>,
        decoder: D,
    ) -> JwksResult<Self> {
        let source = Self {
            endpoint,
            transport,
            decoder,
            cache: KeyCache::new(),
            refresh_gate: Mutex::new(()),
            generation: AtomicU64::new(0),
            counters: Counters::default(),
        };

        let keys = source.refresh().await?;
        tracing::info!(endpoint = %source.endpoint, keys, "JWKS key source initialized");

        Ok(source)
    }

    /// Returns the key for `kid`.
    ///
    /// Answers from the cache when possible. On a miss, refreshes the key set
    /// once and looks again.
    ///
    /// # Errors
    ///
    /// - [`JwksError::KeyNotFound`] if the key set does not contain `kid`
    ///   even after the refresh
    /// - a fetch-kind error if the refresh itself fails
    pub async fn resolve(&self, kid: &str) -> JwksResult<Arc<D::Key>> {
        let observed = self.generation.load(Ordering::Acquire);

        if let Some(key) = self.cache.get(kid) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Cache hit for JWKS key: {} from {}", kid, self.endpoint);
            return Ok(key);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Cache miss for JWKS key: {} from {}", kid, self.endpoint);
        self.refresh_after_miss(observed).await?;

        self.cache.get(kid).ok_or_else(|| {
            tracing::debug!("Key {} not present in JWKS from {}", kid, self.endpoint);
            JwksError::key_not_found(kid)
        })
    }

    /// Fetches the key set and merges every key into the cache.
    ///
    /// Keys cached by earlier refreshes are kept even if the new document no
    /// longer lists them.
    ///
    /// Returns the number of keys in the fetched document.
    ///
    /// # Errors
    ///
    /// Returns a fetch-kind error on transport or decode failure. The cache
    /// is left untouched in that case.
    pub async fn refresh(&self) -> JwksResult<usize> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Refreshes on behalf of a lookup that missed at `observed` generation.
    async fn refresh_after_miss(&self, observed: u64) -> JwksResult<()> {
        let _gate = self.refresh_gate.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            tracing::trace!("JWKS from {} refreshed while waiting", self.endpoint);
            return Ok(());
        }

        self.refresh_locked().await.map(|_| ())
    }

    /// Must be called with `refresh_gate` held.
    async fn refresh_locked(&self) -> JwksResult<usize> {
        let pairs = match self.fetch_and_decode().await {
            Ok(pairs) => pairs,
            Err(e) => {
                self.counters.failed_refreshes.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Failed to refresh JWKS from {}: {}", self.endpoint, e);
                return Err(e);
            }
        };

        let count = pairs.len();
        for (kid, key) in pairs {
            self.cache.put(kid, key);
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        tracing::debug!(
            "Cached JWKS from {} with {} keys ({} total, generation {})",
            self.endpoint,
            count,
            self.cache.len(),
            generation
        );

        Ok(count)
    }

    async fn fetch_and_decode(&self) -> JwksResult<Vec<(String, D::Key)>> {
        let body = self.transport.fetch(&self.endpoint).await?;
        self.decoder.decode(&body)
    }

    /// The key-set endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Read access to the cached keys.
    pub fn cache(&self) -> &KeyCache<D::Key> {
        &self.cache
    }

    /// Returns usage counters.
    pub fn stats(&self) -> KeySourceStats {
        KeySourceStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            refreshes: self.generation.load(Ordering::Acquire),
            failed_refreshes: self.counters.failed_refreshes.load(Ordering::Relaxed),
            cached_keys: self.cache.len(),
        }
    }
}

impl<D: KeySetDecoder> std::fmt::Debug for KeySource<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySource")
            .field("endpoint", &self.endpoint.as_str())
            .field("cached_keys", &self.cache.len())
            .finish_non_exhaustive()
    }
}
