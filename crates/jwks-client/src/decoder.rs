//! Key-set document decoding.
//!
//! A [`KeySetDecoder`] turns the raw body returned by the endpoint into an
//! ordered list of `(kid, key)` pairs. The cache and lookup logic in
//! [`KeySource`](crate::KeySource) only depend on this trait, so other
//! document dialects can be plugged in without touching them.
//!
//! [`JwkSetDecoder`] handles RFC 7517 JSON Web Key Sets via `jsonwebtoken`.

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};

use crate::JwksResult;
use crate::error::JwksError;

/// Decodes a fetched key-set document into key material.
pub trait KeySetDecoder: Send + Sync {
    /// Decoded key material stored in the cache.
    type Key: Send + Sync;

    /// Decodes `body` into `(kid, key)` pairs in document order.
    ///
    /// # Errors
    ///
    /// Returns a fetch-kind error if the document is malformed as a whole.
    fn decode(&self, body: &[u8]) -> JwksResult<Vec<(String, Self::Key)>>;
}

/// Key family, taken from the JWK `kty` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// Elliptic curve (`EC`).
    Ec,
    /// RSA (`RSA`).
    Rsa,
    /// Symmetric octet sequence (`oct`).
    Oct,
    /// Octet key pair, e.g. Ed25519 (`OKP`).
    Okp,
}

impl KeyType {
    fn of(jwk: &Jwk) -> Self {
        match &jwk.algorithm {
            AlgorithmParameters::EllipticCurve(_) => Self::Ec,
            AlgorithmParameters::RSA(_) => Self::Rsa,
            AlgorithmParameters::OctetKey(_) => Self::Oct,
            AlgorithmParameters::OctetKeyPair(_) => Self::Okp,
        }
    }
}

/// A decoded key from a JSON Web Key Set.
#[derive(Clone)]
pub struct PublicKey {
    kid: String,
    key_type: KeyType,
    algorithm: Option<Algorithm>,
    decoding_key: DecodingKey,
    jwk: Jwk,
}

impl PublicKey {
    /// The key ID (`kid`).
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The key family.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// The algorithm declared by the `alg` parameter, if it is a JWS algorithm.
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    /// The declared `use`, if any.
    pub fn key_use(&self) -> Option<&PublicKeyUse> {
        self.jwk.common.public_key_use.as_ref()
    }

    /// Returns `false` only for keys explicitly marked `use: "enc"`.
    pub fn is_signing_key(&self) -> bool {
        !matches!(self.key_use(), Some(PublicKeyUse::Encryption))
    }

    /// Key material ready for signature verification.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// The JWK this key was decoded from.
    pub fn jwk(&self) -> &Jwk {
        &self.jwk
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey")
            .field("kid", &self.kid)
            .field("key_type", &self.key_type)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Decoder for JSON Web Key Set documents (`{"keys": [...]}`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JwkSetDecoder;

impl KeySetDecoder for JwkSetDecoder {
    type Key = PublicKey;

    fn decode(&self, body: &[u8]) -> JwksResult<Vec<(String, PublicKey)>> {
        let jwks: JwkSet =
            serde_json::from_slice(body).map_err(|e| JwksError::Decode(e.to_string()))?;

        let mut pairs = Vec::with_capacity(jwks.keys.len());
        for jwk in jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                tracing::warn!("Skipping JWK without kid ({:?})", KeyType::of(&jwk));
                continue;
            };

            let decoding_key = DecodingKey::from_jwk(&jwk)
                .map_err(|e| JwksError::invalid_key(kid.as_str(), e.to_string()))?;

            let key = PublicKey {
                kid: kid.clone(),
                key_type: KeyType::of(&jwk),
                algorithm: jwk_algorithm(&jwk),
                decoding_key,
                jwk,
            };
            pairs.push((kid, key));
        }

        Ok(pairs)
    }
}

/// Extracts the algorithm from a JWK.
fn jwk_algorithm(jwk: &Jwk) -> Option<Algorithm> {
    jwk.common.key_algorithm.as_ref().and_then(|alg| match alg {
        KeyAlgorithm::HS256 => Some(Algorithm::HS256),
        KeyAlgorithm::HS384 => Some(Algorithm::HS384),
        KeyAlgorithm::HS512 => Some(Algorithm::HS512),
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    })
}
