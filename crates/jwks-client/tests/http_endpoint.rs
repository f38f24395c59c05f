//! Integration tests against a mock JWKS endpoint.
//!
//! These tests exercise the full flow: HTTP fetch, JWK Set decoding,
//! caching and the refresh-on-miss lookup policy.

use std::time::Duration;

use jwks_client::{JwksError, KeySource, KeySourceConfig, KeyType};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Example key set from RFC 7517, appendix A.1.
fn rfc7517_jwks() -> serde_json::Value {
    serde_json::json!({
        "keys": [
            {
                "kty": "EC",
                "crv": "P-256",
                "x": "MKBCTNIcKUSDii11ySs3526iDZ8AiTo7Tu6KPAqv7D4",
                "y": "4Etl6SRW2YiLUrN5vfvVHuhp7x8PxltmWWlbbM4IFyM",
                "use": "enc",
                "kid": "1"
            },
            {
                "kty": "RSA",
                "n": "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw",
                "e": "AQAB",
                "alg": "RS256",
                "kid": "2011-04-29"
            }
        ]
    })
}

fn test_config() -> KeySourceConfig {
    KeySourceConfig::default()
        .with_allow_http(true)
        .with_request_timeout(Duration::from_secs(5))
}

fn jwks_uri(server: &MockServer) -> Url {
    Url::parse(&format!("{}{}", server.uri(), JWKS_PATH)).unwrap()
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

#[tokio::test]
async fn test_resolve_keys_from_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(rfc7517_jwks()))
        .mount(&server)
        .await;

    let source = KeySource::connect(jwks_uri(&server), test_config())
        .await
        .unwrap();
    assert_eq!(request_count(&server).await, 1);

    let key = source.resolve("2011-04-29").await.unwrap();
    assert_eq!(key.key_type(), KeyType::Rsa);
    assert_eq!(key.kid(), "2011-04-29");

    let key = source.resolve("1").await.unwrap();
    assert_eq!(key.key_type(), KeyType::Ec);

    // Both answered from the cache
    assert_eq!(request_count(&server).await, 1);

    let err = source.resolve("missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "unrecognized key id");

    // Exactly one refresh for the miss
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_empty_key_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"keys": []})))
        .mount(&server)
        .await;

    let source = KeySource::connect(jwks_uri(&server), test_config())
        .await
        .unwrap();

    let err = source.resolve("anything").await.unwrap_err();
    assert!(matches!(err, JwksError::KeyNotFound { .. }));
}

#[tokio::test]
async fn test_key_rotation() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"keys": []})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(rfc7517_jwks()))
        .mount(&server)
        .await;

    let source = KeySource::connect(jwks_uri(&server), test_config())
        .await
        .unwrap();
    assert!(source.cache().is_empty());

    // Rotated in after construction; found by the refresh on miss
    let key = source.resolve("2011-04-29").await.unwrap();
    assert_eq!(key.kid(), "2011-04-29");
    assert_eq!(request_count(&server).await, 2);
}

// =============================================================================
// Fetch failures
// =============================================================================

#[tokio::test]
async fn test_construction_fails_on_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"keys\": not json"))
        .mount(&server)
        .await;

    let err = KeySource::connect(jwks_uri(&server), test_config())
        .await
        .unwrap_err();
    assert!(err.is_fetch_error());
    assert!(matches!(err, JwksError::Decode(_)));
}

#[tokio::test]
async fn test_construction_fails_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = KeySource::connect(jwks_uri(&server), test_config())
        .await
        .unwrap_err();
    assert!(matches!(err, JwksError::HttpStatus(404)));
}

#[tokio::test]
async fn test_fetch_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(rfc7517_jwks())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = test_config().with_request_timeout(Duration::from_millis(200));
    let err = KeySource::connect(jwks_uri(&server), config)
        .await
        .unwrap_err();
    assert!(matches!(err, JwksError::Timeout(_)));
    assert!(err.is_fetch_error());
}

#[tokio::test]
async fn test_oversized_response_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(rfc7517_jwks()))
        .mount(&server)
        .await;

    let config = test_config().with_max_response_size(64);
    let err = KeySource::connect(jwks_uri(&server), config)
        .await
        .unwrap_err();
    assert!(matches!(err, JwksError::ResponseTooLarge { max_size: 64 }));
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    // Bind then drop a listener so nothing accepts on the port
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let uri = Url::parse(&format!("http://127.0.0.1:{port}{JWKS_PATH}")).unwrap();

    let err = KeySource::connect(uri, test_config()).await.unwrap_err();
    assert!(matches!(err, JwksError::Network(_)), "got {err:?}");
    assert!(err.is_fetch_error());
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn test_http_endpoint_rejected_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(rfc7517_jwks()))
        .mount(&server)
        .await;

    let err = KeySource::connect(jwks_uri(&server), KeySourceConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, JwksError::InvalidScheme(_)));
    assert!(err.is_config_error());
    assert_eq!(request_count(&server).await, 0);
}
