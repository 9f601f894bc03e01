//! Provider JWKS fetching and caching.
//!
//! Verifying a provider-signed token needs the provider's public keys. This
//! cache fetches the JWK set over an injected [`reqwest::Client`], stores it
//! per endpoint URI, and serves decoding keys by `kid`. The TTL honors the
//! provider's `Cache-Control: max-age`, clamped to configured bounds so a
//! malicious or misconfigured header cannot pin a poisoned key set.
//!
//! Key rotation and cache policy live here, not in the callback state
//! machine; the verifier only asks for a key.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;
use url::Url;

/// Configuration for the JWKS cache.
#[derive(Debug, Clone)]
pub struct JwksCacheConfig {
    /// TTL used when the provider sends no Cache-Control header (default: 1 hour).
    pub default_ttl: Duration,

    /// Upper bound on the TTL regardless of Cache-Control (default: 24 hours).
    pub max_ttl: Duration,

    /// Lower bound on the TTL regardless of Cache-Control (default: 5 minutes).
    pub min_ttl: Duration,

    /// Whether to allow plain-HTTP JWKS endpoints. Testing only.
    pub allow_http: bool,
}

impl Default for JwksCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(3600),
            max_ttl: Duration::from_secs(86400),
            min_ttl: Duration::from_secs(300),
            allow_http: false,
        }
    }
}

impl JwksCacheConfig {
    /// Sets the default TTL.
    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Allows plain-HTTP JWKS endpoints.
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }
}

/// Errors that can occur during JWKS operations.
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    /// A network error occurred while fetching the JWKS.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint returned a non-success status code.
    #[error("HTTP error: status {0}")]
    Http(u16),

    /// The response could not be parsed as a JWK set.
    #[error("failed to parse JWKS: {0}")]
    Parse(String),

    /// No key with the requested `kid` exists in the JWK set.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The JWKS URI scheme is not allowed.
    #[error("invalid URL scheme: only HTTPS is allowed")]
    InvalidScheme,
}

struct CachedJwks {
    jwks: JwkSet,
    expires_at: Instant,
}

/// In-memory, per-URI cache of provider JWK sets.
pub struct JwksCache {
    http_client: reqwest::Client,
    cache: Arc<RwLock<HashMap<String, CachedJwks>>>,
    config: JwksCacheConfig,
}

impl JwksCache {
    /// Creates a cache bound to an explicit outbound HTTP client.
    #[must_use]
    pub fn new(http_client: reqwest::Client, config: JwksCacheConfig) -> Self {
        Self {
            http_client,
            cache: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Gets a decoding key by key ID, fetching the JWK set on cache miss.
    ///
    /// Returns the key together with the algorithm the JWK advertises, when
    /// it advertises one.
    ///
    /// # Errors
    ///
    /// Returns an error if the JWK set cannot be fetched or the key is absent
    /// from a freshly fetched set.
    pub async fn get_key(
        &self,
        jwks_uri: &Url,
        kid: &str,
    ) -> Result<(DecodingKey, Option<Algorithm>), JwksError> {
        if let Some(found) = self.get_cached_key(jwks_uri, kid).await {
            tracing::trace!("JWKS cache hit for kid {} from {}", kid, jwks_uri);
            return Ok(found);
        }

        tracing::debug!("JWKS cache miss for kid {} from {}", kid, jwks_uri);
        self.refresh(jwks_uri).await?;

        self.get_cached_key(jwks_uri, kid)
            .await
            .ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }

    async fn get_cached_key(
        &self,
        jwks_uri: &Url,
        kid: &str,
    ) -> Option<(DecodingKey, Option<Algorithm>)> {
        let cache = self.cache.read().await;
        let cached = cache.get(&normalize_uri(jwks_uri))?;
        if Instant::now() >= cached.expires_at {
            return None;
        }

        cached
            .jwks
            .keys
            .iter()
            .find(|k| k.common.key_id.as_deref() == Some(kid))
            .and_then(|jwk| {
                DecodingKey::from_jwk(jwk)
                    .ok()
                    .map(|dk| (dk, jwk_algorithm(jwk)))
            })
    }

    /// Fetches the JWK set from the endpoint and replaces the cached entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheme is not allowed, the request fails, or
    /// the body is not a JWK set.
    pub async fn refresh(&self, jwks_uri: &Url) -> Result<(), JwksError> {
        self.validate_scheme(jwks_uri)?;

        tracing::debug!("Fetching JWKS from {}", jwks_uri);

        let response = self
            .http_client
            .get(jwks_uri.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to fetch JWKS from {}: {}", jwks_uri, e);
                JwksError::Network(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(JwksError::Http(response.status().as_u16()));
        }

        let ttl = self.parse_cache_control(response.headers());

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| JwksError::Parse(e.to_string()))?;

        let mut cache = self.cache.write().await;
        cache.insert(
            normalize_uri(jwks_uri),
            CachedJwks {
                jwks,
                expires_at: Instant::now() + ttl,
            },
        );

        Ok(())
    }

    fn validate_scheme(&self, jwks_uri: &Url) -> Result<(), JwksError> {
        if jwks_uri.scheme() == "https" || self.config.allow_http {
            Ok(())
        } else {
            Err(JwksError::InvalidScheme)
        }
    }

    /// Derives the cache TTL from a `Cache-Control: max-age` header, clamped
    /// to the configured bounds.
    fn parse_cache_control(&self, headers: &reqwest::header::HeaderMap) -> Duration {
        let max_age = headers
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                v.split(',').find_map(|directive| {
                    directive
                        .trim()
                        .strip_prefix("max-age=")
                        .and_then(|secs| secs.parse::<u64>().ok())
                })
            });

        match max_age {
            Some(secs) => Duration::from_secs(secs).clamp(self.config.min_ttl, self.config.max_ttl),
            None => self.config.default_ttl,
        }
    }
}

fn normalize_uri(uri: &Url) -> String {
    uri.as_str().trim_end_matches('/').to_string()
}

/// Extracts the signing algorithm a JWK advertises, if any.
fn jwk_algorithm(jwk: &jsonwebtoken::jwk::Jwk) -> Option<Algorithm> {
    use jsonwebtoken::jwk::KeyAlgorithm;

    jwk.common.key_algorithm.and_then(|alg| match alg {
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
