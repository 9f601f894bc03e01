//! Bearer token verification.
//!
//! Verifies the provider-signed token cryptographically and validates the
//! registered claims (issuer, audience, expiry) before anything downstream
//! trusts the payload. Key discovery and rotation belong to the
//! [`JwksCache`](crate::oidc::jwks::JwksCache) collaborator; this component
//! only asks it for the key named by the token header.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Validation, decode_header};
use url::Url;

use crate::CallbackResult;
use crate::config::ProviderConfig;
use crate::error::CallbackError;
use crate::oidc::exchange::BearerToken;
use crate::oidc::jwks::JwksCache;

/// Verifies bearer tokens against the provider's published signing keys.
pub struct TokenVerifier {
    jwks: Arc<JwksCache>,
    jwks_uri: Url,
    issuer: String,
    client_id: String,
    clock_skew_tolerance: Duration,
}

impl TokenVerifier {
    /// Creates a verifier for the given provider.
    #[must_use]
    pub fn new(jwks: Arc<JwksCache>, provider: &ProviderConfig, clock_skew_tolerance: Duration) -> Self {
        Self {
            jwks,
            jwks_uri: provider.jwks_uri.clone(),
            issuer: provider.issuer.clone(),
            client_id: provider.client_id.clone(),
            clock_skew_tolerance,
        }
    }

    /// Verifies a bearer token and yields its claims payload.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::VerificationFailed`] for a bad signature,
    /// expired token, audience or issuer mismatch, missing `kid`, or an
    /// unreachable key set.
    pub async fn verify(&self, token: &BearerToken) -> CallbackResult<serde_json::Value> {
        let header = decode_header(token.as_str()).map_err(CallbackError::verification)?;
        let kid = header
            .kid
            .ok_or_else(|| CallbackError::verification("token is missing key ID (kid) header"))?;

        let (decoding_key, key_alg) = self
            .jwks
            .get_key(&self.jwks_uri, &kid)
            .await
            .map_err(CallbackError::verification)?;

        // Prefer the algorithm the key advertises, fall back to the header's.
        let alg = key_alg.unwrap_or(header.alg);

        let mut validation = Validation::new(alg);
        validation.set_audience(&[&self.client_id]);
        validation.set_issuer(&[self.issuer.trim_end_matches('/')]);
        validation.leeway = self.clock_skew_tolerance.as_secs();

        let token_data =
            jsonwebtoken::decode::<serde_json::Value>(token.as_str(), &decoding_key, &validation)
                .map_err(CallbackError::verification)?;

        tracing::debug!(
            "Verified bearer token from issuer {} (kid {})",
            self.issuer,
            kid
        );

        Ok(token_data.claims)
    }
}
