//! OpenID Connect provider metadata discovery.
//!
//! Fetches the `.well-known/openid-configuration` document so a
//! [`ProviderConfig`](crate::config::ProviderConfig) can be completed from an
//! issuer URL alone. The callback state machine itself never calls this; it
//! runs once at outpost startup.

use serde::{Deserialize, Serialize};
use url::Url;

/// Errors that can occur during provider discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// A network error occurred while fetching the document.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint returned a non-success status code.
    #[error("HTTP error: status {0}")]
    Http(u16),

    /// The response could not be parsed as a discovery document.
    #[error("failed to parse discovery document: {0}")]
    Parse(String),

    /// The document's issuer does not match the issuer it was fetched for.
    #[error("issuer mismatch: expected {expected}, got {actual}")]
    IssuerMismatch {
        /// The issuer the document was fetched for.
        expected: String,
        /// The issuer the document asserts.
        actual: String,
    },
}

/// The subset of OIDC provider metadata the outpost needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// URL the provider asserts as its issuer identifier.
    pub issuer: String,

    /// URL of the provider's authorization endpoint.
    pub authorization_endpoint: String,

    /// URL of the provider's token endpoint.
    pub token_endpoint: String,

    /// URL of the provider's JSON Web Key Set document.
    pub jwks_uri: String,

    /// URL of the provider's UserInfo endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,

    /// URL for RP-initiated logout at the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,
}

impl ProviderMetadata {
    /// Fetches provider metadata for an issuer over the given client.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be fetched or parsed, or if
    /// the document's `issuer` does not match `issuer` (trailing slashes
    /// ignored).
    pub async fn discover(
        http_client: &reqwest::Client,
        issuer: &Url,
    ) -> Result<Self, DiscoveryError> {
        let well_known = format!(
            "{}/.well-known/openid-configuration",
            issuer.as_str().trim_end_matches('/')
        );

        tracing::debug!("Fetching provider metadata from {}", well_known);

        let response = http_client
            .get(&well_known)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| DiscoveryError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DiscoveryError::Http(response.status().as_u16()));
        }

        let metadata: Self = response
            .json()
            .await
            .map_err(|e| DiscoveryError::Parse(e.to_string()))?;

        let expected = issuer.as_str().trim_end_matches('/');
        let actual = metadata.issuer.trim_end_matches('/');
        if expected != actual {
            return Err(DiscoveryError::IssuerMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }

        Ok(metadata)
    }
}
