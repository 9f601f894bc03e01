//! Authorization-code token exchange.
//!
//! Redeems the single-use code returned on the callback against the
//! provider's token endpoint. The outbound [`reqwest::Client`] is injected at
//! construction so TLS and proxy behavior follow the outpost's own network
//! policy, never an ambient process-wide client. Codes are one-time-use by
//! provider contract, so nothing here retries: a failed exchange is final and
//! the flow must restart with a fresh code.

use serde::Deserialize;

use crate::CallbackResult;
use crate::config::ProviderConfig;
use crate::error::CallbackError;

/// Opaque bearer credential returned by the token exchange.
///
/// Used only to verify the identity token and to be carried on the
/// normalized claims for downstream forwarding; never persisted on its own.
#[derive(Debug, Clone)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// OAuth token response from the provider.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,

    /// The token type (usually "Bearer").
    pub token_type: Option<String>,

    /// Token expiration in seconds.
    pub expires_in: Option<u64>,

    /// Optional refresh token.
    pub refresh_token: Option<String>,

    /// Optional ID token (JWT).
    pub id_token: Option<String>,

    /// Granted scopes.
    pub scope: Option<String>,
}

/// OAuth error response from the provider.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Exchanges authorization codes with the provider's token endpoint.
pub struct CodeExchanger {
    http_client: reqwest::Client,
    provider: ProviderConfig,
}

impl CodeExchanger {
    /// Creates an exchanger bound to an explicit outbound HTTP client.
    #[must_use]
    pub fn new(http_client: reqwest::Client, provider: ProviderConfig) -> Self {
        Self {
            http_client,
            provider,
        }
    }

    /// Redeems an authorization code for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::MissingCode`] for an empty code (checked
    /// before any network call) and [`CallbackError::ExchangeFailed`] for
    /// transport errors, non-2xx responses, and malformed token responses.
    pub async fn exchange(&self, code: &str) -> CallbackResult<BearerToken> {
        if code.is_empty() {
            return Err(CallbackError::MissingCode);
        }

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.provider.redirect_uri.as_str()),
            ("client_id", &self.provider.client_id),
        ];

        let secret_binding;
        if let Some(secret) = &self.provider.client_secret {
            secret_binding = secret.clone();
            params.push(("client_secret", &secret_binding));
        }

        tracing::debug!(
            "Exchanging authorization code with token endpoint: {}",
            self.provider.token_endpoint
        );

        let response = self
            .http_client
            .post(self.provider.token_endpoint.as_str())
            .form(&params)
            .send()
            .await
            .map_err(CallbackError::exchange)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CallbackError::ExchangeFailed(exchange_failure_message(
                status.as_u16(),
                &body,
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| CallbackError::exchange(format!("malformed token response: {e}")))?;

        Ok(BearerToken(token_response.access_token))
    }
}

/// Builds the failure message for a non-2xx token endpoint response,
/// extracting the OAuth error code when the body carries one.
fn exchange_failure_message(status: u16, body: &str) -> String {
    if let Ok(oauth_error) = serde_json::from_str::<OAuthErrorResponse>(body) {
        return format!(
            "provider returned {}: {}",
            oauth_error.error,
            oauth_error.error_description.unwrap_or_default()
        );
    }
    format!("HTTP {status} - {body}")
}
