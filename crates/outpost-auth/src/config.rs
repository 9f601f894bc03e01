//! Configuration for the callback core.
//!
//! Configuration *loading* is a collaborator concern; these types are plain
//! value objects constructed by the embedding outpost, with builder methods
//! for the optional knobs.

use std::time::Duration;

use cookie::SameSite;
use url::Url;

use crate::oidc::discovery::ProviderMetadata;
use crate::oidc::jwks::JwksCacheConfig;

/// Identity provider configuration for the relying-party side of the flow.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// The provider's issuer identifier (matched against the token `iss`).
    pub issuer: String,

    /// OAuth client identifier (matched against the token `aud`).
    pub client_id: String,

    /// Client secret for confidential clients.
    pub client_secret: Option<String>,

    /// The callback URL registered with the provider.
    pub redirect_uri: Url,

    /// Scopes requested at initiation time.
    pub scopes: Vec<String>,

    /// The provider's token endpoint.
    pub token_endpoint: Url,

    /// The provider's JWKS endpoint.
    pub jwks_uri: Url,
}

impl ProviderConfig {
    /// Creates a provider configuration with explicit endpoints.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: Url,
        token_endpoint: Url,
        jwks_uri: Url,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri,
            scopes: vec!["openid".to_string(), "profile".to_string(), "email".to_string()],
            token_endpoint,
            jwks_uri,
        }
    }

    /// Completes a provider configuration from a discovery document.
    ///
    /// # Errors
    ///
    /// Returns an error if the discovered endpoints are not valid URLs.
    pub fn from_metadata(
        metadata: &ProviderMetadata,
        client_id: impl Into<String>,
        redirect_uri: Url,
    ) -> Result<Self, url::ParseError> {
        Ok(Self::new(
            metadata.issuer.clone(),
            client_id,
            redirect_uri,
            Url::parse(&metadata.token_endpoint)?,
            Url::parse(&metadata.jwks_uri)?,
        ))
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }
}

/// Session cookie settings.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Cookie name carrying the session identifier.
    pub name: String,

    /// Cookie path.
    pub path: String,

    /// Whether the cookie requires HTTPS.
    pub secure: bool,

    /// SameSite attribute. `Lax` by default: the callback redirect is a
    /// cross-site navigation, which `Strict` would drop.
    pub same_site: SameSite,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "outpost_session".to_string(),
            path: "/".to_string(),
            secure: true,
            same_site: SameSite::Lax,
        }
    }
}

impl CookieConfig {
    /// Sets the cookie name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the cookie path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets whether the cookie requires HTTPS.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the SameSite attribute.
    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }
}

/// Configuration for the callback endpoint.
#[derive(Debug, Clone)]
pub struct CallbackConfig {
    /// Identity provider settings.
    pub provider: ProviderConfig,

    /// Session cookie settings.
    pub cookie: CookieConfig,

    /// Post-login redirect target used when the login state carries none.
    pub default_redirect: String,

    /// Clock skew tolerance for token validation (default: 60 seconds).
    pub clock_skew_tolerance: Duration,

    /// Outbound HTTP request timeout (default: 30 seconds).
    pub request_timeout: Duration,

    /// Signing-key cache settings.
    pub jwks: JwksCacheConfig,
}

impl CallbackConfig {
    /// Creates a callback configuration with default cookie and timing knobs.
    #[must_use]
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            cookie: CookieConfig::default(),
            default_redirect: "/".to_string(),
            clock_skew_tolerance: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
            jwks: JwksCacheConfig::default(),
        }
    }

    /// Sets the session cookie settings.
    #[must_use]
    pub fn with_cookie(mut self, cookie: CookieConfig) -> Self {
        self.cookie = cookie;
        self
    }

    /// Sets the default post-login redirect target.
    #[must_use]
    pub fn with_default_redirect(mut self, target: impl Into<String>) -> Self {
        self.default_redirect = target.into();
        self
    }

    /// Sets the clock skew tolerance for token validation.
    #[must_use]
    pub fn with_clock_skew_tolerance(mut self, tolerance: Duration) -> Self {
        self.clock_skew_tolerance = tolerance;
        self
    }

    /// Sets the outbound HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the signing-key cache settings.
    #[must_use]
    pub fn with_jwks(mut self, jwks: JwksCacheConfig) -> Self {
        self.jwks = jwks;
        self
    }
}
