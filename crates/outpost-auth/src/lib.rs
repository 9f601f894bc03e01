//! # outpost-auth
//!
//! OIDC authorization-code callback core for a reverse-proxy authentication
//! outpost: the component that sits in front of a protected application and
//! establishes a session on behalf of an external identity provider.
//!
//! The crate covers the callback state machine — validating the anti-forgery
//! login state, exchanging the authorization code, verifying the provider's
//! token, normalizing claims, and issuing a session whose lifetime derives
//! from the token's own expiry. The HTTP listener, the proxy's request
//! forwarding, and the persistent session engine are collaborators.
//!
//! ## Modules
//!
//! - [`config`] - Provider, cookie, and callback configuration
//! - [`error`] - The callback error taxonomy
//! - [`oidc`] - Relying-party machinery (state, exchange, verify, claims)
//! - [`sessions`] - Session issuance
//! - [`storage`] - Session storage traits
//! - [`http`] - Axum handlers

pub mod config;
pub mod error;
pub mod http;
pub mod oidc;
pub mod sessions;
pub mod storage;

pub use config::{CallbackConfig, CookieConfig, ProviderConfig};
pub use error::CallbackError;
pub use http::{CallbackParams, CallbackState, callback_handler};
pub use oidc::claims::{IdentityClaims, ProxyClaims, RawClaims, normalize};
pub use oidc::discovery::{DiscoveryError, ProviderMetadata};
pub use oidc::exchange::{BearerToken, CodeExchanger, TokenResponse};
pub use oidc::jwks::{JwksCache, JwksCacheConfig, JwksError};
pub use oidc::state::{LoginState, LoginStateStore};
pub use oidc::verify::TokenVerifier;
pub use sessions::SessionIssuer;
pub use storage::{SessionRecord, SessionStore, SessionStoreError};

/// Type alias for callback-flow results.
pub type CallbackResult<T> = Result<T, CallbackError>;
