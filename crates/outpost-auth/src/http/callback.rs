//! OAuth callback endpoint handler.
//!
//! This is the orchestrator for the whole callback sequence:
//!
//! ```text
//! GET <callback>?code=..&state=..
//!     └─► claim login state ── absent ──► redirect, no session
//!         └─► exchange code ── failure ──► redirect, no session
//!             └─► verify token ── failure ──► redirect, no session
//!                 └─► normalize claims ── failure ──► redirect, no session
//!                     └─► issue session ── failure ──► 400, no redirect
//!                         └─► redirect with session cookie
//! ```
//!
//! Soft failures degrade to a plain redirect so a forged or replayed callback
//! learns nothing and a confused user simply lands back at the login start.
//! Only session persistence failure is surfaced as an explicit error: at that
//! point the identity is verified, and hiding an operational problem behind a
//! redirect would strand the user with no feedback.
//!
//! The handler future is dropped when the client disconnects; every awaited
//! step (provider round trips, store writes) is cancelled with it, so no
//! session is persisted for a caller that is gone.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use cookie::Cookie;
use serde::Deserialize;

use crate::CallbackResult;
use crate::config::{CallbackConfig, CookieConfig};
use crate::oidc::claims::{IdentityClaims, normalize};
use crate::oidc::exchange::CodeExchanger;
use crate::oidc::jwks::JwksCache;
use crate::oidc::state::LoginStateStore;
use crate::oidc::verify::TokenVerifier;
use crate::sessions::SessionIssuer;
use crate::storage::{SessionRecord, SessionStore};

/// State required for the callback endpoint.
#[derive(Clone)]
pub struct CallbackState {
    /// Pending login states issued at initiation time.
    pub state_store: Arc<dyn LoginStateStore>,
    /// Token exchange service.
    pub exchanger: Arc<CodeExchanger>,
    /// Bearer token verifier.
    pub verifier: Arc<TokenVerifier>,
    /// Session issuance service.
    pub sessions: Arc<SessionIssuer>,
    /// Session storage, for the stale-cookie lookup.
    pub session_store: Arc<dyn SessionStore>,
    /// Session cookie settings.
    pub cookie: CookieConfig,
    /// Redirect target used when the login state carries none.
    pub default_redirect: String,
}

impl CallbackState {
    /// Creates the callback state.
    #[must_use]
    pub fn new(
        state_store: Arc<dyn LoginStateStore>,
        exchanger: Arc<CodeExchanger>,
        verifier: Arc<TokenVerifier>,
        session_store: Arc<dyn SessionStore>,
        cookie: CookieConfig,
        default_redirect: impl Into<String>,
    ) -> Self {
        Self {
            state_store,
            exchanger,
            verifier,
            sessions: Arc::new(SessionIssuer::new(session_store.clone())),
            session_store,
            cookie,
            default_redirect: default_redirect.into(),
        }
    }

    /// Builds the callback state from a [`CallbackConfig`].
    ///
    /// Constructs the outbound HTTP client with the configured request
    /// timeout and shares it between the exchanger and the key cache; the
    /// verifier picks up the configured clock skew tolerance.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the HTTP client cannot be built.
    pub fn from_config(
        config: CallbackConfig,
        state_store: Arc<dyn LoginStateStore>,
        session_store: Arc<dyn SessionStore>,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let exchanger = Arc::new(CodeExchanger::new(
            http_client.clone(),
            config.provider.clone(),
        ));
        let jwks = Arc::new(JwksCache::new(http_client, config.jwks));
        let verifier = Arc::new(TokenVerifier::new(
            jwks,
            &config.provider,
            config.clock_skew_tolerance,
        ));

        Ok(Self::new(
            state_store,
            exchanger,
            verifier,
            session_store,
            config.cookie,
            config.default_redirect,
        ))
    }
}

/// Callback query parameters. Provider-specific extras are ignored.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    /// The authorization code.
    #[serde(default)]
    pub code: Option<String>,

    /// The anti-forgery state value.
    #[serde(default)]
    pub state: Option<String>,
}

/// Handles `GET <callback-path>?code=..&state=..`.
pub async fn callback_handler(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Response {
    let login = match params.state.as_deref() {
        Some(value) if !value.is_empty() => state.state_store.claim(value).await,
        _ => None,
    };

    let Some(login) = login else {
        tracing::warn!("invalid state on callback");
        return Redirect::to(&state.default_redirect).into_response();
    };

    let target = login
        .redirect
        .unwrap_or_else(|| state.default_redirect.clone());

    let code = params.code.unwrap_or_default();
    let claims = match redeem(&state, &code).await {
        Ok(claims) => claims,
        // redeem only fails soft; none of its steps persist anything.
        Err(err) => {
            tracing::warn!(error = %err, "failed to redeem authorization code");
            return Redirect::to(&target).into_response();
        }
    };

    // A stale cookie may reference a prior session. Failing to fetch it is
    // non-fatal by policy: the flow always builds a fresh session.
    if let Some(prior) = jar.get(&state.cookie.name)
        && let Err(err) = state.session_store.get(prior.value()).await
    {
        tracing::debug!(error = %err, "failed to fetch prior session");
    }

    let record = match state.sessions.issue(claims).await {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!(error = %err, "failed to persist session");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let cookie = session_cookie(&state.cookie, &record);
    (jar.add(cookie), Redirect::to(&target)).into_response()
}

/// Runs the network half of the flow: exchange, verify, normalize.
///
/// Every failure here is soft; the caller converts it into a redirect.
async fn redeem(state: &CallbackState, code: &str) -> CallbackResult<IdentityClaims> {
    let bearer = state.exchanger.exchange(code).await?;
    let payload = state.verifier.verify(&bearer).await?;
    normalize(payload, &bearer)
}

/// Builds the session cookie for an issued record.
fn session_cookie(config: &CookieConfig, record: &SessionRecord) -> Cookie<'static> {
    Cookie::build((config.name.clone(), record.id.clone()))
        .http_only(true)
        .secure(config.secure)
        .same_site(config.same_site)
        .path(config.path.clone())
        .max_age(time::Duration::seconds(record.max_age))
        .build()
}
