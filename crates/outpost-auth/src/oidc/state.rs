//! Anti-forgery login state.
//!
//! The authorization request carries an opaque `state` value that the
//! provider echoes back on the callback. The initiating component records
//! each issued value in a [`LoginStateStore`]; the callback claims it exactly
//! once. A missing, unknown, or already-claimed value invalidates the
//! callback before any network call is made.

use async_trait::async_trait;
use time::OffsetDateTime;

/// Context recorded when an authorization redirect is issued.
///
/// Claimed (read-once) by the callback handler to tie the inbound request to
/// a round trip this outpost actually started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginState {
    /// The opaque state value round-tripped through the provider.
    pub state: String,

    /// Where to send the user after login, captured at initiation time.
    pub redirect: Option<String>,

    /// When the authorization redirect was issued.
    pub created_at: OffsetDateTime,
}

impl LoginState {
    /// Creates a login state stamped with the current time.
    #[must_use]
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            redirect: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Sets the post-login redirect target.
    #[must_use]
    pub fn with_redirect(mut self, redirect: impl Into<String>) -> Self {
        self.redirect = Some(redirect.into());
        self
    }
}

/// Storage trait for pending login states.
///
/// State values are single-use: `claim` must atomically remove the entry so
/// that a replayed callback observes absence. Implementations that cannot
/// reach their backend must return `None` rather than an error; an
/// unverifiable state is treated exactly like an unknown one (fail closed).
#[async_trait]
pub trait LoginStateStore: Send + Sync {
    /// Records a freshly issued state. Called by the initiating component.
    async fn insert(&self, login: LoginState);

    /// Claims a state value, removing it from the store.
    ///
    /// Returns `None` if the value is unknown, expired, or already claimed.
    async fn claim(&self, state: &str) -> Option<LoginState>;
}
