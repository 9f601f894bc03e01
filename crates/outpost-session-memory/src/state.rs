//! In-memory login-state store.

use std::collections::HashMap;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

use outpost_auth::oidc::state::{LoginState, LoginStateStore};

/// Default lifetime of an unclaimed login state.
pub const DEFAULT_STATE_TTL: Duration = Duration::minutes(10);

/// In-memory [`LoginStateStore`] with read-once claims.
///
/// Unclaimed states expire after a TTL; the authorization round trip is
/// short-lived by provider contract, so a stale state is as invalid as an
/// unknown one.
pub struct MemoryLoginStateStore {
    states: RwLock<HashMap<String, LoginState>>,
    ttl: Duration,
}

impl Default for MemoryLoginStateStore {
    fn default() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            ttl: DEFAULT_STATE_TTL,
        }
    }
}

impl MemoryLoginStateStore {
    /// Creates a store with the default TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with a custom TTL for unclaimed states.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

#[async_trait]
impl LoginStateStore for MemoryLoginStateStore {
    async fn insert(&self, login: LoginState) {
        let mut states = self.states.write().await;
        states.insert(login.state.clone(), login);
    }

    async fn claim(&self, state: &str) -> Option<LoginState> {
        let mut states = self.states.write().await;
        let login = states.remove(state)?;
        if login.created_at + self.ttl <= OffsetDateTime::now_utc() {
            tracing::debug!("login state expired before it was claimed");
            return None;
        }
        Some(login)
    }
}
