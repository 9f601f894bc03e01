//! Session issuance.
//!
//! Converts verified identity claims into a persisted session whose lifetime
//! is the remaining validity of the identity token. The TTL is propagated
//! as-is even when zero or negative: the provider decided the expiry, and the
//! session store treats a non-positive TTL as immediate expiry.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::CallbackResult;
use crate::error::CallbackError;
use crate::oidc::claims::IdentityClaims;
use crate::storage::{SessionRecord, SessionStore};

/// Issues sessions from verified identity claims.
pub struct SessionIssuer {
    store: Arc<dyn SessionStore>,
}

impl SessionIssuer {
    /// Creates an issuer writing to the given session store.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Builds and persists a session for the given claims.
    ///
    /// The lifetime is `claims.exp - now` in whole seconds.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::SessionPersistFailed`] if the store rejects
    /// the record.
    pub async fn issue(&self, claims: IdentityClaims) -> CallbackResult<SessionRecord> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let max_age = claims.exp - now;

        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            claims,
            max_age,
        };

        self.store
            .save(&record)
            .await
            .map_err(CallbackError::session_persist)?;

        tracing::info!(
            session_id = %record.id,
            sub = %record.claims.sub,
            max_age = record.max_age,
            "Issued session"
        );

        Ok(record)
    }
}
