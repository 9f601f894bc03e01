//! Session storage trait.
//!
//! The persistent session engine is a collaborator; this module only defines
//! the record handed to it and the interface the callback core calls.
//!
//! # Implementation Notes
//!
//! Implementations should:
//!
//! - Key records by session identifier (writes for distinct users never
//!   conflict)
//! - Treat a non-positive `max_age` as immediately expired: such a record is
//!   saved without error but must never be returned by `get`
//! - Expire and collect records by their own policy; the core never deletes

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::oidc::claims::IdentityClaims;

/// A server-side session record, built fully in memory and saved exactly once.
///
/// Immutable by convention: a new login always produces a new record rather
/// than mutating a fetched one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier, carried to the client in the session cookie.
    pub id: String,

    /// The verified identity claims bound to this session.
    pub claims: IdentityClaims,

    /// Session lifetime in whole seconds, derived from the token expiry.
    /// May be zero or negative when the token was already expired at
    /// issuance time; the store treats that as immediate expiry.
    pub max_age: i64,
}

/// Error type for session storage operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    /// The storage backend failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// A record could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage trait for authenticated sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Looks up a session by identifier.
    ///
    /// Returns `None` for unknown or expired sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails. Callers on the login
    /// path treat a failed lookup as "no prior session" and proceed.
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, SessionStoreError>;

    /// Persists a session record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored. On the login path
    /// this is the one failure surfaced to the client as an explicit error.
    async fn save(&self, record: &SessionRecord) -> Result<(), SessionStoreError>;
}
