//! In-memory session store.

use std::collections::HashMap;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

use outpost_auth::storage::{SessionRecord, SessionStore, SessionStoreError};

struct StoredSession {
    record: SessionRecord,
    expires_at: OffsetDateTime,
}

/// In-memory [`SessionStore`] keyed by session identifier.
///
/// Honors the store contract for non-positive lifetimes: a record saved with
/// `max_age <= 0` is accepted but never returned by `get`.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes expired records. Returns how many were dropped.
    pub async fn cleanup(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, stored| stored.expires_at > now);
        let dropped = before - sessions.len();
        if dropped > 0 {
            tracing::debug!("Dropped {} expired sessions", dropped);
        }
        dropped
    }

    /// Returns the number of records, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).and_then(|stored| {
            if stored.expires_at > OffsetDateTime::now_utc() {
                Some(stored.record.clone())
            } else {
                None
            }
        }))
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), SessionStoreError> {
        let expires_at = OffsetDateTime::now_utc() + Duration::seconds(record.max_age);
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            record.id.clone(),
            StoredSession {
                record: record.clone(),
                expires_at,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outpost_auth::{BearerToken, normalize};
    use serde_json::json;

    fn record(id: &str, max_age: i64) -> SessionRecord {
        let claims = normalize(
            json!({ "sub": "user-123", "exp": 1_700_003_600 }),
            &BearerToken::new("jwt"),
        )
        .unwrap();
        SessionRecord {
            id: id.to_string(),
            claims,
            max_age,
        }
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = MemorySessionStore::new();
        store.save(&record("a", 3600)).await.unwrap();

        let found = store.get("a").await.unwrap().unwrap();
        assert_eq!(found.claims.sub, "user-123");
        assert_eq!(found.max_age, 3600);

        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_positive_ttl_is_immediately_expired() {
        let store = MemorySessionStore::new();
        store.save(&record("zero", 0)).await.unwrap();
        store.save(&record("negative", -100)).await.unwrap();

        assert!(store.get("zero").await.unwrap().is_none());
        assert!(store.get("negative").await.unwrap().is_none());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_cleanup_drops_expired_only() {
        let store = MemorySessionStore::new();
        store.save(&record("live", 3600)).await.unwrap();
        store.save(&record("dead", -1)).await.unwrap();

        assert_eq!(store.cleanup().await, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get("live").await.unwrap().is_some());
    }
}
