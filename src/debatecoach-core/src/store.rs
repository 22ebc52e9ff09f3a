//! Session storage.
//!
//! The orchestrator only talks to [`SessionStore`], so an external key-value
//! store can replace the in-memory map without touching round logic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::DebateError;
use crate::session::Session;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a new session.
    async fn insert(&self, session: Session) -> Result<(), DebateError>;

    /// Fetch a copy of a session.
    async fn get(&self, id: &str) -> Result<Option<Session>, DebateError>;

    /// Replace an existing session. Fails if the id is unknown.
    async fn update(&self, session: Session) -> Result<(), DebateError>;

    /// Drop sessions not modified since `cutoff`. Returns how many were removed.
    async fn expire(&self, cutoff: DateTime<Utc>) -> Result<usize, DebateError>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Process-lifetime session map.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: Session) -> Result<(), DebateError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(DebateError::Validation(format!(
                "Session {} already exists",
                session.id
            )));
        }
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, DebateError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn update(&self, session: Session) -> Result<(), DebateError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session.id) {
            Some(existing) => {
                *existing = session;
                Ok(())
            }
            None => Err(DebateError::SessionNotFound(session.id)),
        }
    }

    async fn expire(&self, cutoff: DateTime<Utc>) -> Result<usize, DebateError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.updated_at >= cutoff);
        Ok(before - sessions.len())
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Side;
    use chrono::Duration;

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemorySessionStore::new();
        let session = Session::new("Topic", "Topic.", Side::Pro);
        let id = session.id.clone();
        store.insert(session).await.unwrap();

        let fetched = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert!(store.get("missing").await.unwrap().is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let store = InMemorySessionStore::new();
        let err = store
            .update(Session::new("Topic", "Topic.", Side::Con))
            .await
            .unwrap_err();
        assert!(matches!(err, DebateError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_replaces() {
        let store = InMemorySessionStore::new();
        let mut session = Session::new("Topic", "Topic.", Side::Pro);
        store.insert(session.clone()).await.unwrap();

        session.advance_round();
        store.update(session.clone()).await.unwrap();
        let fetched = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_round, 2);
    }

    #[tokio::test]
    async fn test_expire_removes_idle_sessions() {
        let store = InMemorySessionStore::new();
        let mut stale = Session::new("Old", "Old.", Side::Pro);
        stale.updated_at = Utc::now() - Duration::hours(2);
        let fresh = Session::new("New", "New.", Side::Con);
        let fresh_id = fresh.id.clone();
        store.insert(stale).await.unwrap();
        store.insert(fresh).await.unwrap();

        let removed = store
            .expire(Utc::now() - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get(&fresh_id).await.unwrap().is_some());
    }
}
