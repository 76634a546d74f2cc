use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use fluxfolio_types::Session;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("unknown session")]
    Unknown,

    #[error("session expired")]
    Expired,

    #[error("session store error: {0}")]
    Store(String),
}

/// Resolves bearer tokens to users
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, token: &str) -> Result<Option<Session>, SessionError>;

    async fn save_session(&self, session: Session) -> Result<(), SessionError>;

    /// The session behind `token`, rejecting unknown and expired tokens
    async fn authenticate(&self, token: &str) -> Result<Session, SessionError> {
        let session = self
            .get_session(token)
            .await?
            .ok_or(SessionError::Unknown)?;
        if session.is_expired(Utc::now()) {
            return Err(SessionError::Expired);
        }
        Ok(session)
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `user_id` valid for `ttl`
    pub async fn issue(&self, user_id: &str, ttl: Duration) -> Result<Session, SessionError> {
        let session = Session {
            token: uuid::Uuid::new_v4().simple().to_string(),
            user_id: user_id.to_string(),
            expires_at: Utc::now() + ttl,
        };
        self.save_session(session.clone()).await?;
        Ok(session)
    }

    /// Drop every expired session, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let Ok(mut sessions) = self.sessions.write() else {
            return 0;
        };
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        before - sessions.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_session(&self, token: &str) -> Result<Option<Session>, SessionError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SessionError::Store("session lock poisoned".to_string()))?;
        Ok(sessions.get(token).cloned())
    }

    async fn save_session(&self, session: Session) -> Result<(), SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::Store("session lock poisoned".to_string()))?;
        sessions.insert(session.token.clone(), session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issued_session_authenticates() {
        let store = InMemorySessionStore::new();
        let session = store.issue("u1", Duration::hours(1)).await.unwrap();

        let resolved = store.authenticate(&session.token).await.unwrap();
        assert_eq!(resolved.user_id, "u1");
        assert_eq!(
            store.authenticate("missing").await,
            Err(SessionError::Unknown)
        );
    }

    #[tokio::test]
    async fn test_expired_session_rejected_and_purged() {
        let store = InMemorySessionStore::new();
        store
            .save_session(Session {
                token: "old".to_string(),
                user_id: "u1".to_string(),
                expires_at: Utc::now() - Duration::seconds(1),
            })
            .await
            .unwrap();

        assert_eq!(store.authenticate("old").await, Err(SessionError::Expired));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.get_session("old").await.unwrap(), None);
    }
}
