//! In-memory session store
//!
//! Sessions live only as long as the process; nothing is written to disk.

use crate::runtime::{SessionMutation, SessionStore};
use crate::state_machine::Session;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

/// Process-wide session table
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
    async fn get(&self, conv_id: &str) -> Option<Session> {
        self.sessions.read().await.get(conv_id).cloned()
    }

    async fn create(&self, conv_id: &str) -> Session {
        let session = Session::new(conv_id);
        let replaced = self
            .sessions
            .write()
            .await
            .insert(conv_id.to_string(), session.clone());
        if replaced.is_some() {
            tracing::debug!(conv_id = %conv_id, "Replaced existing session");
        }
        session
    }

    async fn update(&self, conv_id: &str, mutation: SessionMutation) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(conv_id)
            .ok_or_else(|| StoreError::SessionNotFound(conv_id.to_string()))?;
        mutation(session);
        session.last_active_at = Utc::now();
        Ok(session.clone())
    }

    async fn delete(&self, conv_id: &str) -> bool {
        self.sessions.write().await.remove(conv_id).is_some()
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
