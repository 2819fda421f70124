//! In-process session store.

use super::{SessionStore, StoreError};
use crate::session::{GameSession, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Sessions held in a map for the life of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sessions: Arc<RwLock<HashMap<SessionId, GameSession>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemoryStore {
    #[instrument(skip(self))]
    async fn load_session(&self, id: &str) -> Result<Option<GameSession>, StoreError> {
        let session = self.sessions.read().await.get(id).cloned();
        if session.is_none() {
            debug!(session_id = id, "Session not found");
        }
        Ok(session)
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn save_session(&self, session: &GameSession) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        debug!("Session saved");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_sessions(&self) -> Result<Vec<GameSession>, StoreError> {
        let mut sessions: Vec<_> = self.sessions.read().await.values().cloned().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(count = sessions.len(), "Listed sessions");
        Ok(sessions)
    }
}
