use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domains::sessions::entity::Session;
use crate::domains::sessions::identifier::SessionId;
use crate::domains::sessions::ports::SessionLedger;
use crate::errors::WerkError;

/// Volatile ledger backend: a reader/writer-locked map. Concurrent reads are
/// allowed; writes are exclusive of each other and of reads. State dies with
/// the process.
#[derive(Default)]
pub struct InMemoryLedger {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionLedger for InMemoryLedger {
    async fn save(&self, session: &Session) -> Result<(), WerkError> {
        let mut stored = session.clone();
        stored.updated_at = Utc::now();

        let mut sessions = self.sessions.write().await;
        sessions.insert(stored.id.as_str().to_string(), stored);
        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, WerkError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id.as_str()).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Session>, WerkError> {
        let sessions = self.sessions.read().await;
        let mut all: Vec<Session> = sessions.values().cloned().collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        Ok(all)
    }

    async fn exists(&self, id: &SessionId) -> Result<bool, WerkError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.contains_key(id.as_str()))
    }

    async fn delete(&self, id: &SessionId) -> Result<(), WerkError> {
        let mut sessions = self.sessions.write().await;
        match sessions.remove(id.as_str()) {
            Some(_) => Ok(()),
            None => Err(WerkError::SessionNotFound {
                session_id: id.to_string(),
            }),
        }
    }
}
