//! In-process session store.

use async_trait::async_trait;
use chrono::Utc;
use gatehouse_core::{Result, SessionId};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{SessionRecord, SessionStore};
use crate::error::SessionStoreError;

/// Session store backed by a map in memory.
///
/// Sessions do not survive a restart. Concurrent saves of the same session
/// are last-write-wins.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if no sessions are stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(
        &self,
        id: &SessionId,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), SessionStoreError> {
        self.records
            .write()
            .await
            .insert(record.id(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionStoreError> {
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, SessionStoreError> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| record.expires_at() > now);
        Ok((before - records.len()) as u64)
    }
}
