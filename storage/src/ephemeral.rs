//! In-memory message store.
//!
//! Used when persistence is disabled: data lives for the process lifetime
//! only. One store instance holds exactly one partition, so the registry
//! gives every client instance its own map and cross-partition isolation
//! falls out of ownership.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::models::{MessageId, MessageRecord};
use crate::store::{sort_newest_first, MessageStore};

/// Process-lifetime message store backed by a locked map.
#[derive(Debug, Clone, Default)]
pub struct EphemeralMessageStore {
    records: Arc<RwLock<HashMap<MessageId, MessageRecord>>>,
}

impl EphemeralMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MessageStore for EphemeralMessageStore {
    async fn save(&self, record: &MessageRecord) -> Result<(), StoreError> {
        record.validate()?;
        self.records.write().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, id: MessageId) -> Result<Option<MessageRecord>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<MessageRecord>, StoreError> {
        // The map's iteration order is arbitrary; normalize to the shared
        // newest-first contract.
        let mut records: Vec<MessageRecord> =
            self.records.read().await.values().cloned().collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn delete(&self, id: MessageId) -> Result<(), StoreError> {
        self.records.write().await.remove(&id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        // A store instance holds a single partition; the registry fans the
        // global reset out across every live bundle.
        self.clear().await
    }

    async fn dispose(&self) {
        self.records.write().await.clear();
        debug!("disposed ephemeral message store");
    }
}
