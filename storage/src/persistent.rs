//! SQLite-backed message store.
//!
//! Binds one client-instance key to the shared [`InstanceKeyedStore`];
//! every operation delegates with that key, so the partition boundary is
//! fixed at construction.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreError;
use crate::keyed_store::InstanceKeyedStore;
use crate::models::{ClientInstanceKey, MessageId, MessageRecord};
use crate::store::{sort_newest_first, MessageStore};

/// Durable message store for one client-instance partition.
#[derive(Clone)]
pub struct PersistentMessageStore {
    keyed: Arc<InstanceKeyedStore>,
    instance: ClientInstanceKey,
}

impl PersistentMessageStore {
    pub fn new(keyed: Arc<InstanceKeyedStore>, instance: ClientInstanceKey) -> Self {
        Self { keyed, instance }
    }

    pub fn instance(&self) -> &ClientInstanceKey {
        &self.instance
    }
}

#[async_trait]
impl MessageStore for PersistentMessageStore {
    async fn save(&self, record: &MessageRecord) -> Result<(), StoreError> {
        record.validate()?;
        self.keyed.put(&self.instance, record).await
    }

    async fn get(&self, id: MessageId) -> Result<Option<MessageRecord>, StoreError> {
        self.keyed.get(&self.instance, id).await
    }

    async fn list(&self) -> Result<Vec<MessageRecord>, StoreError> {
        let mut records = self.keyed.list_for_instance(&self.instance).await?;
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn delete(&self, id: MessageId) -> Result<(), StoreError> {
        self.keyed.delete(&self.instance, id).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.keyed.clear_instance(&self.instance).await
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        self.keyed.clear_all_records().await
    }

    async fn dispose(&self) {
        // Only the handle goes away; the shared database keeps its data for
        // the next launch.
        debug!(instance = %self.instance, "disposed persistent store handle");
    }
}
