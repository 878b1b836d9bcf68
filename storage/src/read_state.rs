//! Per-instance read state.
//!
//! Tracks which message ids the end-user has seen. Membership only grows
//! until an explicit clear. Marking is a best-effort UX annotation: a
//! failed mark is logged and swallowed, never surfaced. The clear paths
//! participate in data removal and do propagate errors.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::StoreError;
use crate::keyed_store::InstanceKeyedStore;
use crate::models::{ClientInstanceKey, MessageId};

/// Read-state contract, shared by every client instance; operations are
/// scoped by the instance key passed in.
#[async_trait]
pub trait ReadStateTracker: Send + Sync {
    /// Adds `id` to the instance's read set. Idempotent; failures are
    /// logged, not returned.
    async fn mark_read(&self, instance: &ClientInstanceKey, id: MessageId);

    async fn is_read(
        &self,
        instance: &ClientInstanceKey,
        id: MessageId,
    ) -> Result<bool, StoreError>;

    /// The instance's read set. Unknown instances have an empty set.
    async fn read_ids(
        &self,
        instance: &ClientInstanceKey,
    ) -> Result<BTreeSet<MessageId>, StoreError>;

    /// Drops the read set of this instance only.
    async fn clear(&self, instance: &ClientInstanceKey) -> Result<(), StoreError>;

    /// Drops every instance's read set.
    async fn clear_all(&self) -> Result<(), StoreError>;
}

/// Process-lifetime tracker backed by a locked map of sets.
#[derive(Debug, Default)]
pub struct EphemeralReadStateTracker {
    sets: RwLock<HashMap<ClientInstanceKey, BTreeSet<MessageId>>>,
}

impl EphemeralReadStateTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadStateTracker for EphemeralReadStateTracker {
    async fn mark_read(&self, instance: &ClientInstanceKey, id: MessageId) {
        self.sets
            .write()
            .await
            .entry(instance.clone())
            .or_default()
            .insert(id);
    }

    async fn is_read(
        &self,
        instance: &ClientInstanceKey,
        id: MessageId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .sets
            .read()
            .await
            .get(instance)
            .is_some_and(|set| set.contains(&id)))
    }

    async fn read_ids(
        &self,
        instance: &ClientInstanceKey,
    ) -> Result<BTreeSet<MessageId>, StoreError> {
        Ok(self
            .sets
            .read()
            .await
            .get(instance)
            .cloned()
            .unwrap_or_default())
    }

    async fn clear(&self, instance: &ClientInstanceKey) -> Result<(), StoreError> {
        self.sets.write().await.remove(instance);
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        self.sets.write().await.clear();
        Ok(())
    }
}

/// Durable tracker delegating to the read-marks area of the shared keyed
/// store. Marks are additive rows, so concurrent writers cannot lose each
/// other's updates.
#[derive(Clone)]
pub struct PersistentReadStateTracker {
    keyed: Arc<InstanceKeyedStore>,
}

impl PersistentReadStateTracker {
    pub fn new(keyed: Arc<InstanceKeyedStore>) -> Self {
        Self { keyed }
    }
}

#[async_trait]
impl ReadStateTracker for PersistentReadStateTracker {
    async fn mark_read(&self, instance: &ClientInstanceKey, id: MessageId) {
        if let Err(error) = self.keyed.mark_read(instance, id).await {
            warn!(instance = %instance, id, %error, "failed to persist read mark");
        }
    }

    async fn is_read(
        &self,
        instance: &ClientInstanceKey,
        id: MessageId,
    ) -> Result<bool, StoreError> {
        self.keyed.is_read(instance, id).await
    }

    async fn read_ids(
        &self,
        instance: &ClientInstanceKey,
    ) -> Result<BTreeSet<MessageId>, StoreError> {
        self.keyed.read_ids(instance).await
    }

    async fn clear(&self, instance: &ClientInstanceKey) -> Result<(), StoreError> {
        self.keyed.clear_read_marks(instance).await
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        self.keyed.clear_all_read_marks().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(inbox: &str) -> ClientInstanceKey {
        ClientInstanceKey::derive("https://chat.example.com", Some("u-1"), inbox)
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let tracker = EphemeralReadStateTracker::new();
        let instance = key("inbox-1");

        tracker.mark_read(&instance, 4).await;
        tracker.mark_read(&instance, 4).await;

        let ids = tracker.read_ids(&instance).await.unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![4]);
    }

    #[tokio::test]
    async fn read_sets_are_isolated_per_instance() {
        let tracker = EphemeralReadStateTracker::new();
        let a = key("inbox-a");
        let b = key("inbox-b");

        tracker.mark_read(&a, 1).await;
        tracker.mark_read(&b, 2).await;

        assert!(tracker.is_read(&a, 1).await.unwrap());
        assert!(!tracker.is_read(&a, 2).await.unwrap());
        assert!(tracker.is_read(&b, 2).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_instance_has_empty_read_set() {
        let tracker = EphemeralReadStateTracker::new();
        assert!(tracker.read_ids(&key("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_drops_one_instance_only() {
        let tracker = EphemeralReadStateTracker::new();
        let a = key("inbox-a");
        let b = key("inbox-b");
        tracker.mark_read(&a, 1).await;
        tracker.mark_read(&b, 2).await;

        tracker.clear(&a).await.unwrap();

        assert!(tracker.read_ids(&a).await.unwrap().is_empty());
        assert!(tracker.is_read(&b, 2).await.unwrap());
    }

    #[tokio::test]
    async fn clear_all_drops_every_instance() {
        let tracker = EphemeralReadStateTracker::new();
        tracker.mark_read(&key("inbox-a"), 1).await;
        tracker.mark_read(&key("inbox-b"), 2).await;

        tracker.clear_all().await.unwrap();

        assert!(tracker.read_ids(&key("inbox-a")).await.unwrap().is_empty());
        assert!(tracker.read_ids(&key("inbox-b")).await.unwrap().is_empty());
    }
}
