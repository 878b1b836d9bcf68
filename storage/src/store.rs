//! The message store contract.
//!
//! One trait, two interchangeable implementations: [`crate::PersistentMessageStore`]
//! over SQLite and [`crate::EphemeralMessageStore`] over a process-local map.
//! Each store instance is bound to exactly one client-instance partition.

use async_trait::async_trait;
use tracing::warn;

use crate::error::StoreError;
use crate::models::{MessageId, MessageRecord};

/// Outcome of a [`MessageStore::save_all`] batch. The batch never aborts
/// early; each failed record is reported individually.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Records written successfully.
    pub saved: usize,
    /// Records that were attempted and failed, in input order.
    pub failures: Vec<BatchFailure>,
}

impl BatchResult {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A single failed record within a batch.
#[derive(Debug)]
pub struct BatchFailure {
    pub id: MessageId,
    pub error: StoreError,
}

/// Storage contract for the messages of one client-instance partition.
///
/// Implementations must be thread-safe; both variants expose identical
/// observable behavior, including listing order.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Upserts by `id` within this partition. Last write wins.
    async fn save(&self, record: &MessageRecord) -> Result<(), StoreError>;

    /// Applies [`MessageStore::save`] to each record in input order. Every
    /// record is attempted independently; a failure on one never prevents
    /// attempts on the rest.
    async fn save_all(&self, records: &[MessageRecord]) -> BatchResult {
        let mut result = BatchResult::default();
        for record in records {
            match self.save(record).await {
                Ok(()) => result.saved += 1,
                Err(error) => {
                    warn!(id = record.id, %error, "skipping record in batch");
                    result.failures.push(BatchFailure {
                        id: record.id,
                        error,
                    });
                }
            }
        }
        result
    }

    /// Returns the record if present in this partition. Absent is `Ok(None)`.
    async fn get(&self, id: MessageId) -> Result<Option<MessageRecord>, StoreError>;

    /// Resolves an in-flight send by its correlation id within this
    /// partition. The dataset is small, so a scan over the listing is fine.
    async fn find_by_echo_id(
        &self,
        echo_id: &str,
    ) -> Result<Option<MessageRecord>, StoreError> {
        let records = self.list().await?;
        Ok(records
            .into_iter()
            .find(|r| r.echo_id.as_deref() == Some(echo_id)))
    }

    /// All records of this partition, newest first.
    async fn list(&self) -> Result<Vec<MessageRecord>, StoreError>;

    /// Removes the record if present; no-op when absent.
    async fn delete(&self, id: MessageId) -> Result<(), StoreError>;

    /// Removes every record of this partition. Other partitions are
    /// untouched.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Removes every record across all partitions. Only the global reset
    /// uses this; single-instance disposal never does.
    async fn clear_all(&self) -> Result<(), StoreError>;

    /// Releases in-memory resources held by this store instance. Persisted
    /// data is never deleted here.
    async fn dispose(&self);
}

/// Normalizes listing order for every variant: newest first, ties broken by
/// descending id so the order is deterministic.
pub(crate) fn sort_newest_first(records: &mut [MessageRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
