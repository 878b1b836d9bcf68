//! Instance-keyed SQLite surface.
//!
//! One database, opened once per process and shared read-write by every
//! partition. Three keyed areas:
//!
//! 1. `records` – record key → JSON-encoded [`MessageRecord`]. The value is
//!    opaque to the engine, so the keyspace is flat.
//! 2. `record_owners` – record key → owning instance key. This secondary
//!    index is what scopes operations on the flat keyspace: every
//!    partition-scoped read or clear first resolves its candidate key set
//!    here, then applies the primary operation to exactly that set.
//! 3. `read_marks` – one row per `(instance_key, message_id)` read fact.
//!
//! Record keys are the composite `"{instance_key}::{id}"`; backend ids are
//! unique only within an instance, so the bare id cannot key the flat
//! keyspace. Record and index writes share a transaction so the two areas
//! cannot diverge.

use std::collections::BTreeSet;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::StoreError;
use crate::models::{ClientInstanceKey, MessageId, MessageRecord};

/// Shared persistent surface behind every [`crate::PersistentMessageStore`]
/// and [`crate::PersistentReadStateTracker`].
#[derive(Clone)]
pub struct InstanceKeyedStore {
    pool: SqlitePool,
}

impl InstanceKeyedStore {
    /// Opens (creating if missing) the database named by the config and
    /// prepares the schema. Failures here are fatal for persistence and
    /// propagate to the caller.
    pub async fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        if let Some(parent) = std::path::Path::new(&config.database_url).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .filename(&config.database_url);

        let pool = SqlitePool::connect_with(options).await?;
        let store = Self { pool };
        store.init_schema().await?;

        info!(database = %config.database_url, "opened instance-keyed store");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS records (
                record_key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS record_owners (
                record_key TEXT PRIMARY KEY,
                instance_key TEXT NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_record_owners_instance
                ON record_owners(instance_key)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS read_marks (
                instance_key TEXT NOT NULL,
                message_id INTEGER NOT NULL,
                PRIMARY KEY (instance_key, message_id)
            )
            "#,
        ];
        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn record_key(instance: &ClientInstanceKey, id: MessageId) -> String {
        format!("{}::{}", instance.as_str(), id)
    }

    /// Upserts a record and its owner entry in one transaction.
    pub async fn put(
        &self,
        instance: &ClientInstanceKey,
        record: &MessageRecord,
    ) -> Result<(), StoreError> {
        let key = Self::record_key(instance, record.id);
        let value = serde_json::to_string(record)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT OR REPLACE INTO records (record_key, value) VALUES (?, ?)")
            .bind(&key)
            .bind(&value)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT OR REPLACE INTO record_owners (record_key, instance_key) VALUES (?, ?)",
        )
        .bind(&key)
        .bind(instance.as_str())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(instance = %instance, id = record.id, "stored message record");
        Ok(())
    }

    pub async fn get(
        &self,
        instance: &ClientInstanceKey,
        id: MessageId,
    ) -> Result<Option<MessageRecord>, StoreError> {
        let key = Self::record_key(instance, id);
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM records WHERE record_key = ?")
                .bind(&key)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some((value,)) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    /// Record keys owned by the given instance, resolved from the secondary
    /// index.
    async fn keys_for_instance(
        &self,
        instance: &ClientInstanceKey,
    ) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT record_key FROM record_owners WHERE instance_key = ?")
                .bind(instance.as_str())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    /// All records of one partition, in no particular order. Resolves the
    /// candidate key set from the index first, then fetches those keys only.
    pub async fn list_for_instance(
        &self,
        instance: &ClientInstanceKey,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let keys = self.keys_for_instance(instance).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!("SELECT value FROM records WHERE record_key IN ({placeholders})");
        let mut query = sqlx::query_as::<_, (String,)>(&sql);
        for key in &keys {
            query = query.bind(key);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for (value,) in rows {
            records.push(serde_json::from_str(&value)?);
        }
        Ok(records)
    }

    pub async fn delete(
        &self,
        instance: &ClientInstanceKey,
        id: MessageId,
    ) -> Result<(), StoreError> {
        let key = Self::record_key(instance, id);
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM records WHERE record_key = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM record_owners WHERE record_key = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Removes every record of one partition: candidate keys come from the
    /// index, then both areas drop exactly those keys.
    pub async fn clear_instance(&self, instance: &ClientInstanceKey) -> Result<(), StoreError> {
        let keys = self.keys_for_instance(instance).await?;

        let mut tx = self.pool.begin().await?;
        if !keys.is_empty() {
            let placeholders = vec!["?"; keys.len()].join(", ");
            let sql = format!("DELETE FROM records WHERE record_key IN ({placeholders})");
            let mut query = sqlx::query(&sql);
            for key in &keys {
                query = query.bind(key);
            }
            query.execute(&mut *tx).await?;
        }
        sqlx::query("DELETE FROM record_owners WHERE instance_key = ?")
            .bind(instance.as_str())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(instance = %instance, removed = keys.len(), "cleared message partition");
        Ok(())
    }

    /// Removes every record of every partition. Global reset only.
    pub async fn clear_all_records(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM records").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM record_owners")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!("cleared all message partitions");
        Ok(())
    }

    /// Records one read fact. Re-marking an already-read id changes nothing,
    /// so the operation is idempotent and safe under concurrent writers.
    pub async fn mark_read(
        &self,
        instance: &ClientInstanceKey,
        id: MessageId,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO read_marks (instance_key, message_id) VALUES (?, ?)")
            .bind(instance.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn is_read(
        &self,
        instance: &ClientInstanceKey,
        id: MessageId,
    ) -> Result<bool, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM read_marks WHERE instance_key = ? AND message_id = ?",
        )
        .bind(instance.as_str())
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn read_ids(
        &self,
        instance: &ClientInstanceKey,
    ) -> Result<BTreeSet<MessageId>, StoreError> {
        let rows: Vec<(MessageId,)> =
            sqlx::query_as("SELECT message_id FROM read_marks WHERE instance_key = ?")
                .bind(instance.as_str())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn clear_read_marks(&self, instance: &ClientInstanceKey) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM read_marks WHERE instance_key = ?")
            .bind(instance.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn clear_all_read_marks(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM read_marks")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
