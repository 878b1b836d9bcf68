//! Process-wide instance registry.
//!
//! Maps each client-instance key to its bundle of stores. The registry is
//! the sole owner of bundles: creation happens on first `resolve`, and the
//! map lookup and insert happen under one write-lock acquisition, so
//! concurrent first access for the same key still yields exactly one
//! bundle.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::ephemeral::EphemeralMessageStore;
use crate::error::StoreError;
use crate::keyed_store::InstanceKeyedStore;
use crate::models::{ClientInstanceKey, MessageId};
use crate::persistent::PersistentMessageStore;
use crate::read_state::{
    EphemeralReadStateTracker, PersistentReadStateTracker, ReadStateTracker,
};
use crate::store::MessageStore;

/// The isolated store set of one client instance.
pub struct InstanceBundle {
    instance: ClientInstanceKey,
    messages: Arc<dyn MessageStore>,
    read_state: Arc<dyn ReadStateTracker>,
}

impl InstanceBundle {
    fn new(
        instance: ClientInstanceKey,
        messages: Arc<dyn MessageStore>,
        read_state: Arc<dyn ReadStateTracker>,
    ) -> Self {
        Self {
            instance,
            messages,
            read_state,
        }
    }

    pub fn instance(&self) -> &ClientInstanceKey {
        &self.instance
    }

    pub fn messages(&self) -> &Arc<dyn MessageStore> {
        &self.messages
    }

    pub fn read_state(&self) -> &Arc<dyn ReadStateTracker> {
        &self.read_state
    }

    /// Marks each id read, best-effort per id.
    pub async fn mark_messages_read(&self, ids: &[MessageId]) {
        for id in ids {
            self.read_state.mark_read(&self.instance, *id).await;
        }
    }

    /// Count of incoming messages not yet marked read, computed fresh from
    /// the listing and the read set every time. The value is advisory
    /// display data, so any failure degrades to zero instead of
    /// propagating.
    pub async fn unread_count(&self) -> usize {
        let records = match self.messages.list().await {
            Ok(records) => records,
            Err(error) => {
                warn!(instance = %self.instance, %error, "unread count fell back to zero");
                return 0;
            }
        };
        let read = match self.read_state.read_ids(&self.instance).await {
            Ok(read) => read,
            Err(error) => {
                warn!(instance = %self.instance, %error, "unread count fell back to zero");
                return 0;
            }
        };
        records
            .iter()
            .filter(|m| !m.is_mine && !read.contains(&m.id))
            .count()
    }
}

/// Owns every live [`InstanceBundle`], keyed by client-instance key.
pub struct InstanceRegistry {
    bundles: RwLock<HashMap<ClientInstanceKey, Arc<InstanceBundle>>>,
    keyed: Option<Arc<InstanceKeyedStore>>,
    read_state: Arc<dyn ReadStateTracker>,
}

impl InstanceRegistry {
    /// Opens the registry in the mode the config selects. With persistence
    /// enabled this opens the shared SQLite areas once; bundles created
    /// later share that handle and never perform I/O at construction.
    pub async fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        if config.enable_persistence {
            let keyed = Arc::new(InstanceKeyedStore::open(config).await?);
            let read_state: Arc<dyn ReadStateTracker> =
                Arc::new(PersistentReadStateTracker::new(keyed.clone()));
            Ok(Self {
                bundles: RwLock::new(HashMap::new()),
                keyed: Some(keyed),
                read_state,
            })
        } else {
            info!("persistence disabled; stores are in-memory for this process");
            Ok(Self {
                bundles: RwLock::new(HashMap::new()),
                keyed: None,
                read_state: Arc::new(EphemeralReadStateTracker::new()),
            })
        }
    }

    /// Returns the bundle for this key, creating and registering it on
    /// first access. Lookup and insert run under one write lock, so at most
    /// one bundle ever exists per key.
    pub async fn resolve(&self, instance: &ClientInstanceKey) -> Arc<InstanceBundle> {
        let mut bundles = self.bundles.write().await;
        if let Some(bundle) = bundles.get(instance) {
            return bundle.clone();
        }

        let messages: Arc<dyn MessageStore> = match &self.keyed {
            Some(keyed) => Arc::new(PersistentMessageStore::new(
                keyed.clone(),
                instance.clone(),
            )),
            None => Arc::new(EphemeralMessageStore::new()),
        };
        let bundle = Arc::new(InstanceBundle::new(
            instance.clone(),
            messages,
            self.read_state.clone(),
        ));
        bundles.insert(instance.clone(), bundle.clone());
        debug!(instance = %instance, "registered instance bundle");
        bundle
    }

    /// Releases the bundle's in-memory resources and removes the registry
    /// entry. Persisted data stays for the next launch.
    pub async fn dispose(&self, instance: &ClientInstanceKey) {
        let removed = self.bundles.write().await.remove(instance);
        if let Some(bundle) = removed {
            bundle.messages().dispose().await;
            debug!(instance = %instance, "disposed instance bundle");
        }
    }

    /// Wipes one instance's messages and read set, then disposes its
    /// bundle. Resolving first guarantees an underlying store exists to
    /// clear even if the instance was never used in this process.
    pub async fn clear(&self, instance: &ClientInstanceKey) -> Result<(), StoreError> {
        let bundle = self.resolve(instance).await;
        bundle.messages().clear().await?;
        self.read_state.clear(instance).await?;
        self.dispose(instance).await;
        Ok(())
    }

    /// Wipes every record and read set of every instance, registered or
    /// not, then disposes all bundles and empties the registry.
    pub async fn clear_all_instances(&self) -> Result<(), StoreError> {
        let mut bundles = self.bundles.write().await;
        match &self.keyed {
            // The shared areas cover partitions with no live bundle too.
            Some(keyed) => keyed.clear_all_records().await?,
            None => {
                for bundle in bundles.values() {
                    bundle.messages().clear_all().await?;
                }
            }
        }
        self.read_state.clear_all().await?;

        for bundle in bundles.values() {
            bundle.messages().dispose().await;
        }
        bundles.clear();
        info!("cleared all instances");
        Ok(())
    }

    /// Number of live bundles.
    pub async fn len(&self) -> usize {
        self.bundles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bundles.read().await.is_empty()
    }
}
