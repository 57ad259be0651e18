//! Entities of the hook service and their retention policy.
//!
//! `Hook` has gone through five stored shapes; `LastFire` and `HookQueue` are
//! still at their first. [`HookStores`] wires all three onto one backend.

mod entities;
mod schema;

pub use entities::{Hook, HookDefinition, HookQueue, LastFire};
pub use schema::{
    HOOKS_TABLE, LAST_FIRES_TABLE, QUEUES_TABLE, hook_chain, hook_kind, last_fire_chain,
    last_fire_kind, queue_chain, queue_kind,
};

use crate::config::{HookStoreConfig, RetentionConfig};
use crate::core::Result;
use crate::retention::{PruneReport, RetentionPruner, RetentionTarget};
use crate::storage::{
    EntityKind, FieldCodec, InMemoryBackend, PlainTextCodec, RecordBackend, VersionedRecordStore,
    composite_key,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// LastFire records are grouped per hook and ordered by task creation.
pub fn last_fire_retention() -> RetentionTarget {
    RetentionTarget::new(["hookGroupId", "hookId"], "taskCreateTime")
}

/// Keeps the `keep` most recent fires created before `now` for every hook
/// present in `hooks`, deleting older ones.
pub async fn expire_last_fires(
    hooks: &VersionedRecordStore,
    last_fires: &VersionedRecordStore,
    now: DateTime<Utc>,
    keep: usize,
) -> Result<PruneReport> {
    let pruner = RetentionPruner::new(RetentionConfig::default().keep(keep))?;
    pruner
        .prune(hooks, last_fires, &last_fire_retention(), now)
        .await
}

/// Stores for hooks, their fire history and their queues.
#[derive(Clone)]
pub struct HookStores {
    pub hooks: VersionedRecordStore,
    pub last_fires: VersionedRecordStore,
    pub queues: VersionedRecordStore,
    retention: RetentionPruner,
}

impl HookStores {
    pub fn new(
        backend: Arc<dyn RecordBackend>,
        codec: Arc<dyn FieldCodec>,
        config: &HookStoreConfig,
    ) -> Result<Self> {
        let store = |kind: EntityKind| {
            VersionedRecordStore::new(kind, backend.clone())
                .with_codec(codec.clone())
                .with_config(config.store.clone())
        };

        Ok(Self {
            hooks: store(hook_kind()?)?,
            last_fires: store(last_fire_kind()?)?,
            queues: store(queue_kind()?)?,
            retention: RetentionPruner::new(config.retention.clone())?,
        })
    }

    /// All three stores on a fresh in-memory backend, without field encryption.
    pub fn in_memory(config: &HookStoreConfig) -> Result<Self> {
        Self::new(
            Arc::new(InMemoryBackend::new()),
            Arc::new(PlainTextCodec),
            config,
        )
    }

    pub async fn put_hook(&self, hook: &Hook) -> Result<()> {
        self.hooks.put_entity(hook).await.map(|_| ())
    }

    /// Fails with `RecordExists` if the hook id is taken in its group.
    pub async fn create_hook(&self, hook: &Hook) -> Result<()> {
        self.hooks.create_entity(hook).await.map(|_| ())
    }

    pub async fn get_hook(&self, hook_group_id: &str, hook_id: &str) -> Result<Hook> {
        self.hooks.get_entity(hook_group_id, hook_id).await
    }

    pub async fn remove_hook(&self, hook_group_id: &str, hook_id: &str) -> Result<bool> {
        self.hooks.remove(hook_group_id, hook_id).await
    }

    pub async fn record_fire(&self, fire: &LastFire) -> Result<()> {
        self.last_fires.put_entity(fire).await.map(|_| ())
    }

    pub async fn get_fire(
        &self,
        hook_group_id: &str,
        hook_id: &str,
        task_id: &str,
    ) -> Result<LastFire> {
        self.last_fires
            .get_entity(&composite_key([hook_group_id, hook_id]), task_id)
            .await
    }

    pub async fn put_queue(&self, queue: &HookQueue) -> Result<()> {
        self.queues.put_entity(queue).await.map(|_| ())
    }

    pub async fn get_queue(&self, hook_group_id: &str, hook_id: &str) -> Result<HookQueue> {
        self.queues.get_entity(hook_group_id, hook_id).await
    }

    /// Runs the configured retention pass over fire history.
    pub async fn expire_last_fires(&self, now: DateTime<Utc>) -> Result<PruneReport> {
        self.retention
            .prune(&self.hooks, &self.last_fires, &last_fire_retention(), now)
            .await
    }
}
