//! Cache-aside repository
//!
//! Reads check the cache first and populate it on a miss. Writes go to the
//! store first and then refresh, patch or drop the affected cache entries.
//! The store is the source of truth; the cache can be flushed at any time.
//!
//! Cache failures never fail an operation: on reads they fall through to the
//! store, on writes they are logged and ignored. Store failures always
//! propagate.
//!
//! No locks are taken. A concurrent `update` and `list` may leave the
//! aggregate entry holding either version of a record until the next rebuild
//! or TTL expiry. Per-entity entries are always rewritten or dropped by the
//! mutation that touched them, so a completed update or delete is never
//! followed by a stale `get_by_id`.
//!
//! Mutations drop `{prefix}:{id}` before touching the store, then run the
//! store write and the cache upkeep as one spawned task. A caller cancelled
//! mid-mutation therefore leaves at worst a miss, and the upkeep still
//! finishes once the store has committed.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use todo_core::codec;
use todo_core::{CacheKeys, CacheStore, Collection, Document, Result, TodoError};
use tracing::{debug, error, warn};

/// What `insert` does to the aggregate cache entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPolicy {
    /// Drop `{prefix}:all` (and the owner's list) so the next list rebuilds it
    InvalidateAggregate,
    /// Append to `{prefix}:all` when cached and cache the new entity by id
    AppendToAggregate,
}

#[derive(Clone)]
pub struct CachedRepository<T> {
    collection: Collection<T>,
    cache: Arc<dyn CacheStore>,
    keys: CacheKeys,
    ttl: Option<Duration>,
    insert_policy: InsertPolicy,
}

impl<T: Document> CachedRepository<T> {
    pub fn new(collection: Collection<T>, cache: Arc<dyn CacheStore>, keys: CacheKeys) -> Self {
        Self {
            collection,
            cache,
            keys,
            ttl: None,
            insert_policy: InsertPolicy::InvalidateAggregate,
        }
    }

    /// Expiry applied to every cache write. `None` keeps entries until evicted.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_insert_policy(mut self, policy: InsertPolicy) -> Self {
        self.insert_policy = policy;
        self
    }

    /// All entities, served from `{prefix}:all` when cached.
    pub async fn list(&self) -> Result<Vec<T>> {
        let key = self.keys.all();
        if let Some(items) = self.read_list(&key).await {
            debug!(key = %key, count = items.len(), "cache hit");
            return Ok(items);
        }

        let items = self.collection.find_all().await.map_err(|e| {
            error!(collection = %self.collection.name(), error = %e, "Failed to list documents");
            e
        })?;
        debug!(key = %key, count = items.len(), "cache miss, loaded from store");

        self.write(&key, &items).await;
        Ok(items)
    }

    /// Entities owned by `owner_id`, served from `{prefix}:all:{owner}` when cached.
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<T>> {
        let Some(field) = T::OWNER_FIELD else {
            return Err(TodoError::Validation(format!(
                "{} records have no owner",
                T::KIND
            )));
        };
        let key = self.keys.owned_by(owner_id);
        if let Some(items) = self.read_list(&key).await {
            debug!(key = %key, count = items.len(), "cache hit");
            return Ok(items);
        }

        let items = self
            .collection
            .find_by_field(field, owner_id)
            .await
            .map_err(|e| {
                error!(collection = %self.collection.name(), owner = %owner_id, error = %e, "Failed to list owned documents");
                e
            })?;
        debug!(key = %key, count = items.len(), "cache miss, loaded from store");

        self.write(&key, &items).await;
        Ok(items)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<T> {
        let key = self.keys.entity(id);
        if let Some(key) = &key {
            if let Some(item) = self.read_one(key).await {
                debug!(key = %key, "cache hit");
                return Ok(item);
            }
        }

        let item = self.collection.find_by_id(id).await.map_err(|e| {
            error!(collection = %self.collection.name(), id = %id, error = %e, "Failed to get document");
            e
        })?;

        match item {
            Some(item) => {
                if let Some(key) = &key {
                    debug!(key = %key, "cache miss, loaded from store");
                    self.write(key, &item).await;
                }
                Ok(item)
            }
            None => Err(TodoError::not_found(T::KIND, id)),
        }
    }

    /// Store-only lookup by a top-level string field. Never cached.
    pub async fn find_one_by(&self, field: &str, value: &str) -> Result<Option<T>> {
        self.collection.find_one_by_field(field, value).await
    }

    pub async fn insert(&self, entity: T) -> Result<T> {
        let repo = self.clone();
        self.run_detached(async move { repo.commit_insert(entity).await })
            .await
    }

    /// Applies `patch` to the stored entity and writes it back.
    ///
    /// The patch may not change the identifier or the owner.
    pub async fn update<F>(&self, id: &str, patch: F) -> Result<T>
    where
        F: FnOnce(&mut T),
    {
        let mut entity = self
            .load(id)
            .await?
            .ok_or_else(|| TodoError::not_found(T::KIND, id))?;

        let owner = entity.owner_id().map(str::to_string);
        patch(&mut entity);
        if entity.id() != id || entity.owner_id().map(str::to_string) != owner {
            return Err(TodoError::Validation(format!(
                "{} id and owner cannot be changed",
                T::KIND
            )));
        }

        self.drop_entity(id).await;
        let repo = self.clone();
        self.run_detached(async move { repo.commit_update(entity, owner).await })
            .await
    }

    /// Deletes by id. A missing id is `NotFound` and leaves the cache untouched.
    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        let Some(existing) = self.load(id).await? else {
            debug!(collection = %self.collection.name(), id = %id, "delete matched nothing");
            return Err(TodoError::not_found(T::KIND, id));
        };
        // The owner is needed to patch the owner's list once the record is gone
        let owner = existing.owner_id().map(str::to_string);

        self.drop_entity(id).await;
        let repo = self.clone();
        let id = id.to_string();
        self.run_detached(async move { repo.commit_delete(&id, owner).await })
            .await
    }

    /// Runs a store write together with the cache upkeep that follows it.
    ///
    /// The work is spawned, so a caller that stops polling (deadline, client
    /// gone) cannot stop it between the store commit and the cache update.
    async fn run_detached<F, R>(&self, work: F) -> Result<R>
    where
        F: Future<Output = Result<R>> + Send + 'static,
        R: Send + 'static,
    {
        tokio::spawn(work).await.map_err(|e| {
            error!(collection = %self.collection.name(), error = %e, "Write task failed");
            TodoError::Internal(format!("write task failed: {}", e))
        })?
    }

    async fn commit_insert(&self, entity: T) -> Result<T> {
        self.collection.insert_one(&entity).await.map_err(|e| {
            error!(collection = %self.collection.name(), id = %entity.id(), error = %e, "Failed to insert document");
            e
        })?;

        match self.insert_policy {
            InsertPolicy::InvalidateAggregate => {
                self.remove(&self.keys.all()).await;
                if let Some(owner) = entity.owner_id() {
                    self.remove(&self.keys.owned_by(owner)).await;
                }
            }
            InsertPolicy::AppendToAggregate => {
                self.append_to_list(&self.keys.all(), &entity).await;
                if let Some(owner) = entity.owner_id() {
                    self.append_to_list(&self.keys.owned_by(owner), &entity)
                        .await;
                }
                if let Some(key) = self.keys.entity(entity.id()) {
                    self.write(&key, &entity).await;
                }
            }
        }

        Ok(entity)
    }

    async fn commit_update(&self, entity: T, owner: Option<String>) -> Result<T> {
        let id = entity.id().to_string();
        let matched = self.collection.replace_one(&entity).await.map_err(|e| {
            error!(collection = %self.collection.name(), id = %id, error = %e, "Failed to replace document");
            e
        })?;
        if !matched {
            // Deleted between the read and the write
            return Err(TodoError::not_found(T::KIND, id));
        }

        if let Some(key) = self.keys.entity(&id) {
            self.write(&key, &entity).await;
        }
        self.patch_list(&self.keys.all(), &id, Some(&entity)).await;
        if let Some(owner) = &owner {
            self.patch_list(&self.keys.owned_by(owner), &id, Some(&entity))
                .await;
        }

        Ok(entity)
    }

    async fn commit_delete(&self, id: &str, owner: Option<String>) -> Result<()> {
        let removed = self.collection.delete_one(id).await.map_err(|e| {
            error!(collection = %self.collection.name(), id = %id, error = %e, "Failed to delete document");
            e
        })?;
        if !removed {
            debug!(collection = %self.collection.name(), id = %id, "delete matched nothing");
            return Err(TodoError::not_found(T::KIND, id));
        }

        // Again, in case a reader cached the record between the drop and the delete
        self.drop_entity(id).await;
        self.patch_list(&self.keys.all(), id, None).await;
        if let Some(owner) = &owner {
            self.patch_list(&self.keys.owned_by(owner), id, None).await;
        }

        Ok(())
    }

    /// Store read ahead of a mutation.
    async fn load(&self, id: &str) -> Result<Option<T>> {
        self.collection.find_by_id(id).await.map_err(|e| {
            error!(collection = %self.collection.name(), id = %id, error = %e, "Failed to read document before write");
            e
        })
    }

    async fn drop_entity(&self, id: &str) {
        if let Some(key) = self.keys.entity(id) {
            self.remove(&key).await;
        }
    }

    async fn read_raw(&self, key: &str) -> Option<String> {
        match self.cache.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, falling back to store");
                None
            }
        }
    }

    async fn read_one(&self, key: &str) -> Option<T> {
        let raw = self.read_raw(key).await?;
        self.decode_or_drop(key, codec::decode::<T>(&raw)).await
    }

    async fn read_list(&self, key: &str) -> Option<Vec<T>> {
        let raw = self.read_raw(key).await?;
        self.decode_or_drop(key, codec::decode_list::<T>(&raw))
            .await
    }

    /// Unreadable entries are dropped so the next read rebuilds them.
    async fn decode_or_drop<V>(&self, key: &str, decoded: Result<Option<V>>) -> Option<V>
    where
        V: DeserializeOwned,
    {
        match decoded {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                self.remove(key).await;
                None
            }
        }
    }

    async fn write<V: Serialize + ?Sized>(&self, key: &str, value: &V) {
        let raw = match codec::encode(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, &raw, self.ttl).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }
    }

    async fn remove(&self, key: &str) {
        if let Err(e) = self.cache.delete(key).await {
            warn!(key = %key, error = %e, "Cache delete failed");
        }
    }

    async fn append_to_list(&self, key: &str, entity: &T) {
        if let Some(mut items) = self.read_list(key).await {
            items.retain(|item| item.id() != entity.id());
            items.push(entity.clone());
            self.write(key, &items).await;
        }
    }

    /// Replaces (`Some`) or removes (`None`) the record `id` inside a cached list.
    /// Lists that are not cached, or do not contain the record, are left alone.
    async fn patch_list(&self, key: &str, id: &str, replacement: Option<&T>) {
        let Some(mut items) = self.read_list(key).await else {
            return;
        };
        let Some(pos) = items.iter().position(|item| item.id() == id) else {
            return;
        };

        match replacement {
            Some(entity) => items[pos] = entity.clone(),
            None => {
                items.remove(pos);
            }
        }
        self.write(key, &items).await;
    }
}
