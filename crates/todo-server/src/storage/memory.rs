//! In-memory backends using DashMap
//!
//! `MemoryCache` stands in for Redis on single-instance deployments and in
//! tests. `MemoryDocumentStore` stands in for the document database.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use todo_core::{CacheStore, DocumentStore, Result, TodoError};

/// Simple in-memory cache with TTL support
pub struct MemoryCache {
    data: Arc<DashMap<String, CacheEntry>>,
}

struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryCache {
    pub fn new() -> Self {
        let cache = Self {
            data: Arc::new(DashMap::new()),
        };

        // Start cleanup task
        cache.start_cleanup_task();

        cache
    }

    /// Get a value from cache
    pub fn get_value(&self, key: &str) -> Option<String> {
        self.data.get(key).and_then(|entry| {
            if let Some(expires) = entry.expires_at {
                if Instant::now() > expires {
                    drop(entry);
                    self.data.remove(key);
                    return None;
                }
            }
            Some(entry.value.clone())
        })
    }

    /// Set a value, optionally expiring after `ttl`
    pub fn set_value(&self, key: String, value: String, ttl: Option<Duration>) {
        self.data.insert(
            key,
            CacheEntry {
                value,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
    }

    /// Delete a key from cache
    pub fn delete_value(&self, key: &str) {
        self.data.remove(key);
    }

    /// Check if key exists
    pub fn exists(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    /// Outside a runtime expired entries are only evicted on read.
    fn start_cleanup_task(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let data = Arc::downgrade(&self.data);
        runtime.spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;

                // Stop once the cache itself is gone
                let Some(data) = data.upgrade() else {
                    break;
                };

                let now = Instant::now();
                data.retain(|_, entry| {
                    entry
                        .expires_at
                        .map(|expires| now <= expires)
                        .unwrap_or(true)
                });
            }
        });
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_value(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.set_value(key.to_string(), value.to_string(), ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.delete_value(key);
        Ok(())
    }
}

/// In-memory document collections, kept in insertion order
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, Vec<Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn document_id(document: &Value) -> Option<&str> {
    document.get("id").and_then(Value::as_str)
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Value>> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.value().clone())
            .unwrap_or_default())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        Ok(self.collections.get(collection).and_then(|docs| {
            docs.iter()
                .find(|doc| document_id(doc) == Some(id))
                .cloned()
        }))
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Value>> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| doc.get(field).and_then(Value::as_str) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_one(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|doc| document_id(doc) == Some(id)) {
            return Err(TodoError::AlreadyExists(format!(
                "Document {} already exists in {}",
                id, collection
            )));
        }
        docs.push(document);
        Ok(())
    }

    async fn replace_one(&self, collection: &str, id: &str, document: Value) -> Result<bool> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };
        match docs.iter_mut().find(|doc| document_id(doc) == Some(id)) {
            Some(slot) => {
                *slot = document;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_one(&self, collection: &str, id: &str) -> Result<bool> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|doc| document_id(doc) != Some(id));
        Ok(docs.len() < before)
    }
}
