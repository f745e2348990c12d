//! Document store trait for persistence
//!
//! Documents are JSON objects grouped by collection name. Every document
//! carries its identifier both as the `id` argument and as its `id` field.

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_all(&self, collection: &str) -> Result<Vec<Value>>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Documents whose top-level string `field` equals `value`
    async fn find_by_field(&self, collection: &str, field: &str, value: &str)
        -> Result<Vec<Value>>;

    /// Fails with `AlreadyExists` when the id is taken
    async fn insert_one(&self, collection: &str, id: &str, document: Value) -> Result<()>;

    /// Returns whether a document matched `id`
    async fn replace_one(&self, collection: &str, id: &str, document: Value) -> Result<bool>;

    /// Returns whether a document was removed
    async fn delete_one(&self, collection: &str, id: &str) -> Result<bool>;
}
