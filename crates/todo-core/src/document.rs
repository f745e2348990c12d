//! Typed access to a document collection

use crate::ports::DocumentStore;
use crate::{Result, Todo, TodoError, User};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

/// An entity that can live in a document collection and in the cache
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Human readable kind used in not-found errors
    const KIND: &'static str;

    /// Top-level document field holding the owner id, for owned entities
    const OWNER_FIELD: Option<&'static str> = None;

    fn id(&self) -> &str;

    /// Owning principal, for entities that have one
    fn owner_id(&self) -> Option<&str> {
        None
    }
}

impl Document for Todo {
    const KIND: &'static str = "Todo";
    const OWNER_FIELD: Option<&'static str> = Some("userId");

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> Option<&str> {
        if self.user_id.is_empty() {
            None
        } else {
            Some(self.user_id.as_str())
        }
    }
}

impl Document for User {
    const KIND: &'static str = "User";

    fn id(&self) -> &str {
        &self.id
    }
}

/// A named collection in a [`DocumentStore`], decoding documents as `T`
pub struct Collection<T> {
    name: String,
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn find_all(&self) -> Result<Vec<T>> {
        let documents = self.store.find_all(&self.name).await?;
        documents.into_iter().map(from_document).collect()
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        self.store
            .find_by_id(&self.name, id)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn find_by_field(&self, field: &str, value: &str) -> Result<Vec<T>> {
        let documents = self.store.find_by_field(&self.name, field, value).await?;
        documents.into_iter().map(from_document).collect()
    }

    pub async fn find_one_by_field(&self, field: &str, value: &str) -> Result<Option<T>> {
        Ok(self.find_by_field(field, value).await?.into_iter().next())
    }

    pub async fn insert_one(&self, entity: &T) -> Result<()> {
        let document = serde_json::to_value(entity)?;
        self.store.insert_one(&self.name, entity.id(), document).await
    }

    pub async fn replace_one(&self, entity: &T) -> Result<bool> {
        let document = serde_json::to_value(entity)?;
        self.store.replace_one(&self.name, entity.id(), document).await
    }

    pub async fn delete_one(&self, id: &str) -> Result<bool> {
        self.store.delete_one(&self.name, id).await
    }
}

fn from_document<T: Document>(document: serde_json::Value) -> Result<T> {
    serde_json::from_value(document)
        .map_err(|e| TodoError::Store(format!("Malformed {} document: {}", T::KIND, e)))
}
