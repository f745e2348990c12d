//! Key-value cache trait and key layout

use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// String keys to serialized string values, with optional expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

const ALL: &str = "all";

/// Cache key layout for one entity type.
///
/// - `{prefix}:all` holds the aggregate list
/// - `{prefix}:all:{owner}` holds the list owned by one principal
/// - `{prefix}:{id}` holds a single entity
#[derive(Debug, Clone)]
pub struct CacheKeys {
    prefix: String,
}

impl CacheKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn all(&self) -> String {
        format!("{}:{}", self.prefix, ALL)
    }

    pub fn owned_by(&self, owner_id: &str) -> String {
        format!("{}:{}:{}", self.prefix, ALL, owner_id)
    }

    /// Per-entity key, or `None` when the id could alias an aggregate key.
    pub fn entity(&self, id: &str) -> Option<String> {
        if id.is_empty() || id == ALL || id.contains(':') {
            return None;
        }
        Some(format!("{}:{}", self.prefix, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let keys = CacheKeys::new("todos");
        assert_eq!(keys.all(), "todos:all");
        assert_eq!(keys.owned_by("u1"), "todos:all:u1");
        assert_eq!(keys.entity("abc").as_deref(), Some("todos:abc"));
    }

    #[test]
    fn test_entity_key_never_aliases_aggregate() {
        let keys = CacheKeys::new("todos");
        assert_eq!(keys.entity("all"), None);
        assert_eq!(keys.entity("all:u1"), None);
        assert_eq!(keys.entity(""), None);
    }
}
