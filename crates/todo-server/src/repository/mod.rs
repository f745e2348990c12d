//! Entity repositories
//!
//! Both entity types share the cache-aside implementation in [`cached`] and
//! differ only in collection name, key prefix and insert policy.

pub mod cached;

pub use cached::{CachedRepository, InsertPolicy};

use std::sync::Arc;
use std::time::Duration;
use todo_core::{CacheKeys, CacheStore, Collection, DocumentStore, Todo, User};

pub type TodoRepository = CachedRepository<Todo>;
pub type UserRepository = CachedRepository<User>;

pub const TODOS: &str = "todos";
pub const USERS: &str = "users";

/// Todos drop the aggregate entry on insert; the next list rebuilds it.
pub fn todo_repository(
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn CacheStore>,
    ttl: Option<Duration>,
) -> TodoRepository {
    CachedRepository::new(Collection::new(store, TODOS), cache, CacheKeys::new(TODOS))
        .with_ttl(ttl)
        .with_insert_policy(InsertPolicy::InvalidateAggregate)
}

/// Users are appended to the cached aggregate and cached individually on insert.
pub fn user_repository(
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn CacheStore>,
    ttl: Option<Duration>,
) -> UserRepository {
    CachedRepository::new(Collection::new(store, USERS), cache, CacheKeys::new(USERS))
        .with_ttl(ttl)
        .with_insert_policy(InsertPolicy::AppendToAggregate)
}
