//! Storage layer
//!
//! Documents live in SQLite (embedded) or in memory. The cache is Redis,
//! or an in-process DashMap when no Redis is configured.

pub mod db;
pub mod memory;
pub mod redis_cache;

pub use db::SqliteDocumentStore;
pub use memory::{MemoryCache, MemoryDocumentStore};
pub use redis_cache::RedisCache;
