//! Port traits (interfaces) for dependency injection

pub mod cache;
pub mod store;

pub use cache::{CacheKeys, CacheStore};
pub use store::DocumentStore;
