//! Todo Core Library
//!
//! Error taxonomy, persistence/cache port traits and the cache codec shared
//! by the server and its tests.

// Re-export pure types from todo-types
pub use todo_types::*;

pub mod codec;
pub mod document;
pub mod error;
pub mod ports;

pub use document::{Collection, Document};
pub use error::{Result, TodoError};
pub use ports::{CacheKeys, CacheStore, DocumentStore};
