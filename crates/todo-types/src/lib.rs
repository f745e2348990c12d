//! Todo Types - Pure entity definitions
//!
//! This crate contains only plain data types shared by the storage layer,
//! the cache codec and the gRPC conversions. Field names serialize in
//! camelCase so documents keep the same shape in the store and in the cache.

pub mod todo;
pub mod user;

pub use todo::*;
pub use user::*;

use serde::{Deserialize, Serialize};

/// Identity decoded from a validated access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner check: admins may act on any record.
    pub fn can_access(&self, owner_id: &str) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

/// Authentication tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
}
