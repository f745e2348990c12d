//! Business logic services

pub mod account_manager;
pub mod auth;
pub mod todo_manager;
pub mod validation;

pub use account_manager::AccountManager;
pub use auth::AuthService;
pub use todo_manager::TodoManager;
