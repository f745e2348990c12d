//! Profile use cases for the signed-in user

use crate::repository::UserRepository;
use crate::services::auth::{hash_password, AuthService};
use crate::services::{validation, TodoManager};
use std::sync::Arc;
use todo_core::{Principal, Result, TodoError, User, UserUpdate};
use tracing::info;

pub struct AccountManager {
    users: Arc<UserRepository>,
    auth: Arc<AuthService>,
    todos: Arc<TodoManager>,
}

impl AccountManager {
    pub fn new(users: Arc<UserRepository>, auth: Arc<AuthService>, todos: Arc<TodoManager>) -> Self {
        Self { users, auth, todos }
    }

    pub async fn me(&self, principal: &Principal) -> Result<User> {
        self.users.get_by_id(&principal.user_id).await
    }

    pub async fn update_me(&self, principal: &Principal, update: UserUpdate) -> Result<User> {
        let username = update.username.as_deref().map(str::trim);
        let email = update.email.as_deref().map(str::trim);

        if let Some(username) = username {
            validation::require(username, "Username")?;
        }
        if let Some(email) = email {
            validation::require(email, "Email")?;
            validation::check_email(email)?;
        }
        let password_hash = match update.password.as_deref() {
            Some(password) => {
                validation::check_password(password)?;
                Some(hash_password(password).await?)
            }
            None => None,
        };

        self.auth
            .ensure_available(Some(&principal.user_id), username, email)
            .await?;

        let user = self
            .users
            .update(&principal.user_id, |user| {
                if let Some(username) = username {
                    user.username = username.to_string();
                }
                if let Some(email) = email {
                    user.email = email.to_string();
                }
                if let Some(hash) = password_hash {
                    user.password_hash = hash;
                }
            })
            .await?;
        info!(user_id = %user.id, "Updated profile");
        Ok(user)
    }

    /// Deletes the account and every todo it owns.
    pub async fn delete_me(&self, principal: &Principal) -> Result<()> {
        let removed = self.todos.delete_all_owned_by(&principal.user_id).await?;
        self.users.delete_by_id(&principal.user_id).await?;
        info!(user_id = %principal.user_id, todos = removed, "Deleted account");
        Ok(())
    }

    pub async fn list_users(&self, principal: &Principal) -> Result<Vec<User>> {
        if !principal.is_admin() {
            return Err(TodoError::PermissionDenied(
                "Listing users requires the admin role".to_string(),
            ));
        }
        self.users.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{todo_repository, user_repository};
    use crate::services::auth::verify_password;
    use crate::storage::{MemoryCache, MemoryDocumentStore};
    use todo_core::{CacheStore, DocumentStore, Role, TodoFields};

    struct Fixture {
        auth: Arc<AuthService>,
        todos: Arc<TodoManager>,
        accounts: AccountManager,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        let users = Arc::new(user_repository(store.clone(), cache.clone(), None));
        let todos = Arc::new(TodoManager::new(Arc::new(todo_repository(
            store, cache, None,
        ))));
        let auth = Arc::new(AuthService::new(users.clone(), "secret".to_string(), 1));
        Fixture {
            accounts: AccountManager::new(users, auth.clone(), todos.clone()),
            auth,
            todos,
        }
    }

    async fn register(f: &Fixture, username: &str) -> Principal {
        let tokens = f
            .auth
            .register(username, &format!("{}@example.com", username), "secret1")
            .await
            .unwrap();
        f.auth.validate_token(&tokens.access_token).unwrap()
    }

    #[tokio::test]
    async fn test_me() {
        let f = fixture();
        let alice = register(&f, "alice").await;

        let me = f.accounts.me(&alice).await.unwrap();
        assert_eq!(me.username, "alice");
        assert_eq!(me.role, Role::User);
    }

    #[tokio::test]
    async fn test_update_me() {
        let f = fixture();
        let alice = register(&f, "alice").await;

        let updated = f
            .accounts
            .update_me(
                &alice,
                UserUpdate {
                    email: Some("alice@work.example".to_string()),
                    password: Some("new-secret".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username, "alice");
        assert_eq!(updated.email, "alice@work.example");
        assert!(verify_password("new-secret", &updated.password_hash).await);

        f.auth.login("alice", "new-secret").await.unwrap();
        assert!(f.auth.login("alice", "secret1").await.is_err());
    }

    #[tokio::test]
    async fn test_update_me_rechecks_uniqueness() {
        let f = fixture();
        let alice = register(&f, "alice").await;
        register(&f, "bob").await;

        let err = f
            .accounts
            .update_me(
                &alice,
                UserUpdate {
                    username: Some("bob".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TodoError::AlreadyExists(_)));

        // Keeping one's own name is not a conflict
        let same = f
            .accounts
            .update_me(
                &alice,
                UserUpdate {
                    username: Some("alice".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.username, "alice");
    }

    #[tokio::test]
    async fn test_update_me_validates() {
        let f = fixture();
        let alice = register(&f, "alice").await;

        let bad_email = UserUpdate {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            f.accounts.update_me(&alice, bad_email).await,
            Err(TodoError::Validation(_))
        ));

        let short_password = UserUpdate {
            password: Some("123".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            f.accounts.update_me(&alice, short_password).await,
            Err(TodoError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_me_removes_todos() {
        let f = fixture();
        let alice = register(&f, "alice").await;
        let bob = register(&f, "bob").await;
        f.todos.create(&alice, TodoFields::titled("a1")).await.unwrap();
        f.todos.create(&bob, TodoFields::titled("b1")).await.unwrap();

        f.accounts.delete_me(&alice).await.unwrap();

        assert!(f.accounts.me(&alice).await.unwrap_err().is_not_found());
        assert!(f.todos.list_for(&alice, false).await.unwrap().is_empty());
        assert_eq!(f.todos.list_for(&bob, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_users_requires_admin() {
        let f = fixture();
        let alice = register(&f, "alice").await;
        register(&f, "bob").await;

        assert!(matches!(
            f.accounts.list_users(&alice).await,
            Err(TodoError::PermissionDenied(_))
        ));

        let admin = Principal::new("root", Role::Admin);
        let users = f.accounts.list_users(&admin).await.unwrap();
        assert_eq!(users.len(), 2);
    }
}
