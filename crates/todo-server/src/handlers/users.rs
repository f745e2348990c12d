//! The caller's own account

use crate::deadline::run_with_deadline;
use crate::extractors::principal;
use crate::handlers::{timeout_for, to_status};
use crate::services::AccountManager;
use std::sync::Arc;
use std::time::Duration;
use todo_core::UserUpdate;
use todo_proto::proto::user_service_server::UserService as UserRpc;
use todo_proto::proto::{
    DeleteMeRequest, DeleteMeResponse, GetMeRequest, ListUsersRequest, ListUsersResponse,
    UpdateMeRequest, UserReply,
};
use tonic::{Request, Response, Status};

pub struct UserHandler {
    accounts: Arc<AccountManager>,
    request_timeout: Duration,
}

impl UserHandler {
    pub fn new(accounts: Arc<AccountManager>, request_timeout: Duration) -> Self {
        Self {
            accounts,
            request_timeout,
        }
    }
}

#[tonic::async_trait]
impl UserRpc for UserHandler {
    async fn get_me(&self, request: Request<GetMeRequest>) -> Result<Response<UserReply>, Status> {
        let principal = principal(&request)?;
        let timeout = timeout_for(self.request_timeout, &request);

        run_with_deadline("GetMe", timeout, async {
            let user = self.accounts.me(&principal).await.map_err(to_status)?;
            Ok(Response::new(user.into()))
        })
        .await
    }

    async fn update_me(&self, request: Request<UpdateMeRequest>) -> Result<Response<UserReply>, Status> {
        let principal = principal(&request)?;
        let timeout = timeout_for(self.request_timeout, &request);
        let update = UserUpdate::from(request.into_inner());

        run_with_deadline("UpdateMe", timeout, async {
            let user = self
                .accounts
                .update_me(&principal, update)
                .await
                .map_err(to_status)?;
            Ok(Response::new(user.into()))
        })
        .await
    }

    async fn delete_me(
        &self,
        request: Request<DeleteMeRequest>,
    ) -> Result<Response<DeleteMeResponse>, Status> {
        let principal = principal(&request)?;
        let timeout = timeout_for(self.request_timeout, &request);

        run_with_deadline("DeleteMe", timeout, async {
            self.accounts.delete_me(&principal).await.map_err(to_status)?;
            Ok(Response::new(DeleteMeResponse {}))
        })
        .await
    }

    async fn list_users(
        &self,
        request: Request<ListUsersRequest>,
    ) -> Result<Response<ListUsersResponse>, Status> {
        let principal = principal(&request)?;
        let timeout = timeout_for(self.request_timeout, &request);

        run_with_deadline("ListUsers", timeout, async {
            let users = self.accounts.list_users(&principal).await.map_err(to_status)?;
            Ok(Response::new(ListUsersResponse {
                users: users.into_iter().map(UserReply::from).collect(),
            }))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{todo_repository, user_repository};
    use crate::services::{AuthService, TodoManager};
    use crate::storage::{MemoryCache, MemoryDocumentStore};
    use todo_core::{CacheStore, DocumentStore, Principal, Role};
    use tonic::Code;

    struct Fixture {
        auth: Arc<AuthService>,
        handler: UserHandler,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        let users = Arc::new(user_repository(store.clone(), cache.clone(), None));
        let todos = Arc::new(TodoManager::new(Arc::new(todo_repository(store, cache, None))));
        let auth = Arc::new(
            AuthService::new(users.clone(), "secret".to_string(), 1).with_admins(["root"]),
        );
        let accounts = Arc::new(AccountManager::new(users, auth.clone(), todos));
        Fixture {
            auth,
            handler: UserHandler::new(accounts, Duration::from_secs(5)),
        }
    }

    async fn sign_up(f: &Fixture, username: &str) -> Principal {
        let tokens = f
            .auth
            .register(username, &format!("{}@example.com", username), "secret1")
            .await
            .unwrap();
        f.auth.validate_token(&tokens.access_token).unwrap()
    }

    fn authed<T>(principal: &Principal, message: T) -> Request<T> {
        let mut request = Request::new(message);
        request.extensions_mut().insert(principal.clone());
        request
    }

    #[tokio::test]
    async fn test_get_and_update_me() {
        let f = fixture();
        let alice = sign_up(&f, "alice").await;

        let me = f
            .handler
            .get_me(authed(&alice, GetMeRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(me.username, "alice");
        assert_eq!(me.role, "user");

        let updated = f
            .handler
            .update_me(authed(
                &alice,
                UpdateMeRequest {
                    username: Some("alice2".to_string()),
                    ..Default::default()
                },
            ))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_delete_me() {
        let f = fixture();
        let alice = sign_up(&f, "alice").await;

        f.handler
            .delete_me(authed(&alice, DeleteMeRequest {}))
            .await
            .unwrap();
        let status = f
            .handler
            .get_me(authed(&alice, GetMeRequest {}))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_list_users_is_admin_only() {
        let f = fixture();
        let alice = sign_up(&f, "alice").await;

        let status = f
            .handler
            .list_users(authed(&alice, ListUsersRequest {}))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::PermissionDenied);

        let admin = sign_up(&f, "root").await;
        assert_eq!(admin.role, Role::Admin);
        let listed = f
            .handler
            .list_users(authed(&admin, ListUsersRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(listed.users.len(), 2);
    }
}
