//! Bearer-token authentication for protected services

use crate::services::AuthService;
use std::sync::Arc;
use todo_core::Principal;
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::debug;

const AUTHORIZATION: &str = "authorization";

/// Validates `authorization: Bearer <jwt>` and stores the [`Principal`] in the
/// request extensions for the handler.
#[derive(Clone)]
pub struct AuthInterceptor {
    auth: Arc<AuthService>,
}

impl AuthInterceptor {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

impl Interceptor for AuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let header = request
            .metadata()
            .get(AUTHORIZATION)
            .ok_or_else(|| Status::unauthenticated("Missing authorization metadata"))?
            .to_str()
            .map_err(|_| Status::unauthenticated("Invalid authorization metadata"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| Status::unauthenticated("Invalid authorization format"))?;

        let principal = self
            .auth
            .validate_token(token)
            .map_err(|e| Status::unauthenticated(e.to_string()))?;

        debug!(user_id = %principal.user_id, role = %principal.role, "Authenticated request");
        request.extensions_mut().insert(principal);
        Ok(request)
    }
}

/// The caller placed on the request by [`AuthInterceptor`].
pub fn principal<T>(request: &Request<T>) -> Result<Principal, Status> {
    request
        .extensions()
        .get::<Principal>()
        .cloned()
        .ok_or_else(|| Status::unauthenticated("Request is not authenticated"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::user_repository;
    use crate::storage::{MemoryCache, MemoryDocumentStore};
    use todo_core::Role;
    use tonic::Code;

    fn interceptor() -> (AuthInterceptor, Arc<AuthService>) {
        let users = user_repository(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryCache::new()),
            None,
        );
        let auth = Arc::new(AuthService::new(Arc::new(users), "secret".to_string(), 1));
        (AuthInterceptor::new(auth.clone()), auth)
    }

    fn with_header(value: &str) -> Request<()> {
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert(AUTHORIZATION, value.parse().unwrap());
        request
    }

    #[test]
    fn test_valid_token_sets_principal() {
        let (mut interceptor, auth) = interceptor();
        let tokens = auth.issue_token("u1", Role::Admin).unwrap();

        let request = interceptor
            .call(with_header(&format!("Bearer {}", tokens.access_token)))
            .unwrap();
        let principal = principal(&request).unwrap();
        assert_eq!(principal, Principal::new("u1", Role::Admin));
    }

    #[test]
    fn test_rejects_missing_or_malformed() {
        let (mut interceptor, auth) = interceptor();
        let tokens = auth.issue_token("u1", Role::User).unwrap();

        let missing = interceptor.call(Request::new(())).unwrap_err();
        assert_eq!(missing.code(), Code::Unauthenticated);

        let no_scheme = interceptor.call(with_header(&tokens.access_token)).unwrap_err();
        assert_eq!(no_scheme.code(), Code::Unauthenticated);

        let garbage = interceptor.call(with_header("Bearer abc.def.ghi")).unwrap_err();
        assert_eq!(garbage.code(), Code::Unauthenticated);
    }

    #[test]
    fn test_principal_requires_interceptor() {
        let request = Request::new(());
        assert_eq!(principal(&request).unwrap_err().code(), Code::Unauthenticated);
    }
}
