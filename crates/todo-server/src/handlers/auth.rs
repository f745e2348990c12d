//! Registration and login

use crate::deadline::run_with_deadline;
use crate::handlers::{timeout_for, to_status};
use crate::services::AuthService;
use std::sync::Arc;
use std::time::Duration;
use todo_proto::proto::auth_service_server::AuthService as AuthRpc;
use todo_proto::proto::{AuthenticateResponse, LoginRequest, RegisterRequest};
use tonic::{Request, Response, Status};

pub struct AuthHandler {
    auth: Arc<AuthService>,
    request_timeout: Duration,
}

impl AuthHandler {
    pub fn new(auth: Arc<AuthService>, request_timeout: Duration) -> Self {
        Self {
            auth,
            request_timeout,
        }
    }
}

#[tonic::async_trait]
impl AuthRpc for AuthHandler {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<AuthenticateResponse>, Status> {
        let timeout = timeout_for(self.request_timeout, &request);
        let req = request.into_inner();

        run_with_deadline("Register", timeout, async {
            let tokens = self
                .auth
                .register(&req.username, &req.email, &req.password)
                .await
                .map_err(to_status)?;
            Ok(Response::new(tokens.into()))
        })
        .await
    }

    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<AuthenticateResponse>, Status> {
        let timeout = timeout_for(self.request_timeout, &request);
        let req = request.into_inner();

        run_with_deadline("Login", timeout, async {
            let tokens = self
                .auth
                .login(&req.username, &req.password)
                .await
                .map_err(to_status)?;
            Ok(Response::new(tokens.into()))
        })
        .await
    }
}
