//! gRPC handlers
//!
//! Each handler converts the request, runs the domain call under the request
//! deadline and maps [`TodoError`] onto a gRPC status.

pub mod auth;
pub mod todos;
pub mod users;

pub use auth::AuthHandler;
pub use todos::TodoHandler;
pub use users::UserHandler;

use crate::deadline;
use std::time::Duration;
use todo_core::TodoError;
use tonic::{Request, Status};
use tracing::error;

const UNAVAILABLE: &str = "Service temporarily unavailable";

/// Client-facing status for a domain error. Internal details are only logged.
pub fn to_status(err: TodoError) -> Status {
    match err {
        TodoError::NotFound { .. } => Status::not_found(err.to_string()),
        TodoError::Validation(msg) => Status::invalid_argument(msg),
        TodoError::AlreadyExists(msg) => Status::already_exists(msg),
        TodoError::Unauthenticated(msg) => Status::unauthenticated(msg),
        TodoError::PermissionDenied(msg) => Status::permission_denied(msg),
        other => {
            error!(error = %other, "Request failed");
            Status::unavailable(UNAVAILABLE)
        }
    }
}

/// Time budget for one call: the server limit, shortened by the client's deadline.
pub fn timeout_for<T>(request_timeout: Duration, request: &Request<T>) -> Duration {
    deadline::effective_timeout(request_timeout, deadline::extract_deadline(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn test_status_mapping() {
        assert_eq!(to_status(TodoError::not_found("Todo", "t1")).code(), Code::NotFound);
        assert_eq!(
            to_status(TodoError::Validation("Title is required".into())).code(),
            Code::InvalidArgument
        );
        assert_eq!(
            to_status(TodoError::AlreadyExists("taken".into())).code(),
            Code::AlreadyExists
        );
        assert_eq!(
            to_status(TodoError::Unauthenticated("bad token".into())).code(),
            Code::Unauthenticated
        );
        assert_eq!(
            to_status(TodoError::PermissionDenied("not yours".into())).code(),
            Code::PermissionDenied
        );
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let status = to_status(TodoError::Store("disk I/O error at /var/lib/todo.db".into()));
        assert_eq!(status.code(), Code::Unavailable);
        assert_eq!(status.message(), UNAVAILABLE);

        let status = to_status(TodoError::Cache("connection refused".into()));
        assert_eq!(status.code(), Code::Unavailable);
    }

    #[test]
    fn test_timeout_for_honours_client_deadline() {
        let mut request = Request::new(());
        assert_eq!(timeout_for(Duration::from_secs(10), &request), Duration::from_secs(10));

        request
            .metadata_mut()
            .insert("grpc-timeout", "2S".parse().unwrap());
        assert_eq!(timeout_for(Duration::from_secs(10), &request), Duration::from_secs(2));
    }
}
