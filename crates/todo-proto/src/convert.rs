//! Conversions between domain types and protobuf messages.

use crate::proto;
use todo_types::{AuthTokens, Todo, TodoFields, User, UserUpdate};

impl From<Todo> for proto::TodoReply {
    fn from(todo: Todo) -> Self {
        proto::TodoReply {
            id: todo.id,
            title: todo.title,
            description: todo.description,
            due_date: todo.due_date,
            status: todo.status,
            priority: todo.priority,
            user_id: todo.user_id,
        }
    }
}

impl From<proto::CreateTodoRequest> for TodoFields {
    fn from(req: proto::CreateTodoRequest) -> Self {
        TodoFields {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            status: req.status,
            priority: req.priority,
        }
    }
}

/// Splits an update request into the target id and the new field values.
pub fn split_update(req: proto::UpdateTodoRequest) -> (String, TodoFields) {
    (
        req.id,
        TodoFields {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            status: req.status,
            priority: req.priority,
        },
    )
}

// The password hash never leaves the server.
impl From<User> for proto::UserReply {
    fn from(user: User) -> Self {
        proto::UserReply {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role.to_string(),
        }
    }
}

impl From<proto::UpdateMeRequest> for UserUpdate {
    fn from(req: proto::UpdateMeRequest) -> Self {
        UserUpdate {
            username: req.username,
            email: req.email,
            password: req.password,
        }
    }
}

impl From<AuthTokens> for proto::AuthenticateResponse {
    fn from(tokens: AuthTokens) -> Self {
        proto::AuthenticateResponse {
            access_token: tokens.access_token,
            expires_in: tokens.expires_in,
        }
    }
}
